//! Work sources: single-pass producers of indexed work items.
//!
//! A source hands out every `(value, index)` pair of its input exactly once, in
//! ascending index order, to whichever worker asks next. Claiming an index is a
//! single compare-and-swap on a shared cursor, so sources stay race-free whether
//! workers are polled from one task or run in parallel on several threads.

use crate::types::WorkItem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A queue of work items that several workers can drain concurrently.
pub trait WorkQueue {
    /// Type of the value handed to the transform
    type Value;
    /// Type of the whole-input reference handed to the transform
    type Input;

    /// Claim the next unclaimed item, or `None` once every item has been handed out.
    ///
    /// Exhaustion is permanent.
    fn take_next(&self) -> Option<WorkItem<Self::Value, Self::Input>>;

    /// Total number of items this source was built over.
    fn len(&self) -> usize;

    /// Number of items not yet claimed.
    fn remaining(&self) -> usize;

    /// Whether the source was built over no input. A drained source is not
    /// empty; check [`WorkQueue::remaining`] for that.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Index cursor shared by all workers of one run.
///
/// The cursor never moves past `len`, so a drained source stays drained.
#[derive(Debug, Default)]
struct Cursor(AtomicUsize);

impl Cursor {
    fn claim(&self, len: usize) -> Option<usize> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next < len).then_some(next + 1)
            })
            .ok()
    }

    fn position(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

/// Work source over a borrowed slice.
#[derive(Debug)]
pub struct WorkSource<'a, T> {
    input: &'a [T],
    cursor: Cursor,
}

impl<'a, T> WorkSource<'a, T> {
    pub fn new(input: &'a [T]) -> Self {
        Self {
            input,
            cursor: Cursor::default(),
        }
    }
}

impl<'a, T> WorkQueue for WorkSource<'a, T> {
    type Value = &'a T;
    type Input = &'a [T];

    fn take_next(&self) -> Option<WorkItem<&'a T, &'a [T]>> {
        let index = self.cursor.claim(self.input.len())?;
        Some(WorkItem {
            value: &self.input[index],
            index,
            input: self.input,
        })
    }

    fn len(&self) -> usize {
        self.input.len()
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.cursor.position()
    }
}

/// Work source over shared, reference-counted input.
///
/// Values are cloned out so that items can move into spawned tasks.
#[derive(Debug)]
pub struct SharedWorkSource<T> {
    input: Arc<[T]>,
    cursor: Cursor,
}

impl<T> SharedWorkSource<T> {
    pub fn new(input: impl Into<Arc<[T]>>) -> Self {
        Self {
            input: input.into(),
            cursor: Cursor::default(),
        }
    }
}

impl<T: Clone> WorkQueue for SharedWorkSource<T> {
    type Value = T;
    type Input = Arc<[T]>;

    fn take_next(&self) -> Option<WorkItem<T, Arc<[T]>>> {
        let index = self.cursor.claim(self.input.len())?;
        Some(WorkItem {
            value: self.input[index].clone(),
            index,
            input: Arc::clone(&self.input),
        })
    }

    fn len(&self) -> usize {
        self.input.len()
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.cursor.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_yields_in_order_then_exhausts() {
        let input = ["a", "b", "c"];
        let source = WorkSource::new(&input);

        let indices: Vec<usize> = std::iter::from_fn(|| source.take_next())
            .map(|item| item.index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);

        // Exhaustion is permanent
        for _ in 0..5 {
            assert!(source.take_next().is_none());
        }
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_item_carries_value_and_whole_input() {
        let input = vec![10, 20, 30];
        let source = WorkSource::new(&input);

        let _ = source.take_next();
        let item = source.take_next().unwrap();
        assert_eq!(*item.value, 20);
        assert_eq!(item.index, 1);
        assert_eq!(item.input, &input[..]);
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn test_empty_source() {
        let input: [u8; 0] = [];
        let source = WorkSource::new(&input);
        assert!(source.is_empty());
        assert!(source.take_next().is_none());
    }

    #[test]
    fn test_drained_source_is_not_empty() {
        let input = [1, 2];
        let source = WorkSource::new(&input);
        while source.take_next().is_some() {}
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.len(), 2);
        assert!(!source.is_empty());
    }

    #[test]
    fn test_shared_source_hands_out_each_index_once_across_threads() {
        let input: Vec<usize> = (0..10_000).collect();
        let source = Arc::new(SharedWorkSource::<usize>::new(input));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let source = Arc::clone(&source);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(item) = source.take_next() {
                        assert_eq!(item.value, item.index);
                        seen.push(item.index);
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        assert_eq!(all.len(), 10_000);
        let unique: HashSet<usize> = all.into_iter().collect();
        assert_eq!(unique.len(), 10_000);
        assert!(source.take_next().is_none());
    }
}
