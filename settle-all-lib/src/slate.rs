//! Result slate: index-addressed collection of settled records.

use crate::types::Settled;
use crate::worker::WorkerReport;

/// Output container with one slot per input index.
///
/// Each slot is filled exactly once. Work sources never hand the same index to
/// two workers, so filling an occupied slot is a bug and trips a debug assertion.
#[derive(Debug)]
pub struct ResultSlate<R, E> {
    slots: Vec<Option<Settled<R, E>>>,
    filled: usize,
}

impl<R, E> ResultSlate<R, E> {
    /// Create a slate with `len` empty slots.
    pub fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots, filled: 0 }
    }

    /// Record `settled` at `index`.
    pub fn fill(&mut self, index: usize, settled: Settled<R, E>) {
        let slot = &mut self.slots[index];
        debug_assert!(slot.is_none(), "slot {} settled twice", index);
        if slot.replace(settled).is_none() {
            self.filled += 1;
        }
    }

    /// Move every record of a finished worker into its slot.
    pub fn absorb(&mut self, report: WorkerReport<R, E>) {
        for (index, settled) in report.settled {
            self.fill(index, settled);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether every slot holds a record.
    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Ordered records, one per input index.
    pub fn into_results(self) -> Vec<Settled<R, E>> {
        debug_assert!(
            self.is_complete(),
            "{} of {} slots settled",
            self.filled,
            self.slots.len()
        );
        self.slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reports_land_in_index_order() {
        let mut slate: ResultSlate<&str, ()> = ResultSlate::new(3);

        slate.absorb(WorkerReport {
            worker_id: 1,
            settled: vec![(2, Settled::Fulfilled { value: "c" })],
            elapsed: Duration::ZERO,
        });
        assert!(!slate.is_complete());

        slate.absorb(WorkerReport {
            worker_id: 0,
            settled: vec![
                (1, Settled::Rejected { reason: () }),
                (0, Settled::Fulfilled { value: "a" }),
            ],
            elapsed: Duration::ZERO,
        });
        assert!(slate.is_complete());

        assert_eq!(
            slate.into_results(),
            vec![
                Settled::Fulfilled { value: "a" },
                Settled::Rejected { reason: () },
                Settled::Fulfilled { value: "c" },
            ]
        );
    }

    #[test]
    #[should_panic(expected = "settled twice")]
    #[cfg(debug_assertions)]
    fn test_double_fill_is_caught() {
        let mut slate: ResultSlate<u8, ()> = ResultSlate::new(1);
        slate.fill(0, Settled::Fulfilled { value: 1 });
        slate.fill(0, Settled::Fulfilled { value: 2 });
    }
}
