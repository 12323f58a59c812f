//! Task runner: one transform invocation turned into a settled record.

use crate::types::{Settled, WorkItem};
use std::future::Future;

/// Run `transform` on one work item and settle its outcome.
///
/// `Ok(value)` becomes `Fulfilled { value }` and `Err(reason)` becomes
/// `Rejected { reason }` with the reason untouched. Nothing escapes as an
/// error, so a failing item can never stop its siblings.
pub async fn run_task<V, S, F, Fut, R, E>(item: WorkItem<V, S>, transform: &F) -> Settled<R, E>
where
    F: Fn(V, usize, S) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let WorkItem {
        value,
        index,
        input,
    } = item;
    transform(value, index, input).await.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: i32, index: usize) -> WorkItem<i32, ()> {
        WorkItem {
            value,
            index,
            input: (),
        }
    }

    #[test]
    fn test_success_is_fulfilled() {
        let settled = tokio_test::block_on(run_task(item(21, 0), &|v: i32, _, _| async move {
            Ok::<_, String>(v * 2)
        }));
        assert_eq!(settled, Settled::Fulfilled { value: 42 });
    }

    #[test]
    fn test_failure_reason_is_passed_through() {
        let settled = tokio_test::block_on(run_task(item(7, 3), &|v: i32, i: usize, _| async move {
            Err::<i32, _>(format!("item {} at {} failed", v, i))
        }));
        assert_eq!(
            settled,
            Settled::Rejected {
                reason: "item 7 at 3 failed".to_string()
            }
        );
    }
}
