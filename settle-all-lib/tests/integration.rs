// settle-all-lib/tests/integration.rs

//! Integration tests for settle-all-lib exports and core behavior

use settle_all_lib::{
    drain, settle_all_bounded, settle_all_bounded_spawned, ConcurrencyLimit, ResultSlate,
    SettleConfig, Settled, Settler, WorkQueue, WorkSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counts transforms in flight and remembers the highest count observed.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn values<R: Clone, E>(results: &[Settled<R, E>]) -> Vec<Option<R>> {
    results.iter().map(|s| s.value().cloned()).collect()
}

#[tokio::test]
async fn test_doubling_with_full_concurrency() {
    let input = [10, 20, 30];
    let results = settle_all_bounded(&input, |x, _, _| async move { Ok::<_, String>(x * 2) }, 3).await;

    assert_eq!(
        results,
        vec![
            Settled::Fulfilled { value: 20 },
            Settled::Fulfilled { value: 40 },
            Settled::Fulfilled { value: 60 },
        ]
    );
}

#[tokio::test]
async fn test_limit_one_runs_in_input_order() {
    let gauge = Gauge::default();
    let started = Mutex::new(Vec::new());
    let (gauge_ref, started_ref) = (&gauge, &started);
    let input = [10, 20, 30];

    let results = settle_all_bounded(
        &input,
        move |x, i, _| async move {
            gauge_ref.enter();
            started_ref.lock().unwrap().push(i);
            tokio::time::sleep(Duration::from_millis(2)).await;
            gauge_ref.exit();
            Ok::<_, String>(x * 2)
        },
        1,
    )
    .await;

    assert_eq!(values(&results), vec![Some(20), Some(40), Some(60)]);
    assert_eq!(gauge.peak(), 1);
    assert_eq!(*started.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_one_failure_does_not_disturb_siblings() {
    let input = [1, 2, 3];
    let results = settle_all_bounded(
        &input,
        |x, _, _| async move {
            if *x == 2 {
                Err(format!("cannot handle {}", x))
            } else {
                Ok(x + 100)
            }
        },
        ConcurrencyLimit::Unbounded,
    )
    .await;

    assert_eq!(
        results,
        vec![
            Settled::Fulfilled { value: 101 },
            Settled::Rejected {
                reason: "cannot handle 2".to_string()
            },
            Settled::Fulfilled { value: 103 },
        ]
    );
}

#[tokio::test]
async fn test_empty_input_never_calls_transform() {
    let gauge = Gauge::default();
    let gauge_ref = &gauge;
    let input: Vec<u8> = Vec::new();

    let results = settle_all_bounded(
        &input,
        move |x, _, _| async move {
            gauge_ref.enter();
            gauge_ref.exit();
            Ok::<_, String>(*x)
        },
        4,
    )
    .await;
    assert!(results.is_empty());

    let spawned = settle_all_bounded_spawned(
        Vec::<u8>::new(),
        |x: u8, _, _| async move { Ok::<_, String>(x) },
        4,
    )
    .await;
    assert!(spawned.is_empty());

    assert_eq!(gauge.calls(), 0);
    assert_eq!(Settler::new().worker_count(0), 0);
}

#[tokio::test]
async fn test_limit_above_length_launches_one_worker_per_input() {
    let gauge = Gauge::default();
    let gauge_ref = &gauge;
    let input = ["a", "b", "c"];

    let settler = Settler::with_config(SettleConfig::default().with_concurrency(10));
    assert_eq!(settler.worker_count(input.len()), 3);

    let results = settler
        .settle(&input, move |s, _, _| async move {
            gauge_ref.enter();
            tokio::time::sleep(Duration::from_millis(20)).await;
            gauge_ref.exit();
            Ok::<_, String>(s.to_uppercase())
        })
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(gauge.peak(), 3);
    assert_eq!(
        values(&results),
        vec![
            Some("A".to_string()),
            Some("B".to_string()),
            Some("C".to_string())
        ]
    );
}

#[tokio::test]
async fn test_results_align_with_input_for_any_limit() {
    let limits = [
        ConcurrencyLimit::Requested(-3),
        ConcurrencyLimit::Requested(0),
        ConcurrencyLimit::Requested(1),
        ConcurrencyLimit::Requested(2),
        ConcurrencyLimit::Requested(7),
        ConcurrencyLimit::Requested(1_000),
        ConcurrencyLimit::Unbounded,
    ];

    for len in [0usize, 1, 2, 7, 33] {
        let input: Vec<usize> = (0..len).collect();
        for limit in limits {
            // Later items finish first so completion order differs from input order
            let results = settle_all_bounded(
                &input,
                |x, i, all| async move {
                    tokio::time::sleep(Duration::from_millis((all.len() - i) as u64 % 4)).await;
                    if x % 3 == 0 {
                        Err(format!("multiple of three: {}", x))
                    } else {
                        Ok(x * 10)
                    }
                },
                limit,
            )
            .await;

            assert_eq!(results.len(), len, "length for limit {}", limit);
            for (i, settled) in results.iter().enumerate() {
                if i % 3 == 0 {
                    assert_eq!(
                        settled.reason(),
                        Some(&format!("multiple of three: {}", i)),
                        "index {} with limit {}",
                        i,
                        limit
                    );
                } else {
                    assert_eq!(settled.value(), Some(&(i * 10)), "index {} with limit {}", i, limit);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_out_of_range_limits_match_their_clamped_equivalent() {
    let input: Vec<u32> = (1..=6).collect();
    let transform = |x: &u32, i: usize, _: &[u32]| {
        let x = *x;
        async move { Ok::<_, String>(x as usize + i) }
    };

    let baseline = settle_all_bounded(&input, transform, 6).await;
    assert_eq!(settle_all_bounded(&input, transform, 60).await, baseline);
    assert_eq!(settle_all_bounded(&input, transform, Some(600)).await, baseline);

    let single = settle_all_bounded(&input, transform, 1).await;
    assert_eq!(single, baseline);
    assert_eq!(settle_all_bounded(&input, transform, 0).await, single);
    assert_eq!(settle_all_bounded(&input, transform, -5).await, single);
    assert_eq!(settle_all_bounded(&input, transform, 2.9).await, baseline);
    assert_eq!(settle_all_bounded(&input, transform, f64::NAN).await, single);

    assert_eq!(ConcurrencyLimit::from(60).clamp(6), 6);
    assert_eq!(ConcurrencyLimit::from(-5).clamp(6), 1);
    assert_eq!(ConcurrencyLimit::from(2.9).clamp(6), 2);
    assert_eq!(ConcurrencyLimit::from(f64::NAN).clamp(6), 1);
    assert_eq!(ConcurrencyLimit::from(f64::INFINITY).clamp(6), 6);
}

#[tokio::test]
async fn test_never_failing_transform_equals_direct_map() {
    let input: Vec<String> = ["alpha", "beta", "gamma", "delta"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let results = settle_all_bounded(
        &input,
        |s, _, _| async move { Ok::<_, ()>(s.len()) },
        2,
    )
    .await;

    let direct: Vec<Settled<usize, ()>> = input
        .iter()
        .map(|s| Settled::Fulfilled { value: s.len() })
        .collect();
    assert_eq!(results, direct);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_variant_isolates_failures() {
    let gauge = Arc::new(Gauge::default());
    let input: Vec<u64> = (0..50).collect();

    let tracker = Arc::clone(&gauge);
    let results = settle_all_bounded_spawned(
        input,
        move |x: u64, i, all| {
            let tracker = Arc::clone(&tracker);
            async move {
                tracker.enter();
                tokio::time::sleep(Duration::from_millis((all.len() - i) as u64 % 5)).await;
                tracker.exit();
                if x % 7 == 3 {
                    Err(x)
                } else {
                    Ok(x.to_string())
                }
            }
        },
        8,
    )
    .await;

    assert_eq!(results.len(), 50);
    assert_eq!(gauge.calls(), 50);
    assert!(gauge.peak() <= 8);
    for (i, settled) in results.iter().enumerate() {
        let i = i as u64;
        if i % 7 == 3 {
            assert_eq!(settled, &Settled::Rejected { reason: i });
        } else {
            assert_eq!(settled, &Settled::Fulfilled { value: i.to_string() });
        }
    }
}

#[tokio::test]
async fn test_settler_spawned_matches_cooperative() {
    let settler = Settler::with_config(SettleConfig::default().with_concurrency(3).with_label("compare"));
    let input: Vec<i64> = vec![4, -1, 9, 0, -7];

    let cooperative = settler
        .settle(&input, |x, _, _| {
            let x = *x;
            async move { u64::try_from(x).map_err(|_| format!("negative: {}", x)) }
        })
        .await;
    let spawned = settler
        .settle_spawned(input.clone(), |x: i64, _, _| async move {
            u64::try_from(x).map_err(|_| format!("negative: {}", x))
        })
        .await;

    assert_eq!(cooperative, spawned);
    assert_eq!(cooperative.iter().filter(|s| s.is_rejected()).count(), 2);
}

#[tokio::test]
async fn test_building_blocks_hand_out_disjoint_indices() {
    let input: Vec<u32> = (0..25).collect();
    let source = WorkSource::new(&input);
    let transform = |x: &u32, _: usize, _: &[u32]| {
        let x = *x;
        async move { Ok::<_, String>(x + 1) }
    };

    let (first, second) = futures::join!(drain(0, &source, &transform), drain(1, &source, &transform));
    assert_eq!(source.remaining(), 0);
    assert!(!source.is_empty());
    assert_eq!(first.processed() + second.processed(), 25);

    let mut slate = ResultSlate::new(input.len());
    slate.absorb(first);
    slate.absorb(second);
    assert!(slate.is_complete());

    let results = slate.into_results();
    assert_eq!(results[24], Settled::Fulfilled { value: 25 });
}

#[test]
fn test_settled_serialization_shape() {
    let fulfilled: Settled<u32, String> = Settled::Fulfilled { value: 7 };
    let rejected: Settled<u32, String> = Settled::Rejected {
        reason: "boom".to_string(),
    };

    assert_eq!(
        serde_json::to_value(&fulfilled).unwrap(),
        serde_json::json!({"status": "fulfilled", "value": 7})
    );
    assert_eq!(
        serde_json::to_value(&rejected).unwrap(),
        serde_json::json!({"status": "rejected", "reason": "boom"})
    );

    let parsed: Settled<u32, String> =
        serde_json::from_str(r#"{"status":"rejected","reason":"late"}"#).unwrap();
    assert_eq!(parsed.reason().map(String::as_str), Some("late"));
}

#[test]
fn test_library_info() {
    let info = settle_all_lib::info();
    assert_eq!(info.version, settle_all_lib::VERSION);
    assert!(info.features.contains(&"fetch"));
}
