//! Replay queue and readiness gate behaviour under ordering and concurrency
//!
//! Covers FIFO preservation for arbitrary inputs, exactly-once draining while
//! enqueuers race a drain, and the readiness check performed under the queue
//! lock.

use proptest::prelude::*;
use pushrelay_core::{
    ConsumerReadiness, Enqueue, Message, OverflowPolicy, QueueConfig, ReadinessState, ReplayQueue,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ----------------------------------------------------------------------------
// Ordering Properties
// ----------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_drain_preserves_enqueue_order(payloads in prop::collection::vec(".{1,16}", 0..64)) {
        let queue = ReplayQueue::unbounded();
        for (i, payload) in payloads.iter().enumerate() {
            let outcome = queue.enqueue(Message::new(i as u64, payload.clone()));
            prop_assert_eq!(outcome, Enqueue::Queued);
        }

        let drained: Vec<String> =
            queue.drain_all().into_iter().map(Message::into_payload).collect();
        prop_assert_eq!(drained, payloads);
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn prop_bounded_drop_oldest_keeps_newest(count in 0usize..64, capacity in 1usize..16) {
        let queue = ReplayQueue::new(QueueConfig::bounded(capacity, OverflowPolicy::DropOldest));
        for i in 0..count {
            queue.enqueue(Message::new(i as u64, "x"));
        }

        let drained: Vec<u64> = queue.drain_all().iter().map(Message::sequence).collect();
        let expected: Vec<u64> =
            (count.saturating_sub(capacity)..count).map(|i| i as u64).collect();
        prop_assert_eq!(drained, expected);
    }
}

// ----------------------------------------------------------------------------
// Concurrency
// ----------------------------------------------------------------------------

#[test]
fn test_concurrent_enqueue_during_drain_is_exactly_once() {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 2_000;

    let queue = Arc::new(ReplayQueue::unbounded());
    let done = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let sequence = p * PER_PRODUCER + i;
                    queue.enqueue(Message::new(sequence, sequence.to_string()));
                }
            })
        })
        .collect();

    let drainer = {
        let queue = queue.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut seen = Vec::new();
            while !done.load(Ordering::SeqCst) {
                seen.extend(queue.drain_all());
                thread::yield_now();
            }
            seen.extend(queue.drain_all());
            seen
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    let seen = drainer.join().unwrap();

    assert_eq!(seen.len() as u64, PRODUCERS * PER_PRODUCER);
    let unique: HashSet<u64> = seen.iter().map(Message::sequence).collect();
    assert_eq!(unique.len(), seen.len(), "a message was drained twice");

    // Per-producer order is preserved across drains
    for p in 0..PRODUCERS {
        let range = p * PER_PRODUCER..(p + 1) * PER_PRODUCER;
        let ordered: Vec<u64> = seen
            .iter()
            .map(Message::sequence)
            .filter(|s| range.contains(s))
            .collect();
        assert!(ordered.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_readiness_checked_under_queue_lock_never_strands_messages() {
    for _ in 0..50 {
        let queue = Arc::new(ReplayQueue::unbounded());
        let readiness = Arc::new(ConsumerReadiness::new());

        let producer = {
            let queue = queue.clone();
            let readiness = readiness.clone();
            thread::spawn(move || {
                let mut bypassed = Vec::new();
                for i in 0..500u64 {
                    if let Enqueue::Bypassed(m) =
                        queue.enqueue_unless(Message::new(i, "p"), || readiness.is_ready())
                    {
                        bypassed.push(m.sequence());
                    }
                }
                bypassed
            })
        };

        thread::sleep(Duration::from_micros(50));
        readiness.mark_ready();
        let replayed: Vec<u64> = queue.drain_all().iter().map(Message::sequence).collect();

        let bypassed = producer.join().unwrap();

        // Everything enqueued after the drain must have been bypassed instead
        assert!(queue.is_empty(), "message stranded after replay");
        let mut all: Vec<u64> = replayed.iter().chain(bypassed.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
        assert_eq!(readiness.current_state(), ReadinessState::Ready);
    }
}

#[tokio::test]
async fn test_many_waiters_released_by_one_mark_ready() {
    let readiness = Arc::new(ConsumerReadiness::new());
    assert!(readiness.begin_start());

    let waiters: Vec<_> = (0..16)
        .map(|_| {
            let readiness = readiness.clone();
            tokio::spawn(async move { readiness.wait_ready().await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(readiness.mark_ready());

    let results = tokio::time::timeout(Duration::from_secs(1), futures::future::join_all(waiters))
        .await
        .expect("waiters should be released");
    assert!(results.into_iter().all(|r| r.is_ok()));
}
