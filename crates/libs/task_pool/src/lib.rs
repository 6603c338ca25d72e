//! Bounded concurrent mapping over async operations.
//!
//! Every pipeline stage that fans out over the network uses the same
//! primitive: apply an async operation to N inputs with a fixed concurrency
//! ceiling, streaming `(original_index, output)` pairs back in completion
//! order. Whenever an in-flight operation completes, the next not-yet-started
//! input is seeded *before* the completed result is yielded, so one slow item
//! never blocks the rest of the queue.

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use async_stream::stream;
use futures_util::Stream;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Maps `op` over `items` with at most `concurrency` operations in flight.
///
/// Results arrive in completion order, tagged with the input's original
/// index; every index appears exactly once. Operations must resolve to a
/// plain value: encode failures in `O` instead of panicking, so one bad item
/// cannot poison the fan-in.
pub fn map_bounded<I, O, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    op: F,
) -> impl Stream<Item = (usize, O)>
where
    F: FnMut(usize, I) -> Fut,
    Fut: Future<Output = O>,
{
    map_bounded_cancellable(items, concurrency, CancellationToken::new(), op)
}

/// Like [`map_bounded`], but stops seeding new operations once `cancel` is
/// tripped. In-flight operations are never interrupted mid-flight; they run
/// to completion and are still yielded, so the caller decides whether to
/// discard them. Inputs that never started are silently dropped.
pub fn map_bounded_cancellable<I, O, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    cancel: CancellationToken,
    mut op: F,
) -> impl Stream<Item = (usize, O)>
where
    F: FnMut(usize, I) -> Fut,
    Fut: Future<Output = O>,
{
    let concurrency = concurrency.max(1);
    stream! {
        let mut pending = items.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        // Single tagging closure so seed and refill push the same future type.
        let tag = |index: usize, fut: Fut| async move { (index, fut.await) };

        if !cancel.is_cancelled() {
            for (index, item) in pending.by_ref().take(concurrency) {
                in_flight.push(tag(index, op(index, item)));
            }
        }

        while let Some(done) = in_flight.next().await {
            // Refill before yielding, so the pool stays saturated while the
            // caller processes the completed result.
            if !cancel.is_cancelled()
                && let Some((index, item)) = pending.next()
            {
                in_flight.push(tag(index, op(index, item)));
            }
            yield done;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::pin_mut;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn every_index_appears_exactly_once() {
        let items: Vec<u64> = (0..25).collect();
        let stream = map_bounded(items, 4, |_, n| async move { n * 2 });
        pin_mut!(stream);

        let mut seen = HashSet::new();
        while let Some((index, doubled)) = stream.next().await {
            assert!(seen.insert(index), "index {index} emitted twice");
            assert_eq!(doubled, index as u64 * 2);
        }
        assert_eq!(seen.len(), 25);
    }

    #[tokio::test]
    async fn concurrency_ceiling_is_never_exceeded() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let stream = map_bounded((0..40).collect::<Vec<_>>(), 5, |_, _| {
            let current = current.clone();
            let peak = peak.clone();
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }
        });
        pin_mut!(stream);
        while stream.next().await.is_some() {}

        assert!(peak.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn results_arrive_in_completion_order() {
        // Index 0 is slow; with a ceiling of 2 the fast item must come first.
        let delays = vec![50u64, 1];
        let stream = map_bounded(delays, 2, |_, ms| async move {
            sleep(Duration::from_millis(ms)).await;
        });
        pin_mut!(stream);

        let (first, _) = stream.next().await.expect("first result");
        assert_eq!(first, 1);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped_to_one() {
        let stream = map_bounded(vec![7], 0, |_, n: i32| async move { n });
        pin_mut!(stream);
        assert_eq!(stream.next().await, Some((0, 7)));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        let stream = map_bounded(Vec::<u8>::new(), 3, |_, n| async move { n });
        pin_mut!(stream);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn cancellation_stops_new_seeds_but_finishes_in_flight() {
        let cancel = CancellationToken::new();
        let started = Arc::new(AtomicUsize::new(0));

        let stream = {
            let started = started.clone();
            map_bounded_cancellable((0..20).collect::<Vec<_>>(), 3, cancel.clone(), move |_, n| {
                started.fetch_add(1, Ordering::SeqCst);
                async move {
                    sleep(Duration::from_millis(5)).await;
                    n
                }
            })
        };
        pin_mut!(stream);

        let mut received = 0;
        while stream.next().await.is_some() {
            received += 1;
            cancel.cancel();
        }

        // The three seeded before the first completion all finish and are
        // yielded; nothing new starts after the cancel.
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(received, 3);
    }
}
