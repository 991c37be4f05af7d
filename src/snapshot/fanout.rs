use std::future::Future;

use futures_util::stream::{self, StreamExt, TryStreamExt};

/// Run `op` over every item with at most `limit` calls in flight.
///
/// Completes only when every call has succeeded. The first error is returned
/// immediately and the remaining in-flight calls are dropped, which cancels
/// them at their next await point. Output order is unspecified.
pub async fn try_join_bounded<I, F, Fut, T, E>(items: I, limit: usize, op: F) -> Result<Vec<T>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    stream::iter(items)
        .map(op)
        .buffer_unordered(limit.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_collects_all_results() {
        let mut out: Vec<u32> = try_join_bounded(1..=5u32, 2, |n| async move {
            Ok::<_, String>(n * 10)
        })
        .await
        .unwrap();
        out.sort_unstable();
        assert_eq!(out, vec![10, 20, 30, 40, 50]);
    }

    #[tokio::test]
    async fn test_respects_concurrency_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        try_join_bounded(0..12, 3, |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_zero_limit_still_makes_progress() {
        let out = try_join_bounded(0..3, 0, |n| async move { Ok::<_, String>(n) })
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn test_first_error_cancels_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            try_join_bounded(0..4, 4, |n| {
                let finished = Arc::clone(&finished);
                async move {
                    if n == 2 {
                        return Err(format!("item {n} failed"));
                    }
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(n)
                }
            }),
        )
        .await
        .expect("join must not wait for slow siblings");

        assert_eq!(result.unwrap_err(), "item 2 failed");
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let out: Vec<u8> = try_join_bounded(Vec::<u8>::new(), 4, |n| async move {
            Ok::<_, String>(n)
        })
        .await
        .unwrap();
        assert!(out.is_empty());
    }
}
