use super::*;
use crate::types::BackoffType;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

fn counting_fetch(
    calls: Arc<AtomicU32>,
    delay: Duration,
) -> impl Fn() -> BoxFuture<'static, Result<u32>> + Send + Sync + 'static {
    move || {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            tokio::time::sleep(delay).await;
            Ok(n)
        }
        .boxed()
    }
}

// ============================================================================
// Dedup
// ============================================================================

#[tokio::test]
async fn test_concurrent_identical_requests_share_one_fetch() {
    let cache: RequestCache<u32> = RequestCache::default();
    let calls = Arc::new(AtomicU32::new(0));

    let (a, b, c) = tokio::join!(
        cache.get_or_fetch(
            "products?page=1".into(),
            counting_fetch(calls.clone(), Duration::from_millis(50))
        ),
        cache.get_or_fetch(
            "products?page=1".into(),
            counting_fetch(calls.clone(), Duration::from_millis(50))
        ),
        cache.get_or_fetch(
            "products?page=1".into(),
            counting_fetch(calls.clone(), Duration::from_millis(50))
        ),
    );

    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 1);
    assert_eq!(c.unwrap(), 1);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(cache.fetch_count(), 1);
}

#[tokio::test]
async fn test_different_keys_fetch_independently() {
    let cache: RequestCache<u32> = RequestCache::default();
    let calls = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
        cache.get_or_fetch(
            "products?page=1".into(),
            counting_fetch(calls.clone(), Duration::from_millis(20))
        ),
        cache.get_or_fetch(
            "products?page=2".into(),
            counting_fetch(calls.clone(), Duration::from_millis(20))
        ),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dedup_only_refetches_after_settle() {
    let cache: RequestCache<u32> = RequestCache::new(CacheConfig::dedup_only());
    let calls = Arc::new(AtomicU32::new(0));

    let first = cache
        .get_or_fetch("k".into(), counting_fetch(calls.clone(), Duration::ZERO))
        .await
        .unwrap();
    let second = cache
        .get_or_fetch("k".into(), counting_fetch(calls.clone(), Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);
}

// ============================================================================
// Stale Time
// ============================================================================

#[tokio::test]
async fn test_stale_time_reuses_settled_result() {
    let cache: RequestCache<u32> =
        RequestCache::new(CacheConfig::default().with_stale_time(Duration::from_secs(60)));
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
        let value = cache
            .get_or_fetch("k".into(), counting_fetch(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(value, 1);
    }
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    cache.invalidate("k").await;
    let value = cache
        .get_or_fetch("k".into(), counting_fetch(calls.clone(), Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(value, 2);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let cache: RequestCache<u32> =
        RequestCache::new(CacheConfig::default().with_stale_time(Duration::from_millis(10)));
    let calls = Arc::new(AtomicU32::new(0));

    cache
        .get_or_fetch("k".into(), counting_fetch(calls.clone(), Duration::ZERO))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let value = cache
        .get_or_fetch("k".into(), counting_fetch(calls.clone(), Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(value, 2);
}

#[tokio::test]
async fn test_expired_entries_are_pruned() {
    let cache: RequestCache<u32> =
        RequestCache::new(CacheConfig::default().with_stale_time(Duration::from_millis(10)));
    let calls = Arc::new(AtomicU32::new(0));

    for key in ["page-1", "page-2", "page-3"] {
        cache
            .get_or_fetch(key.into(), counting_fetch(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
    }
    assert_eq!(cache.len().await, 3);

    tokio::time::sleep(Duration::from_millis(30)).await;
    cache
        .get_or_fetch("page-4".into(), counting_fetch(calls.clone(), Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_dedup_only_keeps_nothing_after_settle() {
    let cache: RequestCache<u32> = RequestCache::default();
    let calls = Arc::new(AtomicU32::new(0));

    cache
        .get_or_fetch("k".into(), counting_fetch(calls, Duration::ZERO))
        .await
        .unwrap();

    assert!(cache.is_empty().await);
}

// ============================================================================
// Errors and Retries
// ============================================================================

#[tokio::test]
async fn test_failure_reaches_every_waiter_and_is_not_cached() {
    let cache: RequestCache<u32> =
        RequestCache::new(CacheConfig::default().with_stale_time(Duration::from_secs(60)));
    let calls = Arc::new(AtomicU32::new(0));

    let failing = |calls: Arc<AtomicU32>| {
        move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err::<u32, _>(Error::http_status(404, "missing"))
            }
        }
    };

    let (a, b) = tokio::join!(
        cache.get_or_fetch("k".into(), failing(calls.clone())),
        cache.get_or_fetch("k".into(), failing(calls.clone())),
    );

    for result in [a, b] {
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    let again = cache.get_or_fetch("k".into(), failing(calls.clone())).await;
    assert!(matches!(again, Err(Error::HttpStatus { status: 404, .. })));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retry_policy_retries_retryable_errors() {
    let retry = RetryPolicy::new(2).backoff(
        BackoffType::Constant,
        Duration::from_millis(1),
        Duration::from_millis(5),
    );
    let cache: RequestCache<u32> = RequestCache::new(CacheConfig::default().with_retry(retry));
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let value = cache
        .get_or_fetch("k".into(), move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n < 2 {
                    Err(Error::http_status(503, "busy"))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 7);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    assert_eq!(cache.fetch_count(), 1);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let cache: RequestCache<u32> = RequestCache::default();
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result = cache
        .get_or_fetch("k".into(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err::<u32, _>(Error::http_status(503, "busy"))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_calculate_backoff() {
    let base = Duration::from_millis(100);

    let constant = RetryPolicy::new(3).backoff(BackoffType::Constant, base, Duration::from_secs(1));
    assert_eq!(constant.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(constant.calculate_backoff(5), Duration::from_millis(100));

    let linear = RetryPolicy::new(3).backoff(BackoffType::Linear, base, Duration::from_secs(1));
    assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));
    assert_eq!(linear.calculate_backoff(u32::MAX), Duration::from_secs(1));

    let huge = RetryPolicy::new(3).backoff(
        BackoffType::Linear,
        Duration::from_secs(u64::MAX / 2),
        Duration::from_secs(60),
    );
    assert_eq!(huge.calculate_backoff(3), Duration::from_secs(60));

    let exponential =
        RetryPolicy::new(3).backoff(BackoffType::Exponential, base, Duration::from_millis(500));
    assert_eq!(exponential.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(exponential.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(exponential.calculate_backoff(10), Duration::from_millis(500));
}
