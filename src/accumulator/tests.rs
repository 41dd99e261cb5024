use super::*;
use crate::cursor::CursorPageSource;
use crate::document::{Document, InMemoryStore};
use crate::pagination::{CollectionSource, PageSource};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Serves `0..total` (offset by the query's `base` param) in `limit`-sized pages
struct Numbers {
    total: u64,
    latency: Duration,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl Numbers {
    fn new(total: u64) -> Self {
        Self {
            total,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl PageSource<u64> for Numbers {
    async fn fetch_page(&self, query: &Query, cursor: Option<&PageCursor>) -> Result<Page<u64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::http_status(503, "unavailable"));
        }

        let base = query.extra.get("base").and_then(|v| v.as_u64()).unwrap_or(0);
        let start = match cursor {
            Some(PageCursor::Value(v)) => v.as_u64().unwrap_or(0),
            _ => 0,
        };
        let end = (start + u64::from(query.limit)).min(self.total);
        let rows = (start..end).map(|i| base + i).collect();
        let has_next = end < self.total;
        Ok(Page::new(
            rows,
            has_next.then(|| PageCursor::Value(json!(end))),
            has_next,
        ))
    }
}

#[tokio::test]
async fn test_load_more_appends_until_exhausted() {
    let source = Arc::new(Numbers::new(7));
    let acc = InfiniteAccumulator::new(source.clone(), Query::new(3));

    assert!(acc.has_more());
    assert!(acc.is_empty());
    assert_eq!(acc.load_more().await.unwrap(), LoadOutcome::Appended { rows: 3 });
    assert_eq!(acc.load_more().await.unwrap(), LoadOutcome::Appended { rows: 3 });
    assert_eq!(acc.load_more().await.unwrap(), LoadOutcome::Appended { rows: 1 });
    assert!(!acc.has_more());
    assert_eq!(acc.load_more().await.unwrap(), LoadOutcome::Exhausted);

    assert_eq!(acc.rows(), vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(acc.page_count(), 3);
    assert_eq!(acc.len(), 7);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_load_more_appends_one_page() {
    let source = Arc::new(Numbers::new(100).with_latency(Duration::from_millis(50)));
    let acc = InfiniteAccumulator::new(source.clone(), Query::new(10));

    let (a, b, c) = tokio::join!(acc.load_more(), acc.load_more(), acc.load_more());
    let mut outcomes = vec![a.unwrap(), b.unwrap(), c.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, LoadOutcome::InFlight));

    assert_eq!(
        outcomes,
        vec![
            LoadOutcome::Appended { rows: 10 },
            LoadOutcome::InFlight,
            LoadOutcome::InFlight
        ]
    );
    assert_eq!(acc.page_count(), 1);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(!acc.is_loading());
}

#[tokio::test]
async fn test_response_for_superseded_query_is_discarded() {
    let source = Arc::new(Numbers::new(100).with_latency(Duration::from_millis(60)));
    let acc = InfiniteAccumulator::new(source.clone(), Query::new(5));

    let (outcome, changed) = tokio::join!(acc.load_more(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        acc.reset(Query::new(5).with_param("base", 1000))
    });

    assert!(changed);
    assert_eq!(outcome.unwrap(), LoadOutcome::Discarded);
    assert!(acc.is_empty());
    assert_eq!(acc.generation(), 1);

    acc.load_more().await.unwrap();
    assert_eq!(acc.rows(), vec![1000, 1001, 1002, 1003, 1004]);
}

#[tokio::test]
async fn test_reset_with_same_identity_keeps_rows() {
    let acc = InfiniteAccumulator::new(Arc::new(Numbers::new(20)), Query::new(5).with_sort("n"));
    acc.load_more().await.unwrap();

    assert!(!acc.reset(Query::new(5).with_sort("n").with_page(3)));
    assert_eq!(acc.len(), 5);
    assert_eq!(acc.generation(), 0);

    assert!(acc.reset(Query::new(5).with_sort("-n")));
    assert!(acc.is_empty());
    assert!(acc.has_more());
    assert_eq!(acc.query().page, 1);
}

#[tokio::test]
async fn test_refresh_discards_pages() {
    let acc = InfiniteAccumulator::new(Arc::new(Numbers::new(20)), Query::new(5));
    acc.load_more().await.unwrap();
    acc.load_more().await.unwrap();

    acc.refresh();

    assert!(acc.is_empty());
    assert_eq!(acc.generation(), 1);
    acc.load_more().await.unwrap();
    assert_eq!(acc.rows(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_error_propagates_and_allows_retry() {
    let source = Arc::new(Numbers::new(10));
    let acc = InfiniteAccumulator::new(source.clone(), Query::new(5));

    source.fail.store(true, Ordering::SeqCst);
    let err = acc.load_more().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(!acc.is_loading());
    assert!(acc.is_empty());

    source.fail.store(false, Ordering::SeqCst);
    assert_eq!(acc.load_more().await.unwrap(), LoadOutcome::Appended { rows: 5 });
}

#[tokio::test]
async fn test_cancelled_load_clears_in_flight() {
    let source = Arc::new(Numbers::new(10).with_latency(Duration::from_secs(5)));
    let acc = InfiniteAccumulator::new(source, Query::new(5));

    let timed_out = tokio::time::timeout(Duration::from_millis(20), acc.load_more()).await;

    assert!(timed_out.is_err());
    assert!(!acc.is_loading());
    assert!(acc.has_more());
}

#[tokio::test]
async fn test_accumulates_document_store_pages() {
    let store = InMemoryStore::with_documents(
        (0..5)
            .map(|i| {
                Document::new(
                    &format!("sellers/s{}/products/p{i}", i % 2),
                    json!({ "createdAt": i }),
                )
                .unwrap()
            })
            .collect(),
    )
    .with_latency(Duration::from_millis(20));
    let store = Arc::new(store);

    let source: Arc<dyn PageSource<serde_json::Value>> = Arc::new(CollectionSource::new(
        Arc::new(CursorPageSource::new(store.clone())),
        "products",
    ));
    let acc = InfiniteAccumulator::new(source, Query::new(2).with_sort("-createdAt"));

    while acc.has_more() {
        acc.load_more().await.unwrap();
    }

    let created: Vec<i64> = acc
        .rows()
        .iter()
        .map(|row| row["createdAt"].as_i64().unwrap())
        .collect();
    assert_eq!(created, vec![4, 3, 2, 1, 0]);
    assert_eq!(store.query_count(), 3);
}
