//! Upstream data provider
//!
//! - `client`: reqwest client with browser headers and retry
//! - `payload`: response decoding (envelopes, error sentinel)
//! - `retry`: bounded exponential backoff

pub mod client;
pub mod payload;
pub mod retry;

pub use client::ProviderClient;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SyncError;

/// Source of raw provider payloads
#[async_trait]
pub trait ProviderSource: Send + Sync {
    /// Fetch and decode one endpoint (optionally one page of it)
    async fn fetch(&self, endpoint: &str, page: Option<u32>) -> Result<Value, SyncError>;
}

/// How many requests an endpoint gets in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePlan {
    /// One request without a page parameter
    Single,
    /// `?page=1..=max_pages`, stopping early on an empty page
    Paged { max_pages: u32, delay: Duration },
}

/// Fetch every payload of an endpoint according to `plan`
///
/// Empty pages are not returned.
pub async fn fetch_pages(
    source: &dyn ProviderSource,
    endpoint: &str,
    plan: PagePlan,
) -> Result<Vec<Value>, SyncError> {
    let (max_pages, delay) = match plan {
        PagePlan::Single => return Ok(vec![source.fetch(endpoint, None).await?]),
        PagePlan::Paged { max_pages, delay } => (max_pages, delay),
    };

    // One permit per `delay`: the first page goes out at once, later pages wait
    let limiter = Quota::with_period(delay).map(RateLimiter::direct);

    let mut pages = Vec::new();
    for page in 1..=max_pages {
        if let Some(limiter) = &limiter {
            limiter.until_ready().await;
        }

        let payload = source.fetch(endpoint, Some(page)).await?;
        if payload::is_empty_page(&payload) {
            debug!(endpoint, page, "Empty page, stopping pagination");
            break;
        }
        pages.push(payload);
    }

    info!(endpoint, pages = pages.len(), max_pages, "Pagination complete");

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Serves `pages[n - 1]` for page `n`, an empty array past the end
    struct PagedSource {
        pages: Vec<Value>,
        requested: Mutex<Vec<Option<u32>>>,
    }

    impl PagedSource {
        fn new(pages: Vec<Value>) -> Self {
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<Option<u32>> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderSource for PagedSource {
        async fn fetch(&self, _endpoint: &str, page: Option<u32>) -> Result<Value, SyncError> {
            self.requested.lock().unwrap().push(page);
            let index = page.unwrap_or(1) as usize - 1;
            Ok(self.pages.get(index).cloned().unwrap_or_else(|| json!([])))
        }
    }

    fn three_pages() -> Vec<Value> {
        vec![
            json!([{ "id": 1, "name": "TraitName_1" }]),
            json!([{ "id": 2, "name": "TraitName_2" }]),
            json!([{ "id": 3, "name": "TraitName_3" }]),
        ]
    }

    #[tokio::test]
    async fn test_single_request_has_no_page_parameter() {
        let source = PagedSource::new(three_pages());
        let pages = fetch_pages(&source, "metadata", PagePlan::Single).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(source.requested(), vec![None]);
    }

    #[tokio::test]
    async fn test_max_pages_bounds_requests() {
        let source = PagedSource::new(three_pages());
        let plan = PagePlan::Paged {
            max_pages: 2,
            delay: Duration::ZERO,
        };
        let pages = fetch_pages(&source, "traits", plan).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(source.requested(), vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_empty_page_stops_early() {
        let source = PagedSource::new(three_pages());
        let plan = PagePlan::Paged {
            max_pages: 10,
            delay: Duration::ZERO,
        };
        let pages = fetch_pages(&source, "traits", plan).await.unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(source.requested().len(), 4);
    }

    #[tokio::test]
    async fn test_delay_between_pages() {
        let source = PagedSource::new(three_pages());
        let plan = PagePlan::Paged {
            max_pages: 3,
            delay: Duration::from_millis(40),
        };

        let started = Instant::now();
        fetch_pages(&source, "traits", plan).await.unwrap();

        // Three pages, two waits
        assert!(started.elapsed() >= Duration::from_millis(70));
    }
}
