//! HTTP client for the card data provider
//!
//! The provider rejects requests that do not look like they come from its own
//! web front end, so every request carries browser headers.

use async_trait::async_trait;
use fcdb_common::Error;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::payload::decode_payload;
use super::retry::{retry_fetch, RetryPolicy};
use super::ProviderSource;
use crate::config::ProviderSettings;
use crate::error::SyncError;
use crate::types::SyncState;

const ACCEPT: &str = "application/json, text/plain, */*";

/// Provider client with retry
pub struct ProviderClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ProviderClient {
    pub fn new(settings: &ProviderSettings) -> fcdb_common::Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .default_headers(browser_headers(settings)?)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
            retry: settings.retry,
        })
    }

    /// Absolute URL of `endpoint`, with `?page=N` when paging
    pub fn url_for(&self, endpoint: &str, page: Option<u32>) -> String {
        let mut url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        if let Some(page) = page {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(&format!("page={}", page));
        }
        url
    }

    async fn fetch_once(&self, url: &str) -> Result<Value, SyncError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SyncError::Timeout {
                    step: SyncState::Fetching,
                    after: self.timeout,
                }
            } else {
                SyncError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Network(format!("Failed to read response body: {}", e)))?;

        debug!(url, bytes = body.len(), "Provider response received");

        decode_payload(&body)
    }
}

#[async_trait]
impl ProviderSource for ProviderClient {
    async fn fetch(&self, endpoint: &str, page: Option<u32>) -> Result<Value, SyncError> {
        let url = self.url_for(endpoint, page);
        debug!(url = %url, "Fetching from provider");
        let url = url.as_str();
        retry_fetch(url, &self.retry, move || self.fetch_once(url)).await
    }
}

fn browser_headers(settings: &ProviderSettings) -> fcdb_common::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, header_value(&settings.user_agent)?);
    headers.insert(header::REFERER, header_value(&settings.referer)?);
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        header_value(&settings.sec_ch_ua)?,
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        header_value(&settings.sec_ch_ua_platform)?,
    );
    Ok(headers)
}

fn header_value(value: &str) -> fcdb_common::Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Config(format!("Invalid header value {:?}: {}", value, e)))
}
