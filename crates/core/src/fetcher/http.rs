//! HTTP page fetcher backed by reqwest.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{FetchError, PageFetcher, SourceConfig};
use crate::metrics;

/// Fetches pages from the configured source site.
pub struct HttpFetcher {
    client: Client,
    config: SourceConfig,
}

impl HttpFetcher {
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| FetchError::ConnectionFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn get(&self, url: &str, kind: &'static str) -> Result<String, FetchError> {
        let started = Instant::now();
        let result = self.get_inner(url).await;
        metrics::FETCH_DURATION
            .with_label_values(&[kind])
            .observe(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => metrics::FETCH_REQUESTS.with_label_values(&[kind, "success"]).inc(),
            Err(e) => {
                metrics::FETCH_REQUESTS.with_label_values(&[kind, "error"]).inc();
                metrics::FETCH_FAILURES.with_label_values(&[e.kind()]).inc();
            }
        }
        result
    }

    async fn get_inner(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "Fetching page");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else if e.is_builder() {
                FetchError::InvalidUrl(url.to_string())
            } else {
                FetchError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Blocked {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body(e.to_string())
            }
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_listing(&self, page: u32) -> Result<String, FetchError> {
        let url = self.config.listing_url(page);
        self.get(&url, "listing").await
    }

    async fn fetch_detail(&self, url: &str) -> Result<String, FetchError> {
        self.get(url, "detail").await
    }
}
