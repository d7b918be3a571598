//! HTTP client for storefront harvesting
//!
//! Every request fails fast: there are no retries here. A failed listing page
//! ends that endpoint's walk and a failed detail fetch skips that item, so the
//! transport only has to report what went wrong.

use anyhow::Context;
use async_trait::async_trait;
use governor::{Quota, RateLimiter, clock::DefaultClock, state::{InMemoryState, direct::NotKeyed}};
use reqwest::{Client, header::USER_AGENT};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

pub use crate::infrastructure::config::HttpClientConfig;

/// Transport failure of a single fetch
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch URL {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed with status {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    pub fn status(url: &str, status: u16) -> Self {
        Self::Status {
            url: url.to_string(),
            status,
        }
    }

    pub fn body(url: &str, reason: impl Into<String>) -> Self {
        Self::Body {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Request { url, .. } | Self::Status { url, .. } | Self::Body { url, .. } => url,
        }
    }
}

/// Source of page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a URL and return its body as text
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest client with a per-request rotating User-Agent and a rate ceiling
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            config,
        })
    }

    /// Browser identity for the next request
    fn pick_user_agent(&self) -> Option<&str> {
        if self.config.user_agents.is_empty() {
            return None;
        }
        let index = fastrand::usize(..self.config.user_agents.len());
        self.config.user_agents.get(index).map(String::as_str)
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("Fetching URL: {}", url);

        let mut request = self.client.get(url);
        if let Some(user_agent) = self.pick_user_agent() {
            request = request.header(USER_AGENT, user_agent);
        }

        let response = request.send().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(url, status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::body(url, e.to_string()))?;

        tracing::debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = HttpClient::new(HttpClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn rejects_zero_rate_limit() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpClient::new(config).is_err());
    }

    #[test]
    fn rotates_only_configured_user_agents() {
        let config = HttpClientConfig {
            user_agents: vec!["agent-a".into(), "agent-b".into()],
            ..Default::default()
        };
        let client = HttpClient::new(config).unwrap();

        for _ in 0..20 {
            let agent = client.pick_user_agent().unwrap();
            assert!(agent == "agent-a" || agent == "agent-b");
        }
    }

    #[test]
    fn no_user_agent_header_without_agents() {
        let config = HttpClientConfig {
            user_agents: Vec::new(),
            ..Default::default()
        };
        let client = HttpClient::new(config).unwrap();
        assert!(client.pick_user_agent().is_none());
    }

    #[test]
    fn fetch_errors_report_their_url() {
        let err = FetchError::status("https://shop.si/x", 503);
        assert_eq!(err.url(), "https://shop.si/x");
        assert!(err.to_string().contains("503"));
    }
}
