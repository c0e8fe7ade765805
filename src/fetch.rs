//! Filter list download.
//!
//! Fetching is an injected capability: the manager only sees the [`Fetcher`]
//! trait. [`HttpFetcher`] is the production implementation; tests and
//! embedders can supply their own.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use std::time::Duration;

use crate::config::SourceList;
use crate::error::FetchError;

/// User agent sent with list downloads.
const USER_AGENT: &str = concat!("dnrc/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw text of one source list.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &SourceList) -> Result<String, FetchError>;
}

/// HTTP fetcher built on reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests abort after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::HttpStatus {
            code: status.as_u16(),
        }
    } else {
        FetchError::Network(e.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceList) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
            });
        }

        response.text().await.map_err(map_reqwest_error)
    }
}

/// Outcome of fetching one source.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub source: SourceList,
    pub result: Result<String, FetchError>,
}

/// Fetch every source concurrently, each bounded by `timeout`.
///
/// Outcomes are returned in source order. One source failing never affects
/// the others.
pub async fn fetch_all(
    fetcher: &dyn Fetcher,
    sources: &[SourceList],
    timeout: Duration,
) -> Vec<FetchOutcome> {
    let tasks = sources.iter().map(|source| async move {
        log::info!("Fetching {}...", source.display_name);
        let result = match tokio::time::timeout(timeout, fetcher.fetch(source)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };
        if let Err(ref e) = result {
            log::warn!("Failed to fetch {}: {}", source.display_name, e);
        }
        FetchOutcome {
            source: source.clone(),
            result,
        }
    });

    join_all(tasks).await
}
