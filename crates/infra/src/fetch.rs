//! HTTP fetcher: bounded, streaming download of one source URL.

use std::time::Duration;

use async_trait::async_trait;
use tokio_stream::StreamExt;
use tracing::debug;

use fetchvault_core::key::DEFAULT_CONTENT_TYPE;
use fetchvault_core::{FetchError, SourceUrl};

/// A successfully fetched body plus the content type the source declared
/// (or the octet-stream fallback when it declared none).
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Fetch port. Lets the worker pool run against scripted fetchers in tests
/// instead of a live network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &SourceUrl) -> Result<FetchedBody, FetchError>;
}

/// Limits applied to every fetch.
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Total per-request deadline, connect through last body byte.
    pub timeout: Duration,
    /// Hard cap on the response body size.
    pub max_object_bytes: u64,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_object_bytes: 25 * 1024 * 1024,
        }
    }
}

/// reqwest-backed [`Fetcher`].
///
/// Holds one shared client, built once at startup; the whole worker pool
/// uses it concurrently and benefits from its connection pooling.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_object_bytes: u64,
}

impl HttpFetcher {
    pub fn new(limits: &FetchLimits) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10).min(limits.timeout))
            .timeout(limits.timeout)
            .build()?;

        Ok(Self {
            client,
            max_object_bytes: limits.max_object_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &SourceUrl) -> Result<FetchedBody, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // Declared-oversize bodies are rejected before reading a byte.
        if let Some(len) = response.content_length() {
            if len > self.max_object_bytes {
                return Err(FetchError::Oversize {
                    limit: self.max_object_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        // Stream the body and abort as soon as the cap is crossed, so an
        // unbounded (chunked) response cannot balloon worker memory.
        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::transport(e.to_string()))?;
            if (bytes.len() + chunk.len()) as u64 > self.max_object_bytes {
                return Err(FetchError::Oversize {
                    limit: self.max_object_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(
            url = %url,
            status = status.as_u16(),
            size_bytes = bytes.len(),
            content_type = %content_type,
            "fetched source"
        );

        Ok(FetchedBody {
            bytes,
            content_type,
        })
    }
}
