//! Where raw clip bytes come from
//!
//! The audio generator hands back a locator (usually an HTTPS URL to an
//! MP3). `RemoteClipSource` resolves it; `InMemoryClipSource` stands in for
//! it in tests and counts how often it was asked.

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;

/// Failure to retrieve raw bytes for a locator
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("server answered {status}")]
    Status { status: u16 },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unsupported locator: {0}")]
    UnsupportedLocator(String),
}

/// Retrieves raw clip bytes for a locator
pub trait ClipSource: Send + Sync {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SourceError>;
}

// ============================================================================
// Remote
// ============================================================================

/// HTTP(S) via blocking reqwest, plus `file://` URLs and plain paths
pub struct RemoteClipSource {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl RemoteClipSource {
    /// Create a source whose requests fail fast after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("booktrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|e| self.classify(e))?;
        Ok(body.to_vec())
    }

    fn classify(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if let Some(status) = e.status() {
            SourceError::Status {
                status: status.as_u16(),
            }
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

impl ClipSource for RemoteClipSource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SourceError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return self.fetch_http(locator);
        }

        let path = locator.strip_prefix("file://").unwrap_or(locator);
        if path.contains("://") {
            return Err(SourceError::UnsupportedLocator(locator.to_string()));
        }
        fs::read(path).map_err(|e| SourceError::Transport(format!("{}: {}", path, e)))
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Fixed locator → bytes table that records every lookup
#[derive(Debug, Default)]
pub struct InMemoryClipSource {
    clips: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl InMemoryClipSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_clip(mut self, locator: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.clips.insert(locator.into(), bytes);
        self
    }

    /// Number of `fetch` calls so far, successful or not
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ClipSource for InMemoryClipSource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.clips
            .get(locator)
            .cloned()
            .ok_or(SourceError::Status { status: 404 })
    }
}
