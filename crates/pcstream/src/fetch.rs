//! Byte-range fetch capability.
//!
//! A [`Fetch`] implementation retrieves a whole resource or a byte range of
//! it. [`HttpFetcher`] talks to a remote object store; [`MemoryStore`] serves
//! pre-supplied blobs for offline use and tests.

use std::collections::HashMap;
use std::future::Future;

use reqwest::StatusCode;

use crate::error::{Error, Result};

/// A contiguous byte range within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    #[must_use]
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset, or `None` if it does not fit in a `u64`.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }

    /// Value for an HTTP `Range` header (inclusive end).
    #[must_use]
    pub fn header_value(&self) -> String {
        let last = self.offset.saturating_add(self.length).saturating_sub(1);
        format!("bytes={}-{last}", self.offset)
    }

    fn slice<'a>(&self, locator: &str, bytes: &'a [u8]) -> Result<&'a [u8]> {
        let out_of_bounds = || Error::RangeOutOfBounds {
            locator: locator.to_string(),
            offset: self.offset,
            length: self.length,
            available: bytes.len(),
        };
        let start = usize::try_from(self.offset).map_err(|_| out_of_bounds())?;
        let end = self
            .end()
            .and_then(|end| usize::try_from(end).ok())
            .ok_or_else(out_of_bounds)?;
        bytes.get(start..end).ok_or_else(out_of_bounds)
    }
}

/// Retrieves resource bytes by locator.
pub trait Fetch: Send + Sync + 'static {
    /// Fetch `range` of `locator`, or the whole resource when `range` is `None`.
    fn fetch(
        &self,
        locator: &str,
        range: Option<ByteRange>,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Fetches resources over HTTP(S), using `Range` requests for byte ranges.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest` client (timeouts, headers, proxies).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, locator: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        let mut request = self.client.get(locator);
        if let Some(range) = range {
            request = request.header(reqwest::header::RANGE, range.header_value());
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(locator.to_string()));
        }
        let status = response.status();
        let bytes = response.error_for_status()?.bytes().await?;
        tracing::trace!(locator, ?range, len = bytes.len(), "fetched");

        match range {
            // Server ignored the range and sent the whole resource.
            Some(range) if status == StatusCode::OK && bytes.len() as u64 > range.length => {
                Ok(range.slice(locator, &bytes)?.to_vec())
            }
            _ => Ok(bytes.to_vec()),
        }
    }
}

/// In-memory key to blob map for local and offline datasets.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.insert(locator.into(), bytes.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn get(&self, locator: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        let blob = self
            .blobs
            .get(locator)
            .ok_or_else(|| Error::NotFound(locator.to_string()))?;
        match range {
            Some(range) => Ok(range.slice(locator, blob)?.to_vec()),
            None => Ok(blob.clone()),
        }
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (locator, bytes) in iter {
            store.insert(locator, bytes);
        }
        store
    }
}

impl Fetch for MemoryStore {
    async fn fetch(&self, locator: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        self.get(locator, range)
    }
}
