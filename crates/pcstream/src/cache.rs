//! Caching of manifests and hierarchy pages.
//!
//! Tiles are never cached; only the small metadata resources the client
//! fetches repeatedly when a dataset is reopened or re-resolved.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::fetch::ByteRange;

/// Storage for fetched metadata bytes.
pub trait Cache: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn insert(&self, key: &str, bytes: &[u8]);
}

/// Cache key for a locator and optional range.
#[must_use]
pub fn cache_key(locator: &str, range: Option<ByteRange>) -> String {
    match range {
        Some(range) => format!("{locator}#{}+{}", range.offset, range.length),
        None => locator.to_string(),
    }
}

/// Disables caching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn insert(&self, _key: &str, _bytes: &[u8]) {}
}

/// Unbounded in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn insert(&self, key: &str, bytes: &[u8]) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes.to_vec());
    }
}
