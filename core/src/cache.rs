//! Memoization of successful responses.
//!
//! Entries are keyed by [`RequestIdentity`] and hold the raw body of a
//! response that classified as a success. There is no eviction and no TTL:
//! an entry lives as long as the cache, and the cache lives as long as the
//! client that owns it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;

use crate::query::QueryParams;

/// Canonical key of an endpoint and its parameters.
///
/// Built from the resolved endpoint URL and the query parameters sorted by
/// key, so the insertion order of parameters never affects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity(String);

impl RequestIdentity {
    pub fn new(endpoint: &str, params: &QueryParams) -> Self {
        Self(format!("{endpoint}{}", params.canonical()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instance-owned store of successful response bodies.
///
/// Safe to share between threads. Writes are last-writer-wins; identical
/// requests produce identical bodies so the order of racing writers does not
/// matter.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<RequestIdentity, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &RequestIdentity) -> Option<Bytes> {
        match self.entries.get(identity) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store the body of a successful response. Callers never pass failures.
    pub fn put(&self, identity: RequestIdentity, body: Bytes) {
        self.entries.insert(identity, body);
    }

    pub fn contains(&self, identity: &RequestIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
