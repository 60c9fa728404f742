//! In-memory cache of computed prospect lists.
//!
//! Entries are keyed by [`QuerySignature`] and considered fresh for [`PROSPECT_CACHE_TTL_HOURS`].
//! Staleness is checked when an entry is read; stale entries stay in the map until they are
//! overwritten or [`ProspectCache::purge_expired`] runs.

use crate::models::{BusinessRecord, ProspectQuery};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// How long, in hours, a computed result list is served from the cache.
pub const PROSPECT_CACHE_TTL_HOURS: i64 = 24;

pub fn prospect_cache_ttl() -> Duration {
    Duration::hours(PROSPECT_CACHE_TTL_HOURS)
}

const DELIMITER: char = '-';

/// Canonical cache key of a prospecting request.
///
/// Renders as `niche-city-state-flag-flag`. Omitted flags render as `undefined`, so an omitted
/// flag never shares a key with an explicit `false`. Delimiters inside the text components are
/// backslash-escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    pub fn new(query: &ProspectQuery) -> Self {
        let key = [
            escape(&query.niche),
            escape(&query.city),
            escape(&query.state),
            flag(query.no_website_only).to_string(),
            flag(query.low_rating_only).to_string(),
        ]
        .join(&DELIMITER.to_string());

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        if c == '\\' || c == DELIMITER {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "undefined",
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    created_at: DateTime<Utc>,
    results: Vec<BusinessRecord>,
}

/// Shared prospect cache. Cloning yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct ProspectCache {
    entries: Arc<DashMap<QuerySignature, CacheEntry>>,
}

impl ProspectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached list for `signature` if it is younger than the TTL.
    pub fn get(&self, signature: &QuerySignature) -> Option<Vec<BusinessRecord>> {
        self.get_at(signature, Utc::now())
    }

    /// [`get`](Self::get) evaluated at an explicit instant.
    pub fn get_at(
        &self,
        signature: &QuerySignature,
        now: DateTime<Utc>,
    ) -> Option<Vec<BusinessRecord>> {
        let entry = self.entries.get(signature)?;
        if now - entry.created_at < prospect_cache_ttl() {
            Some(entry.results.clone())
        } else {
            None
        }
    }

    /// Stores `results` under `signature`, replacing any previous entry.
    pub fn put(&self, signature: QuerySignature, results: Vec<BusinessRecord>) {
        self.put_at(signature, results, Utc::now());
    }

    /// [`put`](Self::put) timestamped at an explicit instant.
    pub fn put_at(
        &self,
        signature: QuerySignature,
        results: Vec<BusinessRecord>,
        created_at: DateTime<Utc>,
    ) {
        self.entries.insert(
            signature,
            CacheEntry {
                created_at,
                results,
            },
        );
    }

    /// Number of entries held, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, signature: &QuerySignature) -> bool {
        self.entries.contains_key(signature)
    }

    /// Drops every entry older than the TTL and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = prospect_cache_ttl();
        self.entries.retain(|_, entry| now - entry.created_at < ttl);
        before.saturating_sub(self.entries.len())
    }
}
