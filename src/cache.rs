//! Response caching
//!
//! Two layers sit in front of the gateway:
//!
//! - [`TtlCache`] is shared across render batches and keeps successful
//!   responses of every remote call for a fixed time (five minutes by default).
//! - [`BatchCache`] lives for one render batch and never expires. It holds the
//!   decoded summary reports and client lookups so that several tags on the
//!   same page issue one remote call between them.
//!
//! Only status 200 responses are stored in either layer, so a failed call is
//! retried on the next lookup.

use crate::error::Result;
use crate::gateway::ApiResponse;
use crate::listings::ClientDirectory;
use crate::options::ResolvedParams;
use crate::report::SummaryReport;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// Fingerprint of a remote call: SHA-256 over the operation and the params
/// serialized with sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str, params: &ResolvedParams) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical_json(params).as_bytes());
        Self(hex(&hasher.finalize()))
    }

    /// Key over the params alone, without an operation discriminator.
    pub fn params_only(params: &ResolvedParams) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical_json(params).as_bytes());
        Self(hex(&hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_json(params: &ResolvedParams) -> String {
    // BTreeMap keys serialize in sorted order
    serde_json::to_string(params).unwrap_or_default()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone)]
struct CachedResponse {
    response: ApiResponse,
    stored_at: DateTime<Utc>,
}

/// Inserts between two sweeps of expired entries.
const PURGE_INTERVAL: usize = 64;

/// Expiring store for successful remote responses.
///
/// Expired entries are dropped when looked up, and swept from the whole map
/// every [`PURGE_INTERVAL`] inserts.
#[derive(Debug)]
pub struct TtlCache {
    entries: DashMap<CacheKey, CachedResponse>,
    ttl: Duration,
    inserts: AtomicUsize,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECONDS)
    }
}

impl TtlCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_seconds.min(u32::MAX as u64) as i64),
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Fresh entry for `key`. An expired entry is evicted.
    pub fn get(&self, key: &CacheKey) -> Option<ApiResponse> {
        let now = Utc::now();
        let (fresh, response) = {
            let entry = self.entries.get(key)?;
            (now - entry.stored_at < self.ttl, entry.response.clone())
        };
        if fresh {
            return Some(response);
        }
        self.entries.remove(key);
        debug!(key = %key, "Cache entry expired");
        None
    }

    /// Store a response. Returns false and stores nothing unless status is 200.
    pub fn insert(&self, key: CacheKey, response: ApiResponse) -> bool {
        if !response.is_success() {
            return false;
        }
        self.entries.insert(
            key,
            CachedResponse {
                response,
                stored_at: Utc::now(),
            },
        );
        if (self.inserts.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_INTERVAL == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = self.entries.len(), "Swept expired cache entries");
            }
        }
        true
    }

    /// Cached response for `(operation, params)`, or the result of `fetch`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        operation: &str,
        params: &ResolvedParams,
        fetch: F,
    ) -> Result<ApiResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let key = CacheKey::new(operation, params);
        if let Some(response) = self.get(&key) {
            debug!(operation, key = %key, "Cache hit");
            return Ok(response);
        }

        debug!(operation, key = %key, "Cache miss");
        let response = fetch().await?;
        if !self.insert(key, response.clone()) {
            debug!(operation, status = response.status, "Not caching unsuccessful response");
        }
        Ok(response)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.stored_at < self.ttl);
        before - self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Non-expiring dictionaries scoped to one render batch.
#[derive(Debug)]
pub struct BatchCache {
    id: Uuid,
    reports: DashMap<CacheKey, Arc<SummaryReport>>,
    clients: DashMap<CacheKey, Arc<ClientDirectory>>,
}

impl Default for BatchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchCache {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            reports: DashMap::new(),
            clients: DashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn report(&self, params: &ResolvedParams) -> Option<Arc<SummaryReport>> {
        let key = CacheKey::params_only(params);
        self.reports.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn store_report(&self, params: &ResolvedParams, report: Arc<SummaryReport>) {
        self.reports.insert(CacheKey::params_only(params), report);
    }

    pub fn clients(&self, workspace_id: &str, params: &ResolvedParams) -> Option<Arc<ClientDirectory>> {
        let key = CacheKey::new(workspace_id, params);
        self.clients.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn store_clients(
        &self,
        workspace_id: &str,
        params: &ResolvedParams,
        clients: Arc<ClientDirectory>,
    ) {
        self.clients.insert(CacheKey::new(workspace_id, params), clients);
    }

    pub fn report_count(&self) -> usize {
        self.reports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn params(pairs: &[(&str, &str)]) -> ResolvedParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = params(&[("a", "1"), ("b", "2")]);
        let b = params(&[("b", "2"), ("a", "1")]);
        assert_eq!(CacheKey::new("summary", &a), CacheKey::new("summary", &b));
        assert_ne!(CacheKey::new("summary", &a), CacheKey::new("users", &a));
        assert_ne!(CacheKey::params_only(&a), CacheKey::new("summary", &a));
        assert_eq!(CacheKey::new("x", &a).as_str().len(), 64);
    }

    #[tokio::test]
    async fn test_get_or_fetch_calls_once() {
        let cache = TtlCache::default();
        let calls = AtomicUsize::new(0);
        let p = params(&[("workspace_id", "1")]);
        for _ in 0..2 {
            let response = cache
                .get_or_fetch("summary", &p, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ApiResponse::new(200, json!({"groups": []})))
                })
                .await
                .unwrap();
            assert_eq!(response.status, 200);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = TtlCache::default();
        let calls = AtomicUsize::new(0);
        let p = params(&[("workspace_id", "1")]);
        for _ in 0..2 {
            let response = cache
                .get_or_fetch("summary", &p, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ApiResponse::new(429, json!(null)))
                })
                .await
                .unwrap();
            assert_eq!(response.status, 429);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = TtlCache::new(0);
        let key = CacheKey::new("users", &ResolvedParams::new());
        assert!(cache.insert(key.clone(), ApiResponse::new(200, json!([]))));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = TtlCache::new(0);
        cache.insert(CacheKey::new("a", &ResolvedParams::new()), ApiResponse::new(200, json!(1)));
        cache.insert(CacheKey::new("b", &ResolvedParams::new()), ApiResponse::new(200, json!(2)));
        assert_eq!(cache.purge_expired(), 2);
    }

    #[test]
    fn test_inserts_sweep_expired_entries_of_other_keys() {
        let expired = TtlCache::new(0);
        let fresh = TtlCache::default();
        for i in 0..1000 {
            let key = CacheKey::new("users", &params(&[("page", &i.to_string())]));
            expired.insert(key.clone(), ApiResponse::new(200, json!([])));
            fresh.insert(key, ApiResponse::new(200, json!([])));
        }
        assert!(expired.len() < PURGE_INTERVAL, "kept {}", expired.len());
        assert_eq!(fresh.len(), 1000);
    }

    #[test]
    fn test_batch_cache_reports_keyed_by_params() {
        let batch = BatchCache::new();
        let p = params(&[("workspace_id", "1")]);
        assert!(batch.report(&p).is_none());
        batch.store_report(&p, Arc::new(SummaryReport::default()));
        assert!(batch.report(&p).is_some());
        assert!(batch.report(&params(&[("workspace_id", "2")])).is_none());
    }
}
