//! Cache types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Type-erased cached value
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// Hash request parameters
///
/// `serde_json` keeps object keys sorted, so equal parameter objects hash
/// equally regardless of construction order.
pub fn hash_params(params: &serde_json::Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    params.to_string().hash(&mut hasher);
    hasher.finish()
}

/// Identity of one remote query result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Resource kind, e.g. `s3.bucket_region`
    pub kind: String,
    pub region: String,
    /// Identity of the credential provider used for the query
    pub credential_id: String,
    pub params_hash: u64,
}

impl CacheKey {
    pub fn new(
        kind: impl Into<String>,
        region: impl Into<String>,
        credential_id: impl Into<String>,
        params: &serde_json::Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            region: region.into(),
            credential_id: credential_id.into(),
            params_hash: hash_params(params),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}[{}]#{:016x}",
            self.kind, self.region, self.credential_id, self.params_hash
        )
    }
}

/// Stored value plus bookkeeping
pub struct CacheEntry {
    pub(crate) value: AnyValue,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    hits: AtomicU64,
}

impl CacheEntry {
    /// A TTL reaching past the representable calendar never expires
    pub(crate) fn new(value: AnyValue, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            expires_at: chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl)),
            hits: AtomicU64::new(0),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("hits", &self.hit_count())
            .finish_non_exhaustive()
    }
}

/// Counters describing cache behaviour since creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    /// Lookups that joined a load already in flight
    pub inflight_joins: u64,
    /// Entries removed by expiry or invalidation
    pub evictions: u64,
    pub entries: usize,
    pub loading: usize,
}

impl CacheStatistics {
    /// Share of lookups answered without starting a load
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.inflight_joins;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_equality_is_structural() {
        let a = CacheKey::new("s3.bucket_region", "us-east-1", "profile:dev", &json!({"bucket": "x", "n": 1}));
        let b = CacheKey::new("s3.bucket_region", "us-east-1", "profile:dev", &json!({"n": 1, "bucket": "x"}));
        let c = CacheKey::new("s3.bucket_region", "us-west-2", "profile:dev", &json!({"bucket": "x", "n": 1}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(
            hash_params(&json!({"bucket": "x"})),
            hash_params(&json!({"bucket": "y"}))
        );
    }

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new(Arc::new(1u32), Duration::from_secs(60));
        assert!(!entry.is_expired());
        assert!(entry.is_expired_at(Utc::now() + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_entry_with_unrepresentable_ttl_never_expires() {
        let entry = CacheEntry::new(Arc::new(1u32), Duration::from_secs(400_000 * 365 * 86_400));
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired());

        let entry = CacheEntry::new(Arc::new(1u32), Duration::MAX);
        assert!(entry.expires_at().is_none());
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStatistics {
            hits: 2,
            misses: 1,
            inflight_joins: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStatistics::default().hit_rate(), 0.0);
    }
}
