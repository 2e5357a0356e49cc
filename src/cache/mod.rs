use crate::config::{CacheBackend, CacheConfig};
use crate::domain::payment::Payment;
use anyhow::Result;
use std::sync::Arc;

pub mod in_memory;
pub mod store_redis;

pub use in_memory::InMemoryPaymentCache;
pub use store_redis::RedisPaymentCache;

/// Outcome of a cache read. `Unavailable` is never an error for the caller:
/// it behaves exactly like `Miss`, but stays distinguishable for logging.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Payment),
    Miss,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Stored,
    Skipped,
    Unavailable,
}

/// Best-effort shadow of single-payment lookups keyed by transaction id.
///
/// Implementations swallow their own failures: nothing here can fail a
/// request. Entries expire after the TTL the cache was built with, and every
/// `put` restarts that TTL.
#[async_trait::async_trait]
pub trait PaymentCache: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn get(&self, transaction_id: &str) -> CacheLookup;

    async fn put(&self, transaction_id: &str, payment: &Payment) -> CacheWrite;

    /// Writes only when no entry exists. Read-path refills use this so a
    /// payload loaded before a concurrent resolution cannot overwrite the
    /// resolved one. Returns `Skipped` when an entry was already present.
    async fn put_if_absent(&self, transaction_id: &str, payment: &Payment) -> CacheWrite;

    async fn ping(&self) -> bool;
}

pub fn cache_key(transaction_id: &str) -> String {
    format!("payment:{}", transaction_id)
}

/// Cache used when caching is switched off.
#[derive(Clone, Copy, Default)]
pub struct NoopPaymentCache;

#[async_trait::async_trait]
impl PaymentCache for NoopPaymentCache {
    fn backend(&self) -> &'static str {
        "none"
    }

    async fn get(&self, _transaction_id: &str) -> CacheLookup {
        CacheLookup::Miss
    }

    async fn put(&self, _transaction_id: &str, _payment: &Payment) -> CacheWrite {
        CacheWrite::Skipped
    }

    async fn put_if_absent(&self, _transaction_id: &str, _payment: &Payment) -> CacheWrite {
        CacheWrite::Skipped
    }

    async fn ping(&self) -> bool {
        true
    }
}

pub fn from_config(cfg: &CacheConfig) -> Result<Arc<dyn PaymentCache>> {
    Ok(match cfg.backend {
        CacheBackend::Redis => Arc::new(RedisPaymentCache::new(
            &cfg.redis_url(),
            cfg.ttl_seconds,
            cfg.op_timeout,
        )?),
        CacheBackend::Memory => Arc::new(InMemoryPaymentCache::new(cfg.ttl_seconds)),
        CacheBackend::Disabled => Arc::new(NoopPaymentCache),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_by_transaction_id() {
        assert_eq!(cache_key("TXN-1-abc"), "payment:TXN-1-abc");
    }

    #[tokio::test]
    async fn noop_cache_always_misses() {
        let cache = NoopPaymentCache;
        assert_eq!(cache.get("TXN-1").await, CacheLookup::Miss);
        assert!(cache.ping().await);
    }
}
