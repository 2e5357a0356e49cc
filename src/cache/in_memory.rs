use crate::cache::{cache_key, CacheLookup, CacheWrite, PaymentCache};
use crate::domain::payment::Payment;
use moka::future::Cache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const MAX_ENTRIES: u64 = 100_000;

/// In-process payment cache for single-node runs and tests.
#[derive(Clone)]
pub struct InMemoryPaymentCache {
    inner: Cache<String, Payment>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPaymentCache {
    pub fn new(ttl_seconds: u64) -> Self {
        let inner = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(MAX_ENTRIES)
            .build();
        Self {
            inner,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// While unavailable every read reports `Unavailable` and every write is
    /// dropped, mirroring an unreachable Redis.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn is_down(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PaymentCache for InMemoryPaymentCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, transaction_id: &str) -> CacheLookup {
        if self.is_down() {
            tracing::warn!(key = %cache_key(transaction_id), "cache get failed, continuing without cache");
            return CacheLookup::Unavailable;
        }
        match self.inner.get(&cache_key(transaction_id)).await {
            Some(payment) => CacheLookup::Hit(payment),
            None => CacheLookup::Miss,
        }
    }

    async fn put(&self, transaction_id: &str, payment: &Payment) -> CacheWrite {
        if self.is_down() {
            tracing::warn!(key = %cache_key(transaction_id), "cache set failed, continuing without cache");
            return CacheWrite::Unavailable;
        }
        self.inner
            .insert(cache_key(transaction_id), payment.clone())
            .await;
        CacheWrite::Stored
    }

    async fn put_if_absent(&self, transaction_id: &str, payment: &Payment) -> CacheWrite {
        if self.is_down() {
            tracing::warn!(key = %cache_key(transaction_id), "cache fill failed, continuing without cache");
            return CacheWrite::Unavailable;
        }
        let entry = self
            .inner
            .entry(cache_key(transaction_id))
            .or_insert(payment.clone())
            .await;
        if entry.is_fresh() {
            CacheWrite::Stored
        } else {
            CacheWrite::Skipped
        }
    }

    async fn ping(&self) -> bool {
        !self.is_down()
    }
}
