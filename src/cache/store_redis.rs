use crate::cache::{cache_key, CacheLookup, CacheWrite, PaymentCache};
use crate::domain::payment::Payment;
use anyhow::Result;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;

#[derive(Clone)]
pub struct RedisPaymentCache {
    pub client: redis::Client,
    ttl_seconds: u64,
    op_timeout: Duration,
}

impl RedisPaymentCache {
    pub fn new(redis_url: &str, ttl_seconds: u64, op_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            ttl_seconds,
            op_timeout,
        })
    }

    /// Runs one Redis round trip under the operation timeout. Connection
    /// failures, command errors and timeouts all collapse into `Err(reason)`.
    async fn bounded<T, F>(&self, op: F) -> std::result::Result<T, String>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {}ms", self.op_timeout.as_millis())),
        }
    }
}

#[async_trait::async_trait]
impl PaymentCache for RedisPaymentCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, transaction_id: &str) -> CacheLookup {
        let key = cache_key(transaction_id);
        let fetched = self
            .bounded(async {
                let mut conn = self.client.get_multiplexed_async_connection().await?;
                let payload: Option<String> = conn.get(&key).await?;
                Ok::<_, redis::RedisError>(payload)
            })
            .await;

        match fetched {
            Ok(Some(payload)) => match serde_json::from_str::<Payment>(&payload) {
                Ok(payment) => CacheLookup::Hit(payment),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "discarding unreadable cache entry");
                    CacheLookup::Miss
                }
            },
            Ok(None) => CacheLookup::Miss,
            Err(reason) => {
                tracing::warn!(%key, %reason, "redis get failed, continuing without cache");
                CacheLookup::Unavailable
            }
        }
    }

    async fn put(&self, transaction_id: &str, payment: &Payment) -> CacheWrite {
        let key = cache_key(transaction_id);
        let payload = match serde_json::to_string(payment) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%key, error = %e, "payment could not be serialized for cache");
                return CacheWrite::Skipped;
            }
        };

        let written = self
            .bounded(async {
                let mut conn = self.client.get_multiplexed_async_connection().await?;
                let _: () = conn.set_ex(&key, payload, self.ttl_seconds).await?;
                Ok::<_, redis::RedisError>(())
            })
            .await;

        match written {
            Ok(()) => CacheWrite::Stored,
            Err(reason) => {
                tracing::warn!(%key, %reason, "redis set failed, continuing without cache");
                CacheWrite::Unavailable
            }
        }
    }

    async fn put_if_absent(&self, transaction_id: &str, payment: &Payment) -> CacheWrite {
        let key = cache_key(transaction_id);
        let payload = match serde_json::to_string(payment) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%key, error = %e, "payment could not be serialized for cache");
                return CacheWrite::Skipped;
            }
        };

        // SET .. EX .. NX replies nil when the key already exists.
        let written = self
            .bounded(async {
                let mut conn = self.client.get_multiplexed_async_connection().await?;
                let reply: Option<String> = redis::cmd("SET")
                    .arg(&key)
                    .arg(payload)
                    .arg("EX")
                    .arg(self.ttl_seconds)
                    .arg("NX")
                    .query_async(&mut conn)
                    .await?;
                Ok::<_, redis::RedisError>(reply.is_some())
            })
            .await;

        match written {
            Ok(true) => CacheWrite::Stored,
            Ok(false) => CacheWrite::Skipped,
            Err(reason) => {
                tracing::warn!(%key, %reason, "redis fill failed, continuing without cache");
                CacheWrite::Unavailable
            }
        }
    }

    async fn ping(&self) -> bool {
        let pong = self
            .bounded(async {
                let mut conn = self.client.get_multiplexed_async_connection().await?;
                let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok::<_, redis::RedisError>(pong)
            })
            .await;

        match pong {
            Ok(_) => true,
            Err(reason) => {
                tracing::warn!(%reason, "redis ping failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentStatus;

    fn stub_payment() -> Payment {
        let now = chrono::Utc::now();
        Payment {
            id: 1,
            transaction_id: "TXN-1".to_string(),
            amount: rust_decimal::Decimal::ONE_HUNDRED,
            currency: "RUB".to_string(),
            status: PaymentStatus::Pending,
            payment_method: None,
            customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn unreachable_redis_degrades_to_unavailable() {
        // Port 1 on loopback refuses connections.
        let cache =
            RedisPaymentCache::new("redis://127.0.0.1:1/", 3600, Duration::from_millis(500)).unwrap();

        assert_eq!(cache.get("TXN-1").await, CacheLookup::Unavailable);
        assert!(!cache.ping().await);
        assert_eq!(cache.put_if_absent("TXN-1", &stub_payment()).await, CacheWrite::Unavailable);
    }

    #[test]
    fn malformed_url_is_rejected_up_front() {
        assert!(RedisPaymentCache::new("not a url", 3600, Duration::from_secs(1)).is_err());
    }
}
