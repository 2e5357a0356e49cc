pub mod cache;
pub mod config;
pub mod domain {
    pub mod payment;
}
pub mod error;
pub mod http {
    pub mod error;
    pub mod handlers {
        pub mod health;
        pub mod metrics;
        pub mod payments;
    }
    pub mod middleware {
        pub mod request_metrics;
    }
    pub mod router;
}
pub mod metrics;
pub mod repo;
pub mod service {
    pub mod lifecycle;
    pub mod query;
}
pub mod settlement;
pub mod telemetry;

use cache::PaymentCache;
use metrics::PaymentMetrics;
use repo::PaymentStore;
use service::lifecycle::{LifecycleEngine, LifecycleSettings};
use service::query::QueryService;
use settlement::SettlementDecider;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: LifecycleEngine,
    pub query: QueryService,
    pub store: Arc<dyn PaymentStore>,
    pub cache: Arc<dyn PaymentCache>,
    pub metrics: PaymentMetrics,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        cache: Arc<dyn PaymentCache>,
        settlement: Arc<dyn SettlementDecider>,
        metrics: PaymentMetrics,
        settings: LifecycleSettings,
    ) -> Self {
        let lifecycle = LifecycleEngine::new(
            store.clone(),
            cache.clone(),
            settlement,
            metrics.clone(),
            settings,
        );
        let query = QueryService::new(store.clone(), cache.clone());
        Self {
            lifecycle,
            query,
            store,
            cache,
            metrics,
            started_at: Instant::now(),
        }
    }
}
