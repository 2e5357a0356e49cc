use crate::cache::PaymentCache;
use crate::domain::payment::{
    normalize_currency, validate_amount, CreatePaymentRequest, NewPayment, Payment, PaymentStatus,
};
use crate::error::{PaymentError, Result};
use crate::metrics::PaymentMetrics;
use crate::repo::PaymentStore;
use crate::settlement::SettlementDecider;
use chrono::Utc;
use rand::distributions::{Distribution, Uniform};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Inserts attempted with a fresh transaction id before a collision is
/// surfaced to the caller.
const MAX_ID_ATTEMPTS: usize = 3;
const RECOVERY_BATCH: i64 = 500;
const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

pub type TransactionIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// `TXN-<unix millis>-<9 random base36 chars>`.
pub fn generate_transaction_id() -> String {
    let mut rng = rand::thread_rng();
    let pick = Uniform::from(0..ID_SUFFIX_ALPHABET.len());
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[pick.sample(&mut rng)] as char)
        .collect();
    format!("TXN-{}-{}", Utc::now().timestamp_millis(), suffix)
}

#[derive(Clone)]
pub struct LifecycleSettings {
    pub resolution_delay: Duration,
    pub default_currency: String,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            resolution_delay: Duration::from_millis(2000),
            default_currency: "RUB".to_string(),
        }
    }
}

/// A freshly created payment plus the task that will resolve it.
pub struct CreatedPayment {
    pub payment: Payment,
    pub resolution: JoinHandle<()>,
}

/// Drives a payment from `pending` to a terminal state.
///
/// Creation returns as soon as the row is stored; resolution runs later on its
/// own task, so no request waits on settlement and resolutions never wait on
/// each other.
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn PaymentStore>,
    cache: Arc<dyn PaymentCache>,
    settlement: Arc<dyn SettlementDecider>,
    metrics: PaymentMetrics,
    settings: LifecycleSettings,
    id_generator: TransactionIdGenerator,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        cache: Arc<dyn PaymentCache>,
        settlement: Arc<dyn SettlementDecider>,
        metrics: PaymentMetrics,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settlement,
            metrics,
            settings,
            id_generator: Arc::new(generate_transaction_id),
        }
    }

    pub fn with_id_generator(mut self, id_generator: TransactionIdGenerator) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub async fn create(&self, req: CreatePaymentRequest) -> Result<CreatedPayment> {
        let amount = validate_amount(req.amount)?;
        let currency = normalize_currency(req.currency.as_deref(), &self.settings.default_currency)?;

        let mut new = NewPayment {
            transaction_id: String::new(),
            amount,
            currency,
            payment_method: req.payment_method,
            customer_id: req.customer_id,
        };
        let payment = self.insert_with_fresh_id(&mut new).await?;

        self.cache.put(&payment.transaction_id, &payment).await;
        self.metrics.record_transaction(PaymentStatus::Pending);
        self.metrics.observe_amount(payment.amount);
        tracing::info!(
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            currency = %payment.currency,
            "payment created"
        );

        let resolution = self.schedule_resolution(payment.clone(), self.settings.resolution_delay);
        Ok(CreatedPayment {
            payment,
            resolution,
        })
    }

    async fn insert_with_fresh_id(&self, new: &mut NewPayment) -> Result<Payment> {
        let mut attempt = 1;
        loop {
            new.transaction_id = (self.id_generator)();
            match self.store.create_payment(new).await {
                Err(PaymentError::Conflict(id)) if attempt < MAX_ID_ATTEMPTS => {
                    tracing::warn!(transaction_id = %id, attempt, "transaction id collision, regenerating");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Spawns the one-shot resolution task for `payment` after `delay`.
    /// Aborting the returned handle cancels the resolution.
    pub fn schedule_resolution(&self, payment: Payment, delay: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match engine.resolve(&payment).await {
                Ok(_) => {}
                Err(PaymentError::InvalidTransition { from, .. }) => {
                    tracing::info!(
                        transaction_id = %payment.transaction_id,
                        status = %from,
                        "payment already resolved, skipping"
                    );
                }
                Err(err) => {
                    // Not retried; the startup recovery scan picks it up again.
                    tracing::error!(
                        transaction_id = %payment.transaction_id,
                        error = %err,
                        "payment resolution failed, payment stays pending"
                    );
                }
            }
        })
    }

    pub async fn resolve(&self, payment: &Payment) -> Result<Payment> {
        let status = PaymentStatus::from(self.settlement.decide(payment).await);
        let updated = self
            .store
            .update_status(&payment.transaction_id, status)
            .await?;

        self.cache.put(&updated.transaction_id, &updated).await;
        self.metrics.record_transaction(updated.status);
        tracing::info!(
            transaction_id = %updated.transaction_id,
            status = %updated.status,
            "payment status updated"
        );
        Ok(updated)
    }

    /// Reschedules every payment left `pending` by a previous process. Each is
    /// resolved at `created_at + resolution_delay`, or right away if that has
    /// passed. Returns how many resolutions were scheduled.
    pub async fn recover_pending(&self) -> Result<usize> {
        let cutoff = Utc::now();
        let delay = chrono::Duration::milliseconds(self.settings.resolution_delay.as_millis() as i64);
        let mut after_id = 0;
        let mut scheduled = 0;

        loop {
            let batch = self
                .store
                .list_pending_before(cutoff, after_id, RECOVERY_BATCH)
                .await?;
            let batch_len = batch.len();

            for payment in batch {
                after_id = payment.id;
                let wait = (payment.created_at + delay - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                self.schedule_resolution(payment, wait);
                scheduled += 1;
            }

            if (batch_len as i64) < RECOVERY_BATCH {
                break;
            }
        }

        if scheduled > 0 {
            tracing::info!(scheduled, "rescheduled stranded pending payments");
        }
        Ok(scheduled)
    }
}
