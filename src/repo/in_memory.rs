use crate::domain::payment::{ListFilter, NewPayment, Payment, PaymentStatus};
use crate::error::{PaymentError, Result};
use crate::repo::PaymentStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: HashMap<String, Payment>,
}

/// Process-local payment store with the same contract as the Postgres one.
///
/// Used by the test suite and for running the service without a database.
/// [`InMemoryPaymentStore::set_available`] simulates an outage: every call
/// then fails with a pool timeout, as a saturated Postgres pool would.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    table: Arc<RwLock<Table>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PaymentError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create_payment(&self, new: &NewPayment) -> Result<Payment> {
        self.check_available()?;
        if new.amount <= rust_decimal::Decimal::ZERO {
            return Err(PaymentError::InvalidAmount);
        }

        let mut table = self.table.write().await;
        if table.rows.contains_key(&new.transaction_id) {
            return Err(PaymentError::Conflict(new.transaction_id.clone()));
        }

        table.next_id += 1;
        let now = Utc::now();
        let payment = Payment {
            id: table.next_id,
            transaction_id: new.transaction_id.clone(),
            amount: new.amount,
            currency: new.currency.clone(),
            status: PaymentStatus::Pending,
            payment_method: new.payment_method.clone(),
            customer_id: new.customer_id.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(payment.transaction_id.clone(), payment.clone());
        Ok(payment)
    }

    async fn update_status(&self, transaction_id: &str, status: PaymentStatus) -> Result<Payment> {
        self.check_available()?;

        let mut table = self.table.write().await;
        let payment = table
            .rows
            .get_mut(transaction_id)
            .ok_or(PaymentError::NotFound)?;
        if !payment.status.can_transition_to(status) {
            return Err(PaymentError::InvalidTransition {
                from: payment.status,
                to: status,
            });
        }

        payment.status = status;
        payment.updated_at = Utc::now().max(payment.created_at);
        Ok(payment.clone())
    }

    async fn get_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>> {
        self.check_available()?;
        Ok(self.table.read().await.rows.get(transaction_id).cloned())
    }

    async fn list_payments(&self, filter: &ListFilter) -> Result<Vec<Payment>> {
        self.check_available()?;

        let table = self.table.read().await;
        let mut matching: Vec<Payment> = table
            .rows
            .values()
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn list_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<Payment>> {
        self.check_available()?;

        let table = self.table.read().await;
        let mut pending: Vec<Payment> = table
            .rows
            .values()
            .filter(|p| p.status == PaymentStatus::Pending && p.created_at <= cutoff && p.id > after_id)
            .cloned()
            .collect();
        pending.sort_by_key(|p| p.id);
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}
