use crate::domain::payment::{ListFilter, NewPayment, Payment, PaymentStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};

pub mod in_memory;
pub mod payments_repo;

/// Durable record of payments. The store is the authority for payment state;
/// every operation may fail with [`crate::error::PaymentError::Store`].
#[async_trait::async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a `pending` payment. Fails with `Conflict` when the transaction
    /// id is already taken.
    async fn create_payment(&self, new: &NewPayment) -> Result<Payment>;

    /// Moves a `pending` payment to `status` and refreshes `updated_at`.
    async fn update_status(&self, transaction_id: &str, status: PaymentStatus) -> Result<Payment>;

    async fn get_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>>;

    /// Newest first, exact status match when filtered.
    async fn list_payments(&self, filter: &ListFilter) -> Result<Vec<Payment>>;

    /// Pending payments created at or before `cutoff` with `id > after_id`,
    /// ordered by id.
    async fn list_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<Payment>>;

    async fn ping(&self) -> Result<()>;
}
