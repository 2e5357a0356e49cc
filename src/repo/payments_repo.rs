use crate::domain::payment::{ListFilter, NewPayment, Payment, PaymentStatus};
use crate::error::{PaymentError, Result};
use crate::repo::PaymentStore;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Instant;

const PAYMENT_COLUMNS: &str = "id, transaction_id, amount, currency, status, payment_method, customer_id, created_at, updated_at";

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

impl PaymentsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_payment(r: &PgRow) -> std::result::Result<Payment, sqlx::Error> {
    let status: String = r.try_get("status")?;
    Ok(Payment {
        id: r.try_get("id")?,
        transaction_id: r.try_get("transaction_id")?,
        amount: r.try_get("amount")?,
        currency: r.try_get("currency")?,
        status: status
            .parse::<PaymentStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        payment_method: r.try_get("payment_method")?,
        customer_id: r.try_get("customer_id")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn log_query(op: &'static str, started: Instant, rows: usize) {
    tracing::debug!(
        op,
        rows,
        duration_ms = started.elapsed().as_millis() as u64,
        "executed query"
    );
}

#[async_trait::async_trait]
impl PaymentStore for PaymentsRepo {
    async fn create_payment(&self, new: &NewPayment) -> Result<Payment> {
        if new.amount <= rust_decimal::Decimal::ZERO {
            return Err(PaymentError::InvalidAmount);
        }

        let started = Instant::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments (transaction_id, amount, currency, status, payment_method, customer_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(&new.transaction_id)
        .bind(new.amount)
        .bind(&new.currency)
        .bind(PaymentStatus::Pending.as_str())
        .bind(new.payment_method.as_deref())
        .bind(new.customer_id.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PaymentError::Conflict(new.transaction_id.clone())
            }
            other => PaymentError::Store(other),
        })?;
        log_query("insert_payment", started, 1);

        Ok(map_payment(&row)?)
    }

    async fn update_status(&self, transaction_id: &str, status: PaymentStatus) -> Result<Payment> {
        if !PaymentStatus::Pending.can_transition_to(status) {
            return Err(PaymentError::InvalidTransition {
                from: PaymentStatus::Pending,
                to: status,
            });
        }

        let started = Instant::now();
        let updated = sqlx::query(&format!(
            r#"
            UPDATE payments
            SET status = $2, updated_at = now()
            WHERE transaction_id = $1 AND status = $3
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(transaction_id)
        .bind(status.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        log_query("update_status", started, usize::from(updated.is_some()));

        if let Some(row) = updated {
            return Ok(map_payment(&row)?);
        }

        // No pending row matched: either the id is unknown or the payment is
        // already terminal.
        match self.get_by_transaction_id(transaction_id).await? {
            None => Err(PaymentError::NotFound),
            Some(current) => Err(PaymentError::InvalidTransition {
                from: current.status,
                to: status,
            }),
        }
    }

    async fn get_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>> {
        let started = Instant::now();
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;
        log_query("get_payment", started, usize::from(row.is_some()));

        Ok(row.as_ref().map(map_payment).transpose()?)
    }

    async fn list_payments(&self, filter: &ListFilter) -> Result<Vec<Payment>> {
        let started = Instant::now();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;
        log_query("list_payments", started, rows.len());

        Ok(rows
            .iter()
            .map(map_payment)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn list_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<Payment>> {
        let started = Instant::now();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE status = $1 AND created_at <= $2 AND id > $3
            ORDER BY id ASC
            LIMIT $4
            "#
        ))
        .bind(PaymentStatus::Pending.as_str())
        .bind(cutoff)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        log_query("list_pending_before", started, rows.len());

        Ok(rows
            .iter()
            .map(map_payment)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
