use crate::domain::payment::PaymentStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("Invalid currency")]
    InvalidCurrency,
    #[error("{0}")]
    Validation(String),
    #[error("Payment not found")]
    NotFound,
    #[error("transaction id {0} already exists")]
    Conflict(String),
    #[error("cannot move payment from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("store unavailable: {0}")]
    Store(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;

impl PaymentError {
    /// Client errors are caused by the request itself and are never retried.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PaymentError::Store(_))
    }
}
