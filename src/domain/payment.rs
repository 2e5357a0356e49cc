use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest amount that fits the `NUMERIC(12, 2)` column.
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// `pending` moves to exactly one terminal state; terminal states never move.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(PaymentError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub transaction_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row to insert; the store assigns `id`, `status` and the timestamps.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub customer_id: Option<String>,
}

/// Accepts JSON numbers and numeric strings; anything else reads as absent so
/// the caller reports `Invalid amount` instead of a body parse failure.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
        serde_json::Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Rounds to cents and enforces `0 < amount <= MAX_AMOUNT`.
pub fn validate_amount(amount: Option<Decimal>) -> Result<Decimal, PaymentError> {
    let amount = amount.ok_or(PaymentError::InvalidAmount)?.round_dp(2);
    if amount <= Decimal::ZERO || amount > MAX_AMOUNT {
        return Err(PaymentError::InvalidAmount);
    }
    Ok(amount)
}

pub fn normalize_currency(currency: Option<&str>, default: &str) -> Result<String, PaymentError> {
    let raw = match currency.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => default,
    };
    if raw.len() != 3 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PaymentError::InvalidCurrency);
    }
    Ok(raw.to_ascii_uppercase())
}

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct ListPaymentsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<PaymentStatus>,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            status: None,
        }
    }
}

impl TryFrom<ListPaymentsQuery> for ListFilter {
    type Error = PaymentError;

    fn try_from(query: ListPaymentsQuery) -> Result<Self, Self::Error> {
        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = query.offset.unwrap_or(0);
        if limit < 0 || offset < 0 {
            return Err(PaymentError::Validation(
                "Invalid query parameters".to_string(),
            ));
        }
        let status = match query.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(s.parse::<PaymentStatus>().map_err(|_| {
                PaymentError::Validation("Invalid query parameters".to_string())
            })?),
        };
        Ok(Self {
            limit: limit.min(MAX_LIST_LIMIT),
            offset,
            status,
        })
    }
}
