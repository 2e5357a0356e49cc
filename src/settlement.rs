use crate::domain::payment::{Payment, PaymentStatus};
use rand::Rng;

/// Terminal outcome of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Completed,
    Failed,
}

impl From<SettlementOutcome> for PaymentStatus {
    fn from(outcome: SettlementOutcome) -> Self {
        match outcome {
            SettlementOutcome::Completed => PaymentStatus::Completed,
            SettlementOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

/// Decides how a pending payment resolves.
#[async_trait::async_trait]
pub trait SettlementDecider: Send + Sync {
    async fn decide(&self, payment: &Payment) -> SettlementOutcome;
}

/// Completes with a fixed probability, fails otherwise.
#[derive(Debug, Clone, Copy)]
pub struct RandomSettlement {
    success_probability: f64,
}

impl RandomSettlement {
    pub fn new(success_probability: f64) -> Self {
        let success_probability = if success_probability.is_finite() {
            success_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            success_probability,
        }
    }

    pub fn success_probability(&self) -> f64 {
        self.success_probability
    }
}

#[async_trait::async_trait]
impl SettlementDecider for RandomSettlement {
    async fn decide(&self, _payment: &Payment) -> SettlementOutcome {
        if rand::thread_rng().gen_bool(self.success_probability) {
            SettlementOutcome::Completed
        } else {
            SettlementOutcome::Failed
        }
    }
}

/// Always resolves to the same outcome.
#[derive(Debug, Clone, Copy)]
pub struct FixedSettlement(pub SettlementOutcome);

#[async_trait::async_trait]
impl SettlementDecider for FixedSettlement {
    async fn decide(&self, _payment: &Payment) -> SettlementOutcome {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pending() -> Payment {
        let now = Utc::now();
        Payment {
            id: 1,
            transaction_id: "TXN-1".to_string(),
            amount: dec!(10),
            currency: "RUB".to_string(),
            status: PaymentStatus::Pending,
            payment_method: None,
            customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn certain_outcomes_are_respected() {
        let p = pending();
        for _ in 0..50 {
            assert_eq!(RandomSettlement::new(1.0).decide(&p).await, SettlementOutcome::Completed);
            assert_eq!(RandomSettlement::new(0.0).decide(&p).await, SettlementOutcome::Failed);
        }
    }

    #[test]
    fn probability_is_clamped() {
        assert_eq!(RandomSettlement::new(1.7).success_probability(), 1.0);
        assert_eq!(RandomSettlement::new(-0.2).success_probability(), 0.0);
        assert_eq!(RandomSettlement::new(f64::NAN).success_probability(), 0.0);
        assert_eq!(RandomSettlement::new(0.9).success_probability(), 0.9);
    }

    #[test]
    fn outcomes_map_to_terminal_statuses() {
        assert!(PaymentStatus::from(SettlementOutcome::Completed).is_terminal());
        assert!(PaymentStatus::from(SettlementOutcome::Failed).is_terminal());
    }

    #[tokio::test]
    async fn fixed_settlement_repeats_its_outcome() {
        let decider = FixedSettlement(SettlementOutcome::Failed);
        assert_eq!(decider.decide(&pending()).await, SettlementOutcome::Failed);
    }
}
