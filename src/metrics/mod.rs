use crate::domain::payment::PaymentStatus;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const REQUEST_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0];
const AMOUNT_BUCKETS: &[f64] = &[100.0, 500.0, 1000.0, 5000.0, 10000.0, 50000.0];

/// Prometheus instruments for the HTTP surface and the payment lifecycle.
/// Clones share the same registry.
#[derive(Clone)]
pub struct PaymentMetrics {
    registry: Registry,
    http_request_duration: HistogramVec,
    http_requests_total: IntCounterVec,
    payment_transactions: IntCounterVec,
    payment_amount: Histogram,
}

impl PaymentMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            )
            .buckets(REQUEST_DURATION_BUCKETS.to_vec()),
            &["method", "route", "status_code"],
        )?;
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "route", "status_code"],
        )?;
        let payment_transactions = IntCounterVec::new(
            Opts::new(
                "payment_transactions_total",
                "Total number of payment transactions",
            ),
            &["status"],
        )?;
        let payment_amount = Histogram::with_opts(
            HistogramOpts::new("payment_amount", "Payment transaction amounts")
                .buckets(AMOUNT_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(payment_transactions.clone()))?;
        registry.register(Box::new(payment_amount.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            http_request_duration,
            http_requests_total,
            payment_transactions,
            payment_amount,
        })
    }

    pub fn record_http(&self, method: &str, route: &str, status_code: u16, elapsed_secs: f64) {
        let status = status_code.to_string();
        let labels = [method, route, status.as_str()];
        self.http_request_duration
            .with_label_values(&labels)
            .observe(elapsed_secs);
        self.http_requests_total.with_label_values(&labels).inc();
    }

    pub fn record_transaction(&self, status: PaymentStatus) {
        self.payment_transactions
            .with_label_values(&[status.as_str()])
            .inc();
    }

    pub fn observe_amount(&self, amount: Decimal) {
        if let Some(value) = amount.to_f64() {
            self.payment_amount.observe(value);
        }
    }

    pub fn transactions(&self, status: PaymentStatus) -> u64 {
        self.payment_transactions
            .with_label_values(&[status.as_str()])
            .get()
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn exposition_contains_every_instrument() {
        let metrics = PaymentMetrics::new().unwrap();
        metrics.record_http("POST", "/payments", 201, 0.02);
        metrics.record_transaction(PaymentStatus::Pending);
        metrics.observe_amount(dec!(1500));

        let text = metrics.render().unwrap();
        assert!(text.contains("http_request_duration_seconds_bucket"));
        assert!(text.contains(r#"http_requests_total{method="POST",route="/payments",status_code="201"} 1"#));
        assert!(text.contains(r#"payment_transactions_total{status="pending"} 1"#));
        assert!(text.contains("payment_amount_sum 1500"));
    }

    #[test]
    fn registries_are_independent_per_instance() {
        let a = PaymentMetrics::new().unwrap();
        let b = PaymentMetrics::new().unwrap();
        a.record_transaction(PaymentStatus::Completed);

        assert_eq!(a.transactions(PaymentStatus::Completed), 1);
        assert_eq!(b.transactions(PaymentStatus::Completed), 0);
    }
}
