use crate::cache::{CacheLookup, PaymentCache};
use crate::domain::payment::{ListFilter, Payment};
use crate::error::{PaymentError, Result};
use crate::repo::PaymentStore;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLookup {
    pub payment: Payment,
    pub served_from_cache: bool,
}

/// Read path: cache first, store on miss.
///
/// A cache hit is returned as-is, without checking the store, so it can trail
/// an in-flight resolution by up to the cache TTL.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn PaymentStore>,
    cache: Arc<dyn PaymentCache>,
}

impl QueryService {
    pub fn new(store: Arc<dyn PaymentStore>, cache: Arc<dyn PaymentCache>) -> Self {
        Self { store, cache }
    }

    pub async fn get_payment(&self, transaction_id: &str) -> Result<PaymentLookup> {
        match self.cache.get(transaction_id).await {
            CacheLookup::Hit(payment) => {
                return Ok(PaymentLookup {
                    payment,
                    served_from_cache: true,
                })
            }
            CacheLookup::Miss | CacheLookup::Unavailable => {}
        }

        let payment = self
            .store
            .get_by_transaction_id(transaction_id)
            .await?
            .ok_or(PaymentError::NotFound)?;

        self.cache.put_if_absent(transaction_id, &payment).await;
        Ok(PaymentLookup {
            payment,
            served_from_cache: false,
        })
    }

    /// Always served by the store.
    pub async fn list_payments(&self, filter: &ListFilter) -> Result<Vec<Payment>> {
        self.store.list_payments(filter).await
    }
}
