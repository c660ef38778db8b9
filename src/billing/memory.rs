//! In-memory store implementations.
//!
//! Suitable for development, testing and single-process use. Data is lost
//! when the last clone of a store is dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::error::Result;

use super::payment::Payment;
use super::storage::{ChangeSummary, PaymentChange, PaymentChangeSet, PaymentStore, SubscriptionStore};
use super::subscription::{Subscription, SubscriptionId};

type PaymentKey = (SubscriptionId, NaiveDate);

/// In-memory payment store.
///
/// Wraps data in Arc for cheap cloning. A change set holds the write lock
/// for its whole duration, so change sets never interleave.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<BTreeMap<PaymentKey, Payment>>>,
}

impl InMemoryPaymentStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all subscriptions.
    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn list_payments(&self, subscription_id: SubscriptionId) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments
            .range((subscription_id, NaiveDate::MIN)..=(subscription_id, NaiveDate::MAX))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn get_payment(
        &self,
        subscription_id: SubscriptionId,
        period_start: NaiveDate,
    ) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .get(&(subscription_id, period_start))
            .cloned())
    }

    async fn apply_changes(
        &self,
        subscription_id: SubscriptionId,
        changes: &PaymentChangeSet,
    ) -> Result<ChangeSummary> {
        let mut payments = self.payments.write().await;
        let mut summary = ChangeSummary::default();

        for change in changes.iter() {
            match change {
                PaymentChange::DeleteUnpaid { period_start } => {
                    let key = (subscription_id, *period_start);
                    if payments.get(&key).is_some_and(|p| !p.is_paid) {
                        payments.remove(&key);
                        summary.deleted += 1;
                    }
                }
                PaymentChange::InsertIfAbsent(payment) => {
                    let key = (subscription_id, payment.billing_period_start);
                    if !payments.contains_key(&key) {
                        payments.insert(key, Payment { subscription_id, ..payment.clone() });
                        summary.inserted += 1;
                    }
                }
                PaymentChange::SetStatus(payment) => {
                    let key = (subscription_id, payment.billing_period_start);
                    match payments.get_mut(&key) {
                        Some(existing) => {
                            existing.is_paid = payment.is_paid;
                            existing.payment_date = payment.payment_date;
                            summary.updated += 1;
                        }
                        None => {
                            payments.insert(key, Payment { subscription_id, ..payment.clone() });
                            summary.inserted += 1;
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn delete_all_payments(&self, subscription_id: SubscriptionId) -> Result<usize> {
        let mut payments = self.payments.write().await;
        let before = payments.len();
        payments.retain(|(id, _), _| *id != subscription_id);
        Ok(before - payments.len())
    }
}

/// In-memory subscription store with sequential IDs starting at 1.
#[derive(Debug, Clone)]
pub struct InMemorySubscriptionStore {
    subscriptions: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemorySubscriptionStore {
    fn default() -> Self {
        Self {
            subscriptions: Arc::default(),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl InMemorySubscriptionStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.read().await.get(&id).cloned())
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        let mut subscriptions = self.subscriptions.write().await;
        let id = match subscription.id {
            Some(id) => {
                // Keep the counter ahead of IDs assigned elsewhere.
                self.next_id.fetch_max(id + 1, Ordering::Relaxed);
                id
            }
            None => self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let stored = Subscription {
            id: Some(id),
            ..subscription.clone()
        };
        subscriptions.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_subscription(&self, id: SubscriptionId) -> Result<()> {
        self.subscriptions.write().await.remove(&id);
        Ok(())
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        let mut all: Vec<Subscription> = subscriptions.values().cloned().collect();
        all.sort_by_key(|s| s.id);
        Ok(all)
    }
}
