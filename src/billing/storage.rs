//! Storage traits for schedule data.
//!
//! Implement these traits to persist subscriptions and payment rows to your
//! database. In-memory implementations live in [`super::memory`].

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::payment::Payment;
use super::subscription::{Subscription, SubscriptionId};

/// Trait for storing payment rows.
///
/// Rows are unique per `(subscription_id, billing_period_start)`.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// All rows of a subscription, ordered by period start.
    async fn list_payments(&self, subscription_id: SubscriptionId) -> Result<Vec<Payment>>;

    /// The row for one period, if it exists.
    async fn get_payment(
        &self,
        subscription_id: SubscriptionId,
        period_start: NaiveDate,
    ) -> Result<Option<Payment>>;

    /// Apply a batch of changes to one subscription's rows atomically.
    ///
    /// Either every change is applied or none is. Implementations must
    /// serialize concurrent change sets for the same subscription.
    async fn apply_changes(
        &self,
        subscription_id: SubscriptionId,
        changes: &PaymentChangeSet,
    ) -> Result<ChangeSummary>;

    /// Delete every row of a subscription, paid or not. Returns the number deleted.
    async fn delete_all_payments(&self, subscription_id: SubscriptionId) -> Result<usize>;
}

/// Trait for storing subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>>;

    /// Insert or update a subscription.
    ///
    /// Subscriptions without an ID are assigned one. Returns the stored value.
    async fn save_subscription(&self, subscription: &Subscription) -> Result<Subscription>;

    async fn delete_subscription(&self, id: SubscriptionId) -> Result<()>;

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>>;
}

/// A single conditional change to a payment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentChange {
    /// Delete the row for `period_start` only if it is still unpaid.
    DeleteUnpaid { period_start: NaiveDate },
    /// Insert the row unless one already exists for its period.
    InsertIfAbsent(Payment),
    /// Copy `is_paid` and `payment_date` onto the existing row, or insert
    /// the row when its period has none. Amount, end and notes of an
    /// existing row are left alone.
    SetStatus(Payment),
}

/// An ordered batch of changes for one subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentChangeSet {
    changes: Vec<PaymentChange>,
}

impl PaymentChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: PaymentChange) {
        self.changes.push(change);
    }

    pub fn delete_unpaid(&mut self, period_start: NaiveDate) {
        self.push(PaymentChange::DeleteUnpaid { period_start });
    }

    pub fn insert_if_absent(&mut self, payment: Payment) {
        self.push(PaymentChange::InsertIfAbsent(payment));
    }

    pub fn set_status(&mut self, payment: Payment) {
        self.push(PaymentChange::SetStatus(payment));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaymentChange> {
        self.changes.iter()
    }
}

/// Rows actually touched by [`PaymentStore::apply_changes`].
///
/// Conditional changes whose condition did not hold are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub deleted: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl ChangeSummary {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.deleted == 0 && self.inserted == 0 && self.updated == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::period::BillingPeriod;

    #[test]
    fn test_change_set_order() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        let payment = Payment::placeholder(1, BillingPeriod::new(start, end), 500);

        let mut changes = PaymentChangeSet::new();
        assert!(changes.is_empty());
        changes.delete_unpaid(start);
        changes.insert_if_absent(payment.clone());

        assert_eq!(changes.len(), 2);
        let kinds: Vec<_> = changes.iter().cloned().collect();
        assert_eq!(kinds[0], PaymentChange::DeleteUnpaid { period_start: start });
        assert_eq!(kinds[1], PaymentChange::InsertIfAbsent(payment));
    }

    #[test]
    fn test_change_serde_tag() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let json = serde_json::to_value(PaymentChange::DeleteUnpaid { period_start: start }).unwrap();
        assert_eq!(json["kind"], "delete_unpaid");
        assert_eq!(json["period_start"], "2024-01-15");
    }

    #[test]
    fn test_set_status_serde_tag() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        let payment = Payment::paid(1, BillingPeriod::new(start, end), 500, start);

        let json = serde_json::to_value(PaymentChange::SetStatus(payment)).unwrap();
        assert_eq!(json["kind"], "set_status");
        assert_eq!(json["is_paid"], true);
    }

    #[test]
    fn test_summary_noop() {
        assert!(ChangeSummary::default().is_noop());
        let summary = ChangeSummary { inserted: 1, ..Default::default() };
        assert!(!summary.is_noop());
    }
}
