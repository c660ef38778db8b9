//! Payment rows.
//!
//! One row exists per materialized billing period of a subscription. Unpaid
//! rows are placeholders the schedule may discard; paid rows are history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::period::BillingPeriod;
use super::subscription::SubscriptionId;

/// A payment record for one billing period.
///
/// Keyed by `(subscription_id, billing_period_start)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub subscription_id: SubscriptionId,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    /// Period cost in cents, captured when the row was created.
    pub amount_cents: i64,
    pub is_paid: bool,
    /// Set only while the row is paid.
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl Payment {
    /// Create an unpaid placeholder for a period.
    #[must_use]
    pub fn placeholder(subscription_id: SubscriptionId, period: BillingPeriod, amount_cents: i64) -> Self {
        Self {
            subscription_id,
            billing_period_start: period.start,
            billing_period_end: period.end,
            amount_cents,
            is_paid: false,
            payment_date: None,
            notes: String::new(),
        }
    }

    /// Create a row for a period that was paid on `payment_date`.
    #[must_use]
    pub fn paid(
        subscription_id: SubscriptionId,
        period: BillingPeriod,
        amount_cents: i64,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            is_paid: true,
            payment_date: Some(payment_date),
            ..Self::placeholder(subscription_id, period, amount_cents)
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// The period this row covers.
    #[must_use]
    pub fn period(&self) -> BillingPeriod {
        BillingPeriod::new(self.billing_period_start, self.billing_period_end)
    }

    pub fn mark_paid(&mut self, payment_date: NaiveDate) {
        self.is_paid = true;
        self.payment_date = Some(payment_date);
    }

    pub fn mark_unpaid(&mut self) {
        self.is_paid = false;
        self.payment_date = None;
    }

    /// Unpaid and the period ended before `today`.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_paid && self.billing_period_end < today
    }

    /// Days since the period ended, 0 unless overdue.
    #[must_use]
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.billing_period_end).num_days()
        } else {
            0
        }
    }
}
