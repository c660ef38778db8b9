//! Billing period generation and classification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ScheduleError;
use super::payment::Payment;
use super::subscription::Subscription;

/// An inclusive date range covered by one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    /// Last day of the period, inclusive.
    pub end: NaiveDate,
}

impl BillingPeriod {
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether `date` falls within the period, both ends included.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether `today` falls within the period.
    #[must_use]
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.contains(today)
    }

    /// Whether the period ended before `today`.
    #[must_use]
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.end < today
    }

    /// Current and past-due periods get a stored payment row; future ones stay virtual.
    #[must_use]
    pub fn needs_row(&self, today: NaiveDate) -> bool {
        self.is_current(today) || self.is_past_due(today)
    }
}

/// Generate the ordered, contiguous billing periods of a subscription.
///
/// Each period starts one cycle after the previous start and ends the day
/// before the next one. Open-ended subscriptions have no periods.
pub fn generate_intended_periods(subscription: &Subscription) -> Result<Vec<BillingPeriod>, ScheduleError> {
    let Some(total) = subscription.total_payments() else {
        return Ok(Vec::new());
    };

    let cycle = subscription.billing_cycle;
    let mut periods = Vec::new();
    let mut start = subscription.start_date;
    for _ in 0..total {
        let end = cycle.period_end(start)?;
        periods.push(BillingPeriod::new(start, end));
        start = cycle.advance(start)?;
    }

    Ok(periods)
}

/// A billing period as presented to the user, joined with its payment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodView {
    /// 1-based position in the schedule.
    pub period_number: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub amount_cents: i64,
    pub is_paid: bool,
    pub is_current: bool,
    pub is_past_due: bool,
    pub payment: Option<Payment>,
}

/// Join periods with payment rows by period start.
///
/// Periods without a row show as unpaid.
#[must_use]
pub fn build_period_views(
    periods: &[BillingPeriod],
    payments: &[Payment],
    today: NaiveDate,
    amount_cents: i64,
) -> Vec<PeriodView> {
    periods
        .iter()
        .zip(1u32..)
        .map(|(period, period_number)| {
            let payment = payments
                .iter()
                .find(|p| p.billing_period_start == period.start)
                .cloned();
            PeriodView {
                period_number,
                start: period.start,
                end: period.end,
                amount_cents,
                is_paid: payment.as_ref().is_some_and(|p| p.is_paid),
                is_current: period.is_current(today),
                is_past_due: period.is_past_due(today),
                payment,
            }
        })
        .collect()
}
