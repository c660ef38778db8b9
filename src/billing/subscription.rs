//! Subscriptions and their lifecycle.
//!
//! A [`Subscription`] describes what is billed and on which calendar.
//! [`SubscriptionManager`] persists subscriptions and keeps their renewal date
//! and payment rows consistent with the schedule on every save.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::audit::{NoOpAuditLogger, ScheduleAuditEvent, ScheduleAuditLogger};
use super::calculation::{DashboardTotals, compute_dashboard_totals};
use super::category::CategoryId;
use super::cycle::BillingCycle;
use super::error::ScheduleError;
use super::renewal;
use super::schedule::ScheduleManager;
use super::storage::{PaymentStore, SubscriptionStore};
use super::validation::validate_subscription;

/// Identifier assigned by the subscription store.
pub type SubscriptionId = i64;

/// A recurring subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// `None` until the subscription has been saved.
    pub id: Option<SubscriptionId>,
    pub name: String,
    /// Cost per month in cents.
    pub monthly_cost_cents: Option<i64>,
    /// Cost per year in cents.
    pub yearly_cost_cents: Option<i64>,
    pub billing_cycle: BillingCycle,
    /// First day of the first billing period.
    pub start_date: NaiveDate,
    /// Next date the subscription renews on.
    pub renewal_date: Option<NaiveDate>,
    /// Number of monthly periods. Only used for monthly billing.
    pub duration_months: Option<u32>,
    /// Number of yearly periods. Only used for yearly billing.
    pub duration_years: Option<u32>,
    pub is_active: bool,
    pub auto_renewal: bool,
    /// Uncategorized when `None`.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl Subscription {
    /// Create an active, auto-renewing subscription with no costs or duration.
    #[must_use]
    pub fn new(name: impl Into<String>, billing_cycle: BillingCycle, start_date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            monthly_cost_cents: None,
            yearly_cost_cents: None,
            billing_cycle,
            start_date,
            renewal_date: None,
            duration_months: None,
            duration_years: None,
            is_active: true,
            auto_renewal: true,
            category_id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: SubscriptionId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_monthly_cost(mut self, cents: i64) -> Self {
        self.monthly_cost_cents = Some(cents);
        self
    }

    #[must_use]
    pub fn with_yearly_cost(mut self, cents: i64) -> Self {
        self.yearly_cost_cents = Some(cents);
        self
    }

    #[must_use]
    pub fn with_renewal_date(mut self, date: NaiveDate) -> Self {
        self.renewal_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_duration_months(mut self, months: u32) -> Self {
        self.duration_months = Some(months);
        self
    }

    #[must_use]
    pub fn with_duration_years(mut self, years: u32) -> Self {
        self.duration_years = Some(years);
        self
    }

    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn with_auto_renewal(mut self, auto_renewal: bool) -> Self {
        self.auto_renewal = auto_renewal;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// The persisted ID, or an error for a subscription that was never saved.
    pub fn require_id(&self) -> std::result::Result<SubscriptionId, ScheduleError> {
        self.id.ok_or(ScheduleError::UnsavedSubscription)
    }

    /// Cost of one period under the current billing cycle, 0 when unset.
    #[must_use]
    pub fn current_cost_cents(&self) -> i64 {
        match self.billing_cycle {
            BillingCycle::Monthly => self.monthly_cost_cents.unwrap_or(0),
            BillingCycle::Yearly => self.yearly_cost_cents.unwrap_or(0),
        }
    }

    /// Number of periods in the schedule.
    ///
    /// `None` when the duration matching the billing cycle is unset or zero,
    /// which makes the subscription open-ended.
    #[must_use]
    pub fn total_payments(&self) -> Option<u32> {
        let duration = match self.billing_cycle {
            BillingCycle::Monthly => self.duration_months,
            BillingCycle::Yearly => self.duration_years,
        };
        duration.filter(|n| *n > 0)
    }

    /// Whether the schedule has a fixed number of periods.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.total_payments().is_some()
    }

    /// Day after the last period ends, for bounded subscriptions.
    pub fn ending_date(&self) -> std::result::Result<Option<NaiveDate>, ScheduleError> {
        self.total_payments()
            .map(|n| self.billing_cycle.advance_by(self.start_date, n))
            .transpose()
    }

    /// Cost of the whole schedule, for bounded subscriptions.
    ///
    /// `None` when open-ended or when the product overflows.
    #[must_use]
    pub fn total_cost_cents(&self) -> Option<i64> {
        self.total_payments()
            .and_then(|n| self.current_cost_cents().checked_mul(i64::from(n)))
    }

    /// Periods whose start date has not been reached yet.
    ///
    /// Counts a period as passed once `today` reaches its day-of-month (or
    /// day-of-year) anniversary. `None` for open-ended subscriptions.
    pub fn remaining_payments(&self, today: NaiveDate) -> std::result::Result<Option<u32>, ScheduleError> {
        let (Some(total), Some(ending)) = (self.total_payments(), self.ending_date()?) else {
            return Ok(None);
        };
        if today >= ending {
            return Ok(Some(0));
        }

        let start = self.start_date;
        let passed = match self.billing_cycle {
            BillingCycle::Monthly => {
                let mut months = i64::from(today.year() - start.year()) * 12
                    + i64::from(today.month()) - i64::from(start.month());
                if today.day() >= start.day() {
                    months += 1;
                }
                months
            }
            BillingCycle::Yearly => {
                let mut years = i64::from(today.year() - start.year());
                if (today.month(), today.day()) >= (start.month(), start.day()) {
                    years += 1;
                }
                years
            }
        };

        let remaining = (i64::from(total) - passed).clamp(0, i64::from(total));
        Ok(Some(u32::try_from(remaining).unwrap_or(total)))
    }

    /// Whether a field that defines the period schedule differs from `previous`.
    #[must_use]
    pub fn schedule_changed(&self, previous: &Subscription) -> bool {
        self.start_date != previous.start_date
            || self.billing_cycle != previous.billing_cycle
            || self.duration_months != previous.duration_months
            || self.duration_years != previous.duration_years
    }

    /// Whether a field the renewal date is anchored on differs from `previous`.
    #[must_use]
    pub fn renewal_anchor_changed(&self, previous: &Subscription) -> bool {
        self.start_date != previous.start_date || self.billing_cycle != previous.billing_cycle
    }
}

/// Subscription persistence with schedule upkeep.
///
/// Saving a subscription initializes or recomputes its renewal date and
/// discards every payment row when the schedule itself changed.
pub struct SubscriptionManager<S: SubscriptionStore, P: PaymentStore, A: ScheduleAuditLogger = NoOpAuditLogger> {
    store: S,
    schedule: ScheduleManager<P, A>,
}

impl<S: SubscriptionStore, P: PaymentStore, A: ScheduleAuditLogger> SubscriptionManager<S, P, A> {
    /// Create a new subscription manager.
    #[must_use]
    pub fn new(store: S, schedule: ScheduleManager<P, A>) -> Self {
        Self { store, schedule }
    }

    /// The schedule manager used for payment rows.
    #[must_use]
    pub fn schedule(&self) -> &ScheduleManager<P, A> {
        &self.schedule
    }

    /// Validate and persist a subscription.
    ///
    /// On creation a missing renewal date becomes one cycle after the start.
    /// On update the renewal date is recomputed from the new start when the
    /// start date or billing cycle changed. Payment rows are reset on creation
    /// and whenever the start date, billing cycle or a duration changed.
    pub async fn save_subscription(&self, subscription: Subscription) -> Result<Subscription> {
        validate_subscription(&subscription)?;

        let previous = match subscription.id {
            Some(id) => self.store.get_subscription(id).await?,
            None => None,
        };

        let mut subscription = subscription;
        let renewal_reset = match &previous {
            None => subscription.renewal_date.is_none(),
            Some(prev) => {
                subscription.renewal_anchor_changed(prev) || subscription.renewal_date.is_none()
            }
        };
        if renewal_reset {
            subscription.renewal_date = Some(renewal::initial_renewal_date(&subscription)?);
        }

        let saved = self.store.save_subscription(&subscription).await?;
        let subscription_id = saved.require_id()?;

        if renewal_reset {
            if let Some(renewal_date) = saved.renewal_date {
                tracing::debug!(
                    subscription_id,
                    %renewal_date,
                    "renewal date set from start date"
                );
                self.schedule
                    .audit(ScheduleAuditEvent::RenewalDateReset {
                        subscription_id,
                        renewal_date,
                    })
                    .await;
            }
        }

        let schedule_reset = previous
            .as_ref()
            .is_none_or(|prev| saved.schedule_changed(prev));
        if schedule_reset {
            if let Err(err) = self.schedule.reset_payments_for_new_schedule(&saved).await {
                tracing::warn!(
                    subscription_id,
                    error = %err,
                    "subscription saved but payment reset failed; old rows remain"
                );
                return Err(err);
            }
        }

        self.schedule
            .audit(ScheduleAuditEvent::SubscriptionSaved {
                subscription_id,
                created: previous.is_none(),
                schedule_reset,
            })
            .await;

        Ok(saved)
    }

    /// Get a subscription by ID.
    pub async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription> {
        self.store
            .get_subscription(id)
            .await?
            .ok_or_else(|| ScheduleError::SubscriptionNotFound { subscription_id: id }.into())
    }

    /// Delete a subscription together with its payment rows.
    pub async fn delete_subscription(&self, id: SubscriptionId) -> Result<()> {
        let removed = self.schedule.payments().delete_all_payments(id).await?;
        self.store.delete_subscription(id).await?;
        tracing::info!(subscription_id = id, payments_removed = removed, "subscription deleted");
        Ok(())
    }

    /// All active subscriptions.
    pub async fn list_active(&self) -> Result<Vec<Subscription>> {
        let all = self.store.list_subscriptions().await?;
        Ok(all.into_iter().filter(|s| s.is_active).collect())
    }

    async fn active_where(&self, keep: impl Fn(&Subscription) -> bool) -> Result<Vec<Subscription>> {
        let active = self.list_active().await?;
        Ok(active.into_iter().filter(|s| keep(s)).collect())
    }

    /// Active subscriptions in a category. `None` selects uncategorized ones.
    pub async fn by_category(&self, category_id: Option<CategoryId>) -> Result<Vec<Subscription>> {
        self.active_where(|s| s.category_id == category_id).await
    }

    pub async fn monthly_billing(&self) -> Result<Vec<Subscription>> {
        self.active_where(|s| s.billing_cycle == BillingCycle::Monthly).await
    }

    pub async fn yearly_billing(&self) -> Result<Vec<Subscription>> {
        self.active_where(|s| s.billing_cycle == BillingCycle::Yearly).await
    }

    /// Active subscriptions with auto-renewal switched on (or off).
    pub async fn with_auto_renewal(&self, enabled: bool) -> Result<Vec<Subscription>> {
        self.active_where(|s| s.auto_renewal == enabled).await
    }

    /// Spend totals over the active subscriptions.
    pub async fn dashboard_totals(&self) -> Result<DashboardTotals> {
        let active = self.list_active().await?;
        Ok(compute_dashboard_totals(&active))
    }

    /// Active subscriptions renewing within `days` of `today`.
    pub async fn renewing_soon(&self, today: NaiveDate, days: i64) -> Result<Vec<Subscription>> {
        let active = self.list_active().await?;
        Ok(active
            .into_iter()
            .filter(|s| renewal::is_renewing_within(s, days, today))
            .collect())
    }

    /// Active subscriptions whose renewal date has already passed.
    pub async fn overdue(&self, today: NaiveDate) -> Result<Vec<Subscription>> {
        let active = self.list_active().await?;
        Ok(active
            .into_iter()
            .filter(|s| renewal::days_until_renewal(s, today).is_some_and(|d| d < 0))
            .collect())
    }
}
