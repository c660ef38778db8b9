//! Billing schedule engine.
//!
//! Derives the billing periods of a subscription, keeps the stored payment
//! rows consistent with them and reports payment status. Every method takes
//! `today` explicitly; nothing here reads the clock.
//!
//! Payment rows follow two rules:
//! - current and past-due periods get an unpaid placeholder row on demand,
//!   future periods stay virtual
//! - paid rows survive reconciliation and are only removed by a full reset

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ScheduleConfig;
use crate::error::Result;

use super::audit::{NoOpAuditLogger, ScheduleAuditEvent, ScheduleAuditLogger};
use super::error::ScheduleError;
use super::payment::Payment;
use super::period::{BillingPeriod, PeriodView, build_period_views, generate_intended_periods};
use super::renewal;
use super::status::{
    self, Alert, CurrentPeriodStatus, FinancialSummary, LifecycleSummary, PaymentStatus,
    PaymentSummary, SubscriptionHealth, SubscriptionReport,
};
use super::storage::{PaymentChangeSet, PaymentStore};
use super::subscription::{Subscription, SubscriptionId};

/// Rows changed by [`ScheduleManager::reconcile_payments`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Unpaid rows whose period is no longer part of the schedule.
    pub deleted_unpaid: usize,
    /// Placeholders created for current or past-due periods.
    pub created_placeholders: usize,
}

/// Rows removed by [`ScheduleManager::reset_payments_for_new_schedule`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOutcome {
    pub deleted: usize,
}

/// Billing schedule operations over a payment store.
pub struct ScheduleManager<P: PaymentStore, A: ScheduleAuditLogger = NoOpAuditLogger> {
    store: P,
    audit_logger: A,
    config: ScheduleConfig,
}

impl<P: PaymentStore> ScheduleManager<P> {
    /// Create a new schedule manager without audit logging.
    #[must_use]
    pub fn new(store: P) -> Self {
        Self {
            store,
            audit_logger: NoOpAuditLogger,
            config: ScheduleConfig::default(),
        }
    }
}

impl<P: PaymentStore, A: ScheduleAuditLogger> ScheduleManager<P, A> {
    /// Create a new schedule manager with audit logging.
    #[must_use]
    pub fn with_audit_logger(store: P, audit_logger: A) -> Self {
        Self {
            store,
            audit_logger,
            config: ScheduleConfig::default(),
        }
    }

    /// Replace the status thresholds.
    #[must_use]
    pub fn with_config(mut self, config: ScheduleConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying payment store.
    #[must_use]
    pub fn payments(&self) -> &P {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub(crate) async fn audit(&self, event: ScheduleAuditEvent) {
        self.audit_logger.log(event).await;
    }

    /// The ordered periods the subscription should have.
    pub fn intended_periods(&self, subscription: &Subscription) -> Result<Vec<BillingPeriod>> {
        Ok(generate_intended_periods(subscription)?)
    }

    /// Create unpaid placeholders for current and past-due periods that have no row.
    ///
    /// Returns the number of rows created. Safe to call repeatedly.
    pub async fn ensure_materialized(&self, subscription: &Subscription, today: NaiveDate) -> Result<usize> {
        let periods = self.intended_periods(subscription)?;
        if periods.is_empty() {
            return Ok(0);
        }
        let subscription_id = subscription.require_id()?;

        let existing = self.existing_starts(subscription_id).await?;
        let amount = subscription.current_cost_cents();

        let mut changes = PaymentChangeSet::new();
        for period in periods.iter().filter(|p| p.needs_row(today)) {
            if !existing.contains(&period.start) {
                tracing::debug!(
                    subscription_id,
                    start = %period.start,
                    end = %period.end,
                    past_due = period.is_past_due(today),
                    "creating placeholder"
                );
                changes.insert_if_absent(Payment::placeholder(subscription_id, *period, amount));
            }
        }

        if changes.is_empty() {
            return Ok(0);
        }

        let summary = self.store.apply_changes(subscription_id, &changes).await?;
        if summary.inserted > 0 {
            self.audit(ScheduleAuditEvent::PlaceholdersMaterialized {
                subscription_id,
                created: summary.inserted,
            })
            .await;
        }
        Ok(summary.inserted)
    }

    /// Every period of the schedule joined with its payment row.
    ///
    /// Creates placeholder rows for current and past-due periods first.
    pub async fn get_billing_periods(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> Result<Vec<PeriodView>> {
        let periods = self.intended_periods(subscription)?;
        if periods.is_empty() {
            tracing::debug!(subscription_id = ?subscription.id, "no billing periods for open-ended subscription");
            return Ok(Vec::new());
        }
        let subscription_id = subscription.require_id()?;

        self.ensure_materialized(subscription, today).await?;
        let payments = self.store.list_payments(subscription_id).await?;

        Ok(build_period_views(
            &periods,
            &payments,
            today,
            subscription.current_cost_cents(),
        ))
    }

    /// Delete every row and rebuild the views from scratch.
    pub async fn refresh_billing_periods(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> Result<Vec<PeriodView>> {
        self.reset_payments_for_new_schedule(subscription).await?;
        self.get_billing_periods(subscription, today).await
    }

    /// Bring stored rows in line with the schedule.
    ///
    /// Unpaid rows outside the schedule are deleted, paid rows are kept, and
    /// placeholders are created for current and past-due periods without a
    /// row. Both steps are applied as one atomic change set. A second call
    /// with the same `today` changes nothing.
    pub async fn reconcile_payments(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> Result<ReconcileOutcome> {
        let subscription_id = subscription.require_id()?;
        let intended = self.intended_periods(subscription)?;
        let intended_starts: BTreeSet<NaiveDate> = intended.iter().map(|p| p.start).collect();

        let existing = self.store.list_payments(subscription_id).await?;
        let existing_starts: BTreeSet<NaiveDate> =
            existing.iter().map(|p| p.billing_period_start).collect();

        let mut changes = PaymentChangeSet::new();
        for payment in existing
            .iter()
            .filter(|p| !p.is_paid && !intended_starts.contains(&p.billing_period_start))
        {
            changes.delete_unpaid(payment.billing_period_start);
        }

        let amount = subscription.current_cost_cents();
        for period in intended
            .iter()
            .filter(|p| p.needs_row(today) && !existing_starts.contains(&p.start))
        {
            changes.insert_if_absent(Payment::placeholder(subscription_id, *period, amount));
        }

        if changes.is_empty() {
            tracing::debug!(subscription_id, "payments already reconciled");
            return Ok(ReconcileOutcome::default());
        }

        let summary = self.store.apply_changes(subscription_id, &changes).await?;
        let outcome = ReconcileOutcome {
            deleted_unpaid: summary.deleted,
            created_placeholders: summary.inserted,
        };

        tracing::info!(
            subscription_id,
            deleted_unpaid = outcome.deleted_unpaid,
            created_placeholders = outcome.created_placeholders,
            "payments reconciled"
        );
        self.audit(ScheduleAuditEvent::PaymentsReconciled {
            subscription_id,
            deleted_unpaid: outcome.deleted_unpaid,
            created_placeholders: outcome.created_placeholders,
        })
        .await;

        Ok(outcome)
    }

    /// Delete every payment row of the subscription, paid or not.
    ///
    /// Used when the start date, billing cycle or duration changed. Placeholders
    /// come back lazily on the next read.
    pub async fn reset_payments_for_new_schedule(&self, subscription: &Subscription) -> Result<ResetOutcome> {
        let subscription_id = subscription.require_id()?;
        let deleted = self.store.delete_all_payments(subscription_id).await?;

        tracing::info!(subscription_id, deleted, "payments reset after schedule change");
        self.audit(ScheduleAuditEvent::PaymentsReset { subscription_id, deleted }).await;

        Ok(ResetOutcome { deleted })
    }

    /// Mark the period starting on `period_start` as paid.
    ///
    /// `payment_date` defaults to `today`. An existing row keeps its amount;
    /// a missing row is created with the current cost. The change is a single
    /// store call, so it cannot interleave with a reset or reconciliation.
    ///
    /// # Errors
    ///
    /// Rejects unsaved and inactive subscriptions.
    pub async fn mark_payment_paid(
        &self,
        subscription: &Subscription,
        period_start: NaiveDate,
        payment_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Payment> {
        let subscription_id = self.require_writable(subscription)?;
        self.warn_if_off_schedule(subscription, period_start)?;
        let payment_date = payment_date.unwrap_or(today);

        let period = self.period_from_start(subscription, period_start)?;
        let row = Payment::paid(subscription_id, period, subscription.current_cost_cents(), payment_date);
        let payment = self.apply_status(subscription_id, row).await?;

        tracing::info!(
            subscription_id,
            period_start = %period_start,
            amount_cents = payment.amount_cents,
            "payment marked as paid"
        );
        self.audit(ScheduleAuditEvent::PaymentMarkedPaid {
            subscription_id,
            period_start,
            payment_date,
            amount_cents: payment.amount_cents,
        })
        .await;

        Ok(payment)
    }

    /// Mark the period starting on `period_start` as unpaid.
    ///
    /// Clears the payment date, or creates an unpaid placeholder when no row exists.
    ///
    /// # Errors
    ///
    /// Rejects unsaved and inactive subscriptions.
    pub async fn mark_payment_unpaid(
        &self,
        subscription: &Subscription,
        period_start: NaiveDate,
    ) -> Result<Payment> {
        let subscription_id = self.require_writable(subscription)?;
        self.warn_if_off_schedule(subscription, period_start)?;

        let period = self.period_from_start(subscription, period_start)?;
        let row = Payment::placeholder(subscription_id, period, subscription.current_cost_cents());
        let payment = self.apply_status(subscription_id, row).await?;

        tracing::info!(subscription_id, period_start = %period_start, "payment marked as unpaid");
        self.audit(ScheduleAuditEvent::PaymentMarkedUnpaid {
            subscription_id,
            period_start,
        })
        .await;

        Ok(payment)
    }

    /// Paid rows that belong to the schedule.
    pub async fn paid_payments_count(&self, subscription: &Subscription) -> Result<usize> {
        let (intended, payments) = self.snapshot(subscription).await?;
        Ok(status::paid_payments_count(&intended, &payments))
    }

    /// Share of the schedule paid, rounded down. 0 for open-ended subscriptions.
    pub async fn payment_progress_percentage(&self, subscription: &Subscription) -> Result<u32> {
        let paid = self.paid_payments_count(subscription).await?;
        Ok(status::payment_progress_percentage(subscription.total_payments(), paid))
    }

    /// Status of the period ending at the renewal date.
    ///
    /// Reports [`CurrentPeriodStatus::Ended`] without changing `is_active`;
    /// deactivating ended subscriptions is left to the caller.
    pub async fn current_period_status(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> Result<CurrentPeriodStatus> {
        let payments = self.load_payments(subscription).await?;
        Ok(status::current_period_status(subscription, &payments, today)?)
    }

    /// Aggregate payment status across the schedule.
    pub async fn overall_payment_status(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> Result<PaymentStatus> {
        let (intended, payments) = self.snapshot(subscription).await?;
        Ok(status::overall_payment_status(subscription, &intended, &payments, today)?)
    }

    /// Whether an open-ended subscription is due for automatic renewal.
    pub async fn should_auto_renew(&self, subscription: &Subscription, today: NaiveDate) -> Result<bool> {
        if !subscription.auto_renewal || !subscription.is_active || subscription.is_bounded() {
            return Ok(false);
        }
        let current = self.current_period_status(subscription, today).await?;
        Ok(renewal::should_auto_renew(subscription, current))
    }

    /// Health score and indicators.
    pub async fn health(&self, subscription: &Subscription, today: NaiveDate) -> Result<SubscriptionHealth> {
        let payment_status = self.overall_payment_status(subscription, today).await?;
        Ok(status::assess_health(
            subscription,
            payment_status,
            today,
            self.config.renewal_lookahead_days,
        ))
    }

    /// User-facing alerts.
    pub async fn alerts(&self, subscription: &Subscription, today: NaiveDate) -> Result<Vec<Alert>> {
        let health = self.health(subscription, today).await?;
        Ok(status::subscription_alerts(subscription, &health))
    }

    pub async fn should_send_reminder(&self, subscription: &Subscription, today: NaiveDate) -> Result<bool> {
        let health = self.health(subscription, today).await?;
        Ok(status::should_send_reminder(&health))
    }

    /// Paid and unpaid counts over the schedule.
    pub async fn payment_summary(&self, subscription: &Subscription, today: NaiveDate) -> Result<PaymentSummary> {
        let (intended, payments) = self.snapshot(subscription).await?;
        let paid = status::paid_payments_count(&intended, &payments);
        let payment_status = status::overall_payment_status(subscription, &intended, &payments, today)?;
        Ok(PaymentSummary::new(subscription.total_payments(), paid, payment_status))
    }

    /// Health, alerts, cost figures and recommendations in one report.
    pub async fn report(&self, subscription: &Subscription, today: NaiveDate) -> Result<SubscriptionReport> {
        let (intended, payments) = self.snapshot(subscription).await?;
        let paid = status::paid_payments_count(&intended, &payments);
        let payment_status = status::overall_payment_status(subscription, &intended, &payments, today)?;

        let health = status::assess_health(
            subscription,
            payment_status,
            today,
            self.config.renewal_lookahead_days,
        );
        let alerts = status::subscription_alerts(subscription, &health);

        let remaining_payments = subscription.remaining_payments(today)?;
        let ending_date = subscription.ending_date()?;
        let days_until_end = ending_date.map(|end| (end - today).num_days());

        let recommendations =
            status::recommendations(&health, &alerts, remaining_payments, days_until_end);

        Ok(SubscriptionReport {
            financial: FinancialSummary {
                current_cost_cents: subscription.current_cost_cents(),
                total_cost_cents: subscription.total_cost_cents(),
                remaining_payments,
                progress_percentage: status::payment_progress_percentage(
                    subscription.total_payments(),
                    paid,
                ),
            },
            lifecycle: LifecycleSummary {
                ending_date,
                days_until_end,
                is_ending_soon: days_until_end.is_some_and(|d| d <= self.config.ending_soon_days),
                auto_renewal: subscription.auto_renewal,
            },
            health,
            alerts,
            recommendations,
        })
    }

    fn require_writable(&self, subscription: &Subscription) -> Result<SubscriptionId> {
        let subscription_id = subscription.require_id()?;
        if !subscription.is_active {
            tracing::warn!(subscription_id, "rejected payment change on inactive subscription");
            return Err(ScheduleError::SubscriptionInactive { subscription_id }.into());
        }
        Ok(subscription_id)
    }

    fn warn_if_off_schedule(&self, subscription: &Subscription, period_start: NaiveDate) -> Result<()> {
        let periods = self.intended_periods(subscription)?;
        if !periods.is_empty() && !periods.iter().any(|p| p.start == period_start) {
            tracing::warn!(
                subscription_id = ?subscription.id,
                period_start = %period_start,
                "period start is not part of the schedule"
            );
        }
        Ok(())
    }

    /// Write the paid state of `row` as one change set and return the stored row.
    async fn apply_status(&self, subscription_id: SubscriptionId, row: Payment) -> Result<Payment> {
        let period_start = row.billing_period_start;
        let mut changes = PaymentChangeSet::new();
        changes.set_status(row.clone());

        let summary = self.store.apply_changes(subscription_id, &changes).await?;
        if summary.inserted + summary.updated != 1 {
            tracing::error!(
                subscription_id,
                period_start = %period_start,
                ?summary,
                "store did not apply payment status change"
            );
            return Err(ScheduleError::Internal {
                message: format!(
                    "payment status change for {} on subscription {} was not applied",
                    period_start, subscription_id
                ),
            }
            .into());
        }

        // A concurrent reset may already have removed the row again.
        Ok(self
            .store
            .get_payment(subscription_id, period_start)
            .await?
            .unwrap_or(row))
    }

    fn period_from_start(&self, subscription: &Subscription, start: NaiveDate) -> Result<BillingPeriod> {
        let end = subscription.billing_cycle.period_end(start)?;
        Ok(BillingPeriod::new(start, end))
    }

    async fn existing_starts(&self, subscription_id: SubscriptionId) -> Result<BTreeSet<NaiveDate>> {
        let payments = self.store.list_payments(subscription_id).await?;
        Ok(payments.into_iter().map(|p| p.billing_period_start).collect())
    }

    async fn load_payments(&self, subscription: &Subscription) -> Result<Vec<Payment>> {
        let subscription_id = subscription.require_id()?;
        self.store.list_payments(subscription_id).await
    }

    async fn snapshot(&self, subscription: &Subscription) -> Result<(Vec<BillingPeriod>, Vec<Payment>)> {
        let intended = self.intended_periods(subscription)?;
        let payments = self.load_payments(subscription).await?;
        Ok((intended, payments))
    }
}
