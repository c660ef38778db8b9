//! Payment status and subscription health.
//!
//! Everything here is a pure function of a subscription, its payment rows
//! and an explicit `today`. [`super::schedule::ScheduleManager`] loads the
//! rows and calls into this module.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ScheduleError;
use super::payment::Payment;
use super::period::BillingPeriod;
use super::renewal;
use super::subscription::Subscription;

/// Status of the period the renewal date points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentPeriodStatus {
    Paid,
    Unpaid,
    /// The schedule ended on or before today.
    Ended,
}

impl CurrentPeriodStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for CurrentPeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate payment status across the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No period paid yet, or an open-ended subscription whose current period is unpaid.
    Unpaid,
    /// Open-ended subscription whose current period is paid.
    Paid,
    /// Some but not all periods paid.
    Progressing,
    /// Every period paid.
    Completed,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Progressing => "progressing",
            Self::Completed => "completed",
        }
    }

    /// Whether this status counts against subscription health.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        matches!(self, Self::Unpaid | Self::Progressing)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of the period that ends at the renewal date.
///
/// Before the renewal date is reached the current period counts as paid.
/// Once it is reached, the period one cycle before the renewal date must
/// have a paid row.
pub fn current_period_status(
    subscription: &Subscription,
    payments: &[Payment],
    today: NaiveDate,
) -> Result<CurrentPeriodStatus, ScheduleError> {
    if let Some(ending) = subscription.ending_date()? {
        if ending <= today {
            return Ok(CurrentPeriodStatus::Ended);
        }
    }

    let renewal = renewal::effective_renewal_date(subscription)?;
    if renewal > today {
        return Ok(CurrentPeriodStatus::Paid);
    }

    let period_start = subscription.billing_cycle.retreat(renewal)?;
    let paid = payments
        .iter()
        .any(|p| p.billing_period_start == period_start && p.is_paid);

    Ok(if paid {
        CurrentPeriodStatus::Paid
    } else {
        CurrentPeriodStatus::Unpaid
    })
}

/// Paid rows whose period start belongs to the schedule.
#[must_use]
pub fn paid_payments_count(intended: &[BillingPeriod], payments: &[Payment]) -> usize {
    payments
        .iter()
        .filter(|p| p.is_paid && intended.iter().any(|i| i.start == p.billing_period_start))
        .count()
}

/// Share of the schedule paid, rounded down. 0 for open-ended subscriptions.
#[must_use]
pub fn payment_progress_percentage(total_payments: Option<u32>, paid_count: usize) -> u32 {
    match total_payments {
        Some(total) if total > 0 => {
            let paid = u64::try_from(paid_count).unwrap_or(u64::MAX);
            let percent = paid.saturating_mul(100) / u64::from(total);
            u32::try_from(percent.min(100)).unwrap_or(100)
        }
        _ => 0,
    }
}

/// Aggregate status across the schedule.
pub fn overall_payment_status(
    subscription: &Subscription,
    intended: &[BillingPeriod],
    payments: &[Payment],
    today: NaiveDate,
) -> Result<PaymentStatus, ScheduleError> {
    let Some(total) = subscription.total_payments() else {
        let current = current_period_status(subscription, payments, today)?;
        return Ok(if current == CurrentPeriodStatus::Paid {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        });
    };

    let paid = paid_payments_count(intended, payments);
    Ok(if paid == 0 {
        PaymentStatus::Unpaid
    } else if paid >= total as usize {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Progressing
    })
}

/// Coarse health rating derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthLevel {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::Excellent,
            70..=89 => Self::Good,
            50..=69 => Self::Fair,
            30..=49 => Self::Poor,
            _ => Self::Critical,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Critical => "critical",
        }
    }
}

/// Health indicators for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionHealth {
    pub is_active: bool,
    /// The renewal date has passed.
    pub is_overdue: bool,
    pub is_renewing_soon: bool,
    pub has_payment_issues: bool,
    pub payment_status: PaymentStatus,
    pub days_until_renewal: Option<i64>,
    /// 0 to 100.
    pub score: u8,
    pub level: HealthLevel,
}

const INACTIVE_PENALTY: i32 = 50;
const OVERDUE_PENALTY: i32 = 30;
const PAYMENT_ISSUES_PENALTY: i32 = 20;
const RENEWING_SOON_PENALTY: i32 = 10;

/// Score a subscription by deducting fixed penalties from 100.
#[must_use]
pub fn assess_health(
    subscription: &Subscription,
    payment_status: PaymentStatus,
    today: NaiveDate,
    renewal_lookahead_days: i64,
) -> SubscriptionHealth {
    let days_until_renewal = renewal::days_until_renewal(subscription, today);
    let is_overdue = days_until_renewal.is_some_and(|d| d < 0);
    let is_renewing_soon =
        renewal::is_renewing_within(subscription, renewal_lookahead_days, today);
    let has_payment_issues = payment_status.has_issues();

    let mut score = 100;
    if !subscription.is_active {
        score -= INACTIVE_PENALTY;
    }
    if is_overdue {
        score -= OVERDUE_PENALTY;
    }
    if has_payment_issues {
        score -= PAYMENT_ISSUES_PENALTY;
    }
    if is_renewing_soon {
        score -= RENEWING_SOON_PENALTY;
    }
    let score = u8::try_from(score.clamp(0, 100)).unwrap_or(0);

    SubscriptionHealth {
        is_active: subscription.is_active,
        is_overdue,
        is_renewing_soon,
        has_payment_issues,
        payment_status,
        days_until_renewal,
        score,
        level: HealthLevel::from_score(score),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Error,
    Warning,
    Info,
}

/// A user-facing notice about a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Alerts for a subscription, most severe first.
#[must_use]
pub fn subscription_alerts(subscription: &Subscription, health: &SubscriptionHealth) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if !subscription.is_active {
        alerts.push(Alert::new(AlertKind::Error, "Subscription is inactive"));
    }
    if let Some(days) = health.days_until_renewal {
        if health.is_overdue {
            alerts.push(Alert::new(
                AlertKind::Error,
                format!("Payment is {} days overdue", days.abs()),
            ));
        }
        if health.is_renewing_soon {
            alerts.push(Alert::new(AlertKind::Warning, format!("Renews in {} days", days)));
        }
    }
    if health.has_payment_issues {
        alerts.push(Alert::new(
            AlertKind::Warning,
            format!("Payment status: {}", health.payment_status),
        ));
    }
    if !subscription.auto_renewal {
        alerts.push(Alert::new(AlertKind::Info, "Auto-renewal is disabled"));
    }

    alerts
}

/// Renewing soon, overdue or in critical health.
#[must_use]
pub fn should_send_reminder(health: &SubscriptionHealth) -> bool {
    health.is_renewing_soon || health.is_overdue || health.level == HealthLevel::Critical
}

/// Counts over the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    /// 0 for open-ended subscriptions.
    pub total_payments: u32,
    pub paid_count: usize,
    pub unpaid_count: usize,
    pub progress_percentage: u32,
    pub status: PaymentStatus,
}

impl PaymentSummary {
    #[must_use]
    pub fn new(total_payments: Option<u32>, paid_count: usize, status: PaymentStatus) -> Self {
        let total = total_payments.unwrap_or(0);
        Self {
            total_payments: total,
            paid_count,
            unpaid_count: (total as usize).saturating_sub(paid_count),
            progress_percentage: payment_progress_percentage(total_payments, paid_count),
            status,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

/// Cost figures for a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub current_cost_cents: i64,
    pub total_cost_cents: Option<i64>,
    pub remaining_payments: Option<u32>,
    pub progress_percentage: u32,
}

/// Schedule end figures for a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSummary {
    pub ending_date: Option<NaiveDate>,
    pub days_until_end: Option<i64>,
    pub is_ending_soon: bool,
    pub auto_renewal: bool,
}

/// Everything known about a subscription's standing, with suggested actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionReport {
    pub health: SubscriptionHealth,
    pub alerts: Vec<Alert>,
    pub financial: FinancialSummary,
    pub lifecycle: LifecycleSummary,
    pub recommendations: Vec<String>,
}

/// Suggested actions for a subscription.
#[must_use]
pub fn recommendations(
    health: &SubscriptionHealth,
    alerts: &[Alert],
    remaining_payments: Option<u32>,
    days_until_end: Option<i64>,
) -> Vec<String> {
    let mut out = Vec::new();

    if health.is_overdue {
        out.push("Pay overdue amount immediately to avoid service interruption".to_string());
    }
    if health.is_renewing_soon {
        out.push("Prepare payment for upcoming renewal".to_string());
    }
    if health.level == HealthLevel::Critical {
        out.push(
            "Review subscription status and consider cancellation if no longer needed".to_string(),
        );
    }
    if remaining_payments == Some(0) && days_until_end.is_some_and(|d| d <= 7) {
        out.push("Subscription ending soon - consider renewal or cancellation".to_string());
    }
    if alerts.len() > 3 {
        out.push("Multiple issues detected - review subscription settings".to_string());
    }
    if health.score >= 90 {
        out.push("Subscription is in excellent health - no action needed".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::cycle::BillingCycle;
    use crate::billing::period::generate_intended_periods;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_ended() -> Subscription {
        Subscription::new("Music", BillingCycle::Monthly, date(2024, 1, 15))
            .with_monthly_cost(999)
            .with_id(1)
            .with_renewal_date(date(2024, 2, 15))
    }

    fn paid_row(start: NaiveDate) -> Payment {
        let end = BillingCycle::Monthly.period_end(start).unwrap();
        Payment::paid(1, BillingPeriod::new(start, end), 999, start)
    }

    #[test]
    fn test_current_status_before_renewal() {
        let status = current_period_status(&open_ended(), &[], date(2024, 2, 1)).unwrap();
        assert_eq!(status, CurrentPeriodStatus::Paid);
    }

    #[test]
    fn test_current_status_at_renewal() {
        let sub = open_ended();
        let today = date(2024, 2, 15);
        assert_eq!(current_period_status(&sub, &[], today).unwrap(), CurrentPeriodStatus::Unpaid);

        let rows = vec![paid_row(date(2024, 1, 15))];
        assert_eq!(current_period_status(&sub, &rows, today).unwrap(), CurrentPeriodStatus::Paid);
    }

    #[test]
    fn test_current_status_ended() {
        let sub = open_ended().with_duration_months(1);
        let status = current_period_status(&sub, &[], date(2024, 2, 15)).unwrap();
        assert_eq!(status, CurrentPeriodStatus::Ended);
    }

    #[test]
    fn test_current_status_without_renewal_date() {
        let mut sub = open_ended();
        sub.renewal_date = None;
        // Falls back to start + 1 cycle.
        let status = current_period_status(&sub, &[], date(2024, 2, 20)).unwrap();
        assert_eq!(status, CurrentPeriodStatus::Unpaid);
    }

    #[test]
    fn test_overall_status_bounded() {
        let sub = open_ended().with_duration_months(4);
        let intended = generate_intended_periods(&sub).unwrap();
        let today = date(2024, 6, 1);

        let rows: Vec<Payment> = intended.iter().map(|p| paid_row(p.start)).collect();

        assert_eq!(
            overall_payment_status(&sub, &intended, &[], today).unwrap(),
            PaymentStatus::Unpaid
        );
        assert_eq!(
            overall_payment_status(&sub, &intended, &rows[..2], today).unwrap(),
            PaymentStatus::Progressing
        );
        assert_eq!(
            overall_payment_status(&sub, &intended, &rows, today).unwrap(),
            PaymentStatus::Completed
        );
    }

    #[test]
    fn test_paid_rows_outside_schedule_ignored() {
        let sub = open_ended().with_duration_months(2);
        let intended = generate_intended_periods(&sub).unwrap();
        let rows = vec![paid_row(date(2023, 12, 1)), paid_row(date(2024, 1, 15))];

        assert_eq!(paid_payments_count(&intended, &rows), 1);
        assert_eq!(payment_progress_percentage(Some(2), 1), 50);
    }

    #[test]
    fn test_overall_status_open_ended() {
        let sub = open_ended();
        let today = date(2024, 2, 20);
        assert_eq!(
            overall_payment_status(&sub, &[], &[], today).unwrap(),
            PaymentStatus::Unpaid
        );
        let rows = vec![paid_row(date(2024, 1, 15))];
        assert_eq!(
            overall_payment_status(&sub, &[], &rows, today).unwrap(),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_progress_rounds_down() {
        assert_eq!(payment_progress_percentage(Some(3), 1), 33);
        assert_eq!(payment_progress_percentage(Some(3), 2), 66);
        assert_eq!(payment_progress_percentage(None, 5), 0);
    }

    #[test]
    fn test_health_levels() {
        assert_eq!(HealthLevel::from_score(100), HealthLevel::Excellent);
        assert_eq!(HealthLevel::from_score(90), HealthLevel::Excellent);
        assert_eq!(HealthLevel::from_score(89), HealthLevel::Good);
        assert_eq!(HealthLevel::from_score(50), HealthLevel::Fair);
        assert_eq!(HealthLevel::from_score(30), HealthLevel::Poor);
        assert_eq!(HealthLevel::from_score(29), HealthLevel::Critical);
    }

    #[test]
    fn test_health_deductions() {
        let sub = open_ended();

        let healthy = assess_health(&sub, PaymentStatus::Paid, date(2024, 2, 1), 7);
        assert_eq!(healthy.score, 100);
        assert_eq!(healthy.level, HealthLevel::Excellent);

        // Renewing in 5 days with an unpaid status.
        let soon = assess_health(&sub, PaymentStatus::Unpaid, date(2024, 2, 10), 7);
        assert!(soon.is_renewing_soon);
        assert_eq!(soon.score, 70);
        assert_eq!(soon.level, HealthLevel::Good);

        // Overdue and unpaid.
        let overdue = assess_health(&sub, PaymentStatus::Unpaid, date(2024, 2, 20), 7);
        assert!(overdue.is_overdue);
        assert_eq!(overdue.score, 50);

        // Inactive subscriptions have no renewal countdown.
        let inactive = sub.clone().with_active(false);
        let health = assess_health(&inactive, PaymentStatus::Progressing, date(2024, 2, 20), 7);
        assert_eq!(health.score, 30);
        assert_eq!(health.level, HealthLevel::Poor);
    }

    #[test]
    fn test_alerts() {
        let sub = open_ended().with_auto_renewal(false);
        let health = assess_health(&sub, PaymentStatus::Unpaid, date(2024, 2, 20), 7);
        let alerts = subscription_alerts(&sub, &health);

        let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Payment is 5 days overdue",
                "Payment status: unpaid",
                "Auto-renewal is disabled",
            ]
        );
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert_eq!(alerts[2].kind, AlertKind::Info);
        assert!(should_send_reminder(&health));
    }

    #[test]
    fn test_reminder_not_needed_when_healthy() {
        let health = assess_health(&open_ended(), PaymentStatus::Paid, date(2024, 2, 1), 7);
        assert!(!should_send_reminder(&health));
        assert!(subscription_alerts(&open_ended(), &health).is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let summary = PaymentSummary::new(Some(4), 3, PaymentStatus::Progressing);
        assert_eq!(summary.unpaid_count, 1);
        assert_eq!(summary.progress_percentage, 75);
        assert!(!summary.is_completed());

        let open = PaymentSummary::new(None, 2, PaymentStatus::Paid);
        assert_eq!(open.total_payments, 0);
        assert_eq!(open.unpaid_count, 0);
    }

    #[test]
    fn test_recommendations() {
        let health = assess_health(&open_ended(), PaymentStatus::Paid, date(2024, 2, 1), 7);
        let recs = recommendations(&health, &[], None, None);
        assert_eq!(recs, vec!["Subscription is in excellent health - no action needed"]);

        let overdue = assess_health(&open_ended(), PaymentStatus::Unpaid, date(2024, 2, 20), 7);
        let recs = recommendations(&overdue, &[], Some(0), Some(3));
        assert_eq!(recs.len(), 2);
        assert!(recs[0].starts_with("Pay overdue amount"));
    }
}
