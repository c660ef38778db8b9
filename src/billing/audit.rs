//! Audit logging for schedule operations.
//!
//! Provides a trait-based audit logging system for tracking changes to
//! payment rows and subscriptions.

use std::fmt;

use chrono::NaiveDate;

use super::subscription::SubscriptionId;

/// Audit event types for schedule operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleAuditEvent {
    /// Placeholder rows created for current and past-due periods.
    PlaceholdersMaterialized {
        subscription_id: SubscriptionId,
        created: usize,
    },
    /// Rows reconciled against the intended schedule.
    PaymentsReconciled {
        subscription_id: SubscriptionId,
        deleted_unpaid: usize,
        created_placeholders: usize,
    },
    /// Every row deleted after a schedule change.
    PaymentsReset {
        subscription_id: SubscriptionId,
        deleted: usize,
    },
    /// A period marked as paid.
    PaymentMarkedPaid {
        subscription_id: SubscriptionId,
        period_start: NaiveDate,
        payment_date: NaiveDate,
        amount_cents: i64,
    },
    /// A period marked as unpaid.
    PaymentMarkedUnpaid {
        subscription_id: SubscriptionId,
        period_start: NaiveDate,
    },
    /// Renewal date set from the start date.
    RenewalDateReset {
        subscription_id: SubscriptionId,
        renewal_date: NaiveDate,
    },
    /// Subscription created or updated.
    SubscriptionSaved {
        subscription_id: SubscriptionId,
        created: bool,
        schedule_reset: bool,
    },
}

impl fmt::Display for ScheduleAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceholdersMaterialized { subscription_id, created } => {
                write!(f, "Placeholders materialized: sub={}, created={}", subscription_id, created)
            }
            Self::PaymentsReconciled { subscription_id, deleted_unpaid, created_placeholders } => {
                write!(
                    f,
                    "Payments reconciled: sub={}, deleted_unpaid={}, created={}",
                    subscription_id, deleted_unpaid, created_placeholders
                )
            }
            Self::PaymentsReset { subscription_id, deleted } => {
                write!(f, "Payments reset: sub={}, deleted={}", subscription_id, deleted)
            }
            Self::PaymentMarkedPaid { subscription_id, period_start, payment_date, amount_cents } => {
                write!(
                    f,
                    "Payment marked paid: sub={}, period={}, paid_on={}, amount={}",
                    subscription_id, period_start, payment_date, amount_cents
                )
            }
            Self::PaymentMarkedUnpaid { subscription_id, period_start } => {
                write!(f, "Payment marked unpaid: sub={}, period={}", subscription_id, period_start)
            }
            Self::RenewalDateReset { subscription_id, renewal_date } => {
                write!(f, "Renewal date reset: sub={}, renewal={}", subscription_id, renewal_date)
            }
            Self::SubscriptionSaved { subscription_id, created, schedule_reset } => {
                write!(
                    f,
                    "Subscription saved: sub={}, created={}, schedule_reset={}",
                    subscription_id, created, schedule_reset
                )
            }
        }
    }
}

/// Trait for audit logging backends.
///
/// Implement this trait to integrate with your logging system (e.g., database,
/// external service, file-based logging).
#[allow(async_fn_in_trait)]
pub trait ScheduleAuditLogger: Send + Sync {
    /// Log a schedule audit event.
    ///
    /// Failures must not propagate into the schedule operation.
    async fn log(&self, event: ScheduleAuditEvent);
}

/// No-op audit logger that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl ScheduleAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: ScheduleAuditEvent) {}
}

/// Tracing-based audit logger.
///
/// Logs audit events using the `tracing` crate at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl ScheduleAuditLogger for TracingAuditLogger {
    async fn log(&self, event: ScheduleAuditEvent) {
        tracing::info!(
            target: "subtrack::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &ScheduleAuditEvent) -> &'static str {
    match event {
        ScheduleAuditEvent::PlaceholdersMaterialized { .. } => "placeholders_materialized",
        ScheduleAuditEvent::PaymentsReconciled { .. } => "payments_reconciled",
        ScheduleAuditEvent::PaymentsReset { .. } => "payments_reset",
        ScheduleAuditEvent::PaymentMarkedPaid { .. } => "payment_marked_paid",
        ScheduleAuditEvent::PaymentMarkedUnpaid { .. } => "payment_marked_unpaid",
        ScheduleAuditEvent::RenewalDateReset { .. } => "renewal_date_reset",
        ScheduleAuditEvent::SubscriptionSaved { .. } => "subscription_saved",
    }
}
