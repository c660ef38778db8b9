//! End-to-end tests for period generation, materialization and reconciliation

use chrono::NaiveDate;
use subtrack::SubtrackError;
use subtrack::billing::{
    BillingCycle, CurrentPeriodStatus, InMemoryPaymentStore, InMemorySubscriptionStore,
    PaymentStatus, PaymentStore, ReconcileOutcome, ScheduleManager, Subscription,
    SubscriptionManager,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> (
    SubscriptionManager<InMemorySubscriptionStore, InMemoryPaymentStore>,
    InMemoryPaymentStore,
) {
    let payments = InMemoryPaymentStore::new();
    let schedule = ScheduleManager::new(payments.clone());
    let manager = SubscriptionManager::new(InMemorySubscriptionStore::new(), schedule);
    (manager, payments)
}

fn monthly(start: NaiveDate, months: u32) -> Subscription {
    Subscription::new("Streaming", BillingCycle::Monthly, start)
        .with_monthly_cost(1299)
        .with_duration_months(months)
}

#[tokio::test]
async fn test_monthly_three_periods_mid_schedule() {
    let (manager, payments) = setup();
    let sub = manager
        .save_subscription(monthly(date(2024, 1, 15), 3))
        .await
        .unwrap();

    let views = manager
        .schedule()
        .get_billing_periods(&sub, date(2024, 2, 20))
        .await
        .unwrap();

    assert_eq!(views.len(), 3);
    assert_eq!((views[0].start, views[0].end), (date(2024, 1, 15), date(2024, 2, 14)));
    assert_eq!((views[1].start, views[1].end), (date(2024, 2, 15), date(2024, 3, 14)));
    assert_eq!((views[2].start, views[2].end), (date(2024, 3, 15), date(2024, 4, 14)));

    assert!(views[0].is_past_due);
    assert!(views[1].is_current);
    assert!(!views[2].is_current && !views[2].is_past_due);

    // Only the past-due and current periods have rows
    assert!(views[0].payment.is_some());
    assert!(views[1].payment.is_some());
    assert!(views[2].payment.is_none());
    assert_eq!(payments.len().await, 2);
    assert!(views.iter().all(|v| !v.is_paid && v.amount_cents == 1299));
}

#[tokio::test]
async fn test_period_counts_and_contiguity() {
    let (manager, _) = setup();
    let today = date(2020, 1, 1);

    let monthly_sub = manager
        .save_subscription(monthly(date(2024, 1, 31), 12))
        .await
        .unwrap();
    let views = manager.schedule().get_billing_periods(&monthly_sub, today).await.unwrap();
    assert_eq!(views.len(), 12);
    for pair in views.windows(2) {
        assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
        assert!(pair[0].start < pair[1].start);
    }
    assert_eq!(
        views.iter().map(|v| v.period_number).collect::<Vec<_>>(),
        (1..=12).collect::<Vec<_>>()
    );

    let yearly_sub = manager
        .save_subscription(
            Subscription::new("Domain", BillingCycle::Yearly, date(2024, 2, 29))
                .with_yearly_cost(1500)
                .with_duration_years(3),
        )
        .await
        .unwrap();
    let views = manager.schedule().get_billing_periods(&yearly_sub, today).await.unwrap();
    assert_eq!(views.len(), 3);
    assert_eq!(views[1].start, date(2025, 2, 28));

    let open_ended = manager
        .save_subscription(
            Subscription::new("Music", BillingCycle::Monthly, date(2024, 1, 1)).with_monthly_cost(999),
        )
        .await
        .unwrap();
    let views = manager.schedule().get_billing_periods(&open_ended, today).await.unwrap();
    assert!(views.is_empty());
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let (manager, payments) = setup();
    let sub = manager
        .save_subscription(monthly(date(2024, 1, 15), 6))
        .await
        .unwrap();
    let today = date(2024, 3, 20);

    let first = manager.schedule().reconcile_payments(&sub, today).await.unwrap();
    assert_eq!(first.created_placeholders, 3);
    assert_eq!(first.deleted_unpaid, 0);

    let second = manager.schedule().reconcile_payments(&sub, today).await.unwrap();
    assert_eq!(second, ReconcileOutcome::default());
    assert_eq!(payments.len().await, 3);
}

#[tokio::test]
async fn test_reconcile_keeps_paid_history_and_reset_removes_it() {
    let (manager, payments) = setup();
    let sub = manager
        .save_subscription(monthly(date(2024, 1, 15), 6))
        .await
        .unwrap();
    let today = date(2024, 4, 20);
    let schedule = manager.schedule();

    schedule.get_billing_periods(&sub, today).await.unwrap();
    assert_eq!(payments.len().await, 4);
    schedule
        .mark_payment_paid(&sub, date(2024, 1, 15), Some(date(2024, 1, 16)), today)
        .await
        .unwrap();
    schedule
        .mark_payment_paid(&sub, date(2024, 2, 15), None, today)
        .await
        .unwrap();

    // Shrink the schedule to a single period without going through save
    let shrunk = Subscription {
        duration_months: Some(1),
        ..sub.clone()
    };
    let outcome = schedule.reconcile_payments(&shrunk, today).await.unwrap();
    assert_eq!(outcome.deleted_unpaid, 2);
    assert_eq!(outcome.created_placeholders, 0);

    let id = sub.id.unwrap();
    let remaining = payments.list_payments(id).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|p| p.is_paid));
    // The off-schedule paid row is kept but not counted
    assert_eq!(schedule.paid_payments_count(&shrunk).await.unwrap(), 1);

    // A saved schedule change wipes everything, paid rows included
    let saved = manager.save_subscription(shrunk).await.unwrap();
    assert!(payments.list_payments(id).await.unwrap().is_empty());
    assert_eq!(schedule.paid_payments_count(&saved).await.unwrap(), 0);
}

#[tokio::test]
async fn test_status_transitions() {
    let (manager, _) = setup();
    let sub = manager
        .save_subscription(monthly(date(2024, 1, 1), 4))
        .await
        .unwrap();
    let today = date(2024, 6, 1);
    let schedule = manager.schedule();

    assert_eq!(
        schedule.overall_payment_status(&sub, today).await.unwrap(),
        PaymentStatus::Unpaid
    );
    assert_eq!(schedule.payment_progress_percentage(&sub).await.unwrap(), 0);

    let views = schedule.get_billing_periods(&sub, today).await.unwrap();
    for view in &views[..2] {
        schedule.mark_payment_paid(&sub, view.start, None, today).await.unwrap();
    }
    assert_eq!(
        schedule.overall_payment_status(&sub, today).await.unwrap(),
        PaymentStatus::Progressing
    );
    assert_eq!(schedule.payment_progress_percentage(&sub).await.unwrap(), 50);

    for view in &views[2..] {
        schedule.mark_payment_paid(&sub, view.start, None, today).await.unwrap();
    }
    assert_eq!(
        schedule.overall_payment_status(&sub, today).await.unwrap(),
        PaymentStatus::Completed
    );
    assert_eq!(schedule.payment_progress_percentage(&sub).await.unwrap(), 100);

    // Unmarking drops back to progressing
    schedule.mark_payment_unpaid(&sub, views[3].start).await.unwrap();
    assert_eq!(
        schedule.overall_payment_status(&sub, today).await.unwrap(),
        PaymentStatus::Progressing
    );

    // The schedule ended on 2024-05-01
    assert_eq!(
        schedule.current_period_status(&sub, today).await.unwrap(),
        CurrentPeriodStatus::Ended
    );
}

#[tokio::test]
async fn test_start_date_change_recomputes_renewal() {
    let (manager, _) = setup();
    let sub = manager
        .save_subscription(monthly(date(2024, 1, 15), 3))
        .await
        .unwrap();
    assert_eq!(sub.renewal_date, Some(date(2024, 2, 15)));

    let moved = manager
        .save_subscription(Subscription {
            start_date: date(2024, 3, 1),
            ..sub
        })
        .await
        .unwrap();
    assert_eq!(moved.renewal_date, Some(date(2024, 4, 1)));

    let views = manager
        .schedule()
        .get_billing_periods(&moved, date(2024, 3, 10))
        .await
        .unwrap();
    assert_eq!(views[0].start, date(2024, 3, 1));
    assert_eq!(views.iter().filter(|v| v.payment.is_some()).count(), 1);
}

#[tokio::test]
async fn test_inactive_subscription_rejects_payment_changes() {
    let (manager, _) = setup();
    let sub = manager
        .save_subscription(monthly(date(2024, 1, 15), 3).with_active(false))
        .await
        .unwrap();

    let err = manager
        .schedule()
        .mark_payment_paid(&sub, date(2024, 1, 15), None, date(2024, 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, SubtrackError::Forbidden(_)));
}

#[tokio::test]
async fn test_unsaved_subscription_rejected() {
    let (manager, _) = setup();
    let err = manager
        .schedule()
        .reconcile_payments(&monthly(date(2024, 1, 15), 3), date(2024, 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, SubtrackError::BadRequest(_)));
}
