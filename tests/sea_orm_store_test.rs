//! SeaORM store tests against in-memory SQLite

#![cfg(feature = "database")]

use chrono::NaiveDate;
use sea_orm::Database;
use subtrack::billing::{
    BillingCycle, PaymentStore, ScheduleManager, SeaOrmScheduleStore, Subscription,
    SubscriptionManager, SubscriptionStore,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn store() -> SeaOrmScheduleStore {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let store = SeaOrmScheduleStore::new(db);
    store.create_schema().await.unwrap();
    store
}

#[tokio::test]
async fn test_subscription_roundtrip() {
    let store = store().await;

    let saved = store
        .save_subscription(
            &Subscription::new("Gym", BillingCycle::Monthly, date(2024, 1, 15))
                .with_monthly_cost(3000)
                .with_duration_months(12)
                .with_category(3),
        )
        .await
        .unwrap();
    let id = saved.id.unwrap();

    let loaded = store.get_subscription(id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Gym");
    assert_eq!(loaded.duration_months, Some(12));
    assert_eq!(loaded.category_id, Some(3));

    let renamed = Subscription {
        name: "Climbing gym".to_string(),
        ..loaded
    };
    store.save_subscription(&renamed).await.unwrap();
    assert_eq!(store.list_subscriptions().await.unwrap().len(), 1);
    assert_eq!(
        store.get_subscription(id).await.unwrap().unwrap().name,
        "Climbing gym"
    );

    store.delete_subscription(id).await.unwrap();
    assert!(store.get_subscription(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_schedule_over_sqlite() {
    let store = store().await;
    let manager = SubscriptionManager::new(store.clone(), ScheduleManager::new(store.clone()));

    let sub = manager
        .save_subscription(
            Subscription::new("Streaming", BillingCycle::Monthly, date(2024, 1, 15))
                .with_monthly_cost(1299)
                .with_duration_months(3),
        )
        .await
        .unwrap();
    let id = sub.id.unwrap();
    let today = date(2024, 2, 20);
    let schedule = manager.schedule();

    let views = schedule.get_billing_periods(&sub, today).await.unwrap();
    assert_eq!(views.len(), 3);
    assert_eq!(store.list_payments(id).await.unwrap().len(), 2);

    // Materializing again creates nothing
    assert_eq!(schedule.ensure_materialized(&sub, today).await.unwrap(), 0);

    schedule
        .mark_payment_paid(&sub, date(2024, 1, 15), None, today)
        .await
        .unwrap();
    let paid = store.get_payment(id, date(2024, 1, 15)).await.unwrap().unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.payment_date, Some(today));
    assert_eq!(paid.amount_cents, 1299);

    schedule.mark_payment_unpaid(&sub, date(2024, 1, 15)).await.unwrap();
    let unpaid = store.get_payment(id, date(2024, 1, 15)).await.unwrap().unwrap();
    assert!(!unpaid.is_paid);
    assert_eq!(unpaid.payment_date, None);
    schedule
        .mark_payment_paid(&sub, date(2024, 1, 15), None, today)
        .await
        .unwrap();

    let outcome = schedule.reconcile_payments(&sub, today).await.unwrap();
    assert_eq!(outcome.deleted_unpaid, 0);
    assert_eq!(outcome.created_placeholders, 0);
    assert_eq!(schedule.paid_payments_count(&sub).await.unwrap(), 1);

    manager.delete_subscription(id).await.unwrap();
    assert!(store.list_payments(id).await.unwrap().is_empty());
}
