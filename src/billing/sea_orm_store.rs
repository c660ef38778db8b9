//! SeaORM-backed schedule storage.
//!
//! Persists subscriptions and payment rows with SeaORM. Change sets run inside
//! a database transaction so a subscription's rows are never left half-updated.
//!
//! # Example
//!
//! ```rust,ignore
//! use subtrack::billing::{ScheduleManager, SeaOrmScheduleStore};
//!
//! let store = SeaOrmScheduleStore::new(db.clone());
//! store.create_schema().await?;
//!
//! let schedule = ScheduleManager::new(store.clone());
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Schema, Set, TransactionTrait, entity::prelude::*, sea_query::OnConflict,
};

use super::payment::Payment;
use super::storage::{ChangeSummary, PaymentChange, PaymentChangeSet, PaymentStore, SubscriptionStore};
use super::subscription::{Subscription, SubscriptionId};
use crate::error::{Result, SubtrackError};

mod entity {
    pub mod subscription {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "subtrack_subscriptions")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub name: String,
            pub monthly_cost_cents: Option<i64>,
            pub yearly_cost_cents: Option<i64>,
            pub billing_cycle: String,
            pub start_date: Date,
            pub renewal_date: Option<Date>,
            pub duration_months: Option<i32>,
            pub duration_years: Option<i32>,
            pub is_active: bool,
            pub auto_renewal: bool,
            pub category_id: Option<i64>,
            pub created_at: DateTimeWithTimeZone,
            pub updated_at: DateTimeWithTimeZone,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod payment {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "subtrack_payments")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub subscription_id: i64,
            #[sea_orm(primary_key, auto_increment = false)]
            pub billing_period_start: Date,
            pub billing_period_end: Date,
            pub amount_cents: i64,
            pub is_paid: bool,
            pub payment_date: Option<Date>,
            pub notes: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::{payment, subscription};

/// Convert i32 to u32 safely (negative values become 0).
#[inline]
fn i32_to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Convert u32 to i32 safely (values > i32::MAX become i32::MAX).
#[inline]
fn u32_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Convert u64 to usize safely (values > usize::MAX become usize::MAX).
#[inline]
fn u64_to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn model_to_subscription(model: subscription::Model) -> Result<Subscription> {
    let billing_cycle = model.billing_cycle.parse().map_err(|e| {
        SubtrackError::Database(format!("subscription {} has a corrupt row: {}", model.id, e))
    })?;

    Ok(Subscription {
        id: Some(model.id),
        name: model.name,
        monthly_cost_cents: model.monthly_cost_cents,
        yearly_cost_cents: model.yearly_cost_cents,
        billing_cycle,
        start_date: model.start_date,
        renewal_date: model.renewal_date,
        duration_months: model.duration_months.map(i32_to_u32),
        duration_years: model.duration_years.map(i32_to_u32),
        is_active: model.is_active,
        auto_renewal: model.auto_renewal,
        category_id: model.category_id,
    })
}

fn subscription_to_active_model(
    sub: &Subscription,
    now: DateTimeWithTimeZone,
) -> subscription::ActiveModel {
    subscription::ActiveModel {
        id: sub.id.map_or(sea_orm::ActiveValue::NotSet, Set),
        name: Set(sub.name.clone()),
        monthly_cost_cents: Set(sub.monthly_cost_cents),
        yearly_cost_cents: Set(sub.yearly_cost_cents),
        billing_cycle: Set(sub.billing_cycle.as_str().to_string()),
        start_date: Set(sub.start_date),
        renewal_date: Set(sub.renewal_date),
        duration_months: Set(sub.duration_months.map(u32_to_i32)),
        duration_years: Set(sub.duration_years.map(u32_to_i32)),
        is_active: Set(sub.is_active),
        auto_renewal: Set(sub.auto_renewal),
        category_id: Set(sub.category_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn model_to_payment(model: payment::Model) -> Payment {
    Payment {
        subscription_id: model.subscription_id,
        billing_period_start: model.billing_period_start,
        billing_period_end: model.billing_period_end,
        amount_cents: model.amount_cents,
        is_paid: model.is_paid,
        payment_date: model.payment_date,
        notes: model.notes,
    }
}

fn payment_to_active_model(subscription_id: SubscriptionId, p: &Payment) -> payment::ActiveModel {
    payment::ActiveModel {
        subscription_id: Set(subscription_id),
        billing_period_start: Set(p.billing_period_start),
        billing_period_end: Set(p.billing_period_end),
        amount_cents: Set(p.amount_cents),
        is_paid: Set(p.is_paid),
        payment_date: Set(p.payment_date),
        notes: Set(p.notes.clone()),
    }
}

fn payment_key_conflict() -> OnConflict {
    OnConflict::columns([
        payment::Column::SubscriptionId,
        payment::Column::BillingPeriodStart,
    ])
    .to_owned()
}

/// On a key clash only the paid state is overwritten.
fn payment_status_conflict() -> OnConflict {
    payment_key_conflict()
        .update_columns([payment::Column::IsPaid, payment::Column::PaymentDate])
        .to_owned()
}

/// SeaORM-backed store implementing both [`PaymentStore`] and [`SubscriptionStore`].
#[derive(Clone, Debug)]
pub struct SeaOrmScheduleStore {
    db: DatabaseConnection,
}

impl SeaOrmScheduleStore {
    /// Create a new SeaORM schedule store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the subscription and payment tables if they do not exist.
    pub async fn create_schema(&self) -> Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut subscriptions = schema.create_table_from_entity(subscription::Entity);
        let mut payments = schema.create_table_from_entity(payment::Entity);
        self.db.execute(backend.build(subscriptions.if_not_exists())).await?;
        self.db.execute(backend.build(payments.if_not_exists())).await?;

        Ok(())
    }
}

#[async_trait]
impl PaymentStore for SeaOrmScheduleStore {
    async fn list_payments(&self, subscription_id: SubscriptionId) -> Result<Vec<Payment>> {
        tracing::debug!(subscription_id, "listing payments");

        let rows = payment::Entity::find()
            .filter(payment::Column::SubscriptionId.eq(subscription_id))
            .order_by_asc(payment::Column::BillingPeriodStart)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(model_to_payment).collect())
    }

    async fn get_payment(
        &self,
        subscription_id: SubscriptionId,
        period_start: NaiveDate,
    ) -> Result<Option<Payment>> {
        let row = payment::Entity::find_by_id((subscription_id, period_start))
            .one(&self.db)
            .await?;
        Ok(row.map(model_to_payment))
    }

    async fn apply_changes(
        &self,
        subscription_id: SubscriptionId,
        changes: &PaymentChangeSet,
    ) -> Result<ChangeSummary> {
        tracing::debug!(subscription_id, changes = changes.len(), "applying payment changes");

        let txn = self.db.begin().await?;
        let mut summary = ChangeSummary::default();

        for change in changes.iter() {
            match change {
                PaymentChange::DeleteUnpaid { period_start } => {
                    let result = payment::Entity::delete_many()
                        .filter(payment::Column::SubscriptionId.eq(subscription_id))
                        .filter(payment::Column::BillingPeriodStart.eq(*period_start))
                        .filter(payment::Column::IsPaid.eq(false))
                        .exec(&txn)
                        .await?;
                    summary.deleted += u64_to_usize(result.rows_affected);
                }
                PaymentChange::InsertIfAbsent(p) => {
                    let inserted = payment::Entity::insert(payment_to_active_model(subscription_id, p))
                        .on_conflict(payment_key_conflict().do_nothing().to_owned())
                        .exec_without_returning(&txn)
                        .await?;
                    summary.inserted += u64_to_usize(inserted);
                }
                PaymentChange::SetStatus(p) => {
                    let exists = payment::Entity::find_by_id((subscription_id, p.billing_period_start))
                        .one(&txn)
                        .await?
                        .is_some();
                    payment::Entity::insert(payment_to_active_model(subscription_id, p))
                        .on_conflict(payment_status_conflict())
                        .exec_without_returning(&txn)
                        .await?;
                    if exists {
                        summary.updated += 1;
                    } else {
                        summary.inserted += 1;
                    }
                }
            }
        }

        txn.commit().await?;
        Ok(summary)
    }

    async fn delete_all_payments(&self, subscription_id: SubscriptionId) -> Result<usize> {
        let result = payment::Entity::delete_many()
            .filter(payment::Column::SubscriptionId.eq(subscription_id))
            .exec(&self.db)
            .await?;
        Ok(u64_to_usize(result.rows_affected))
    }
}

#[async_trait]
impl SubscriptionStore for SeaOrmScheduleStore {
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        tracing::debug!(subscription_id = id, "fetching subscription");

        subscription::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_subscription)
            .transpose()
    }

    async fn save_subscription(&self, sub: &Subscription) -> Result<Subscription> {
        let now = chrono::Utc::now().fixed_offset();
        let active_model = subscription_to_active_model(sub, now);

        let id = match sub.id {
            None => active_model.insert(&self.db).await?.id,
            Some(id) => {
                subscription::Entity::insert(active_model)
                    .on_conflict(
                        OnConflict::column(subscription::Column::Id)
                            .update_columns([
                                subscription::Column::Name,
                                subscription::Column::MonthlyCostCents,
                                subscription::Column::YearlyCostCents,
                                subscription::Column::BillingCycle,
                                subscription::Column::StartDate,
                                subscription::Column::RenewalDate,
                                subscription::Column::DurationMonths,
                                subscription::Column::DurationYears,
                                subscription::Column::IsActive,
                                subscription::Column::AutoRenewal,
                                subscription::Column::CategoryId,
                                subscription::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(&self.db)
                    .await?;
                id
            }
        };

        tracing::debug!(subscription_id = id, "saved subscription");
        Ok(Subscription {
            id: Some(id),
            ..sub.clone()
        })
    }

    async fn delete_subscription(&self, id: SubscriptionId) -> Result<()> {
        subscription::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        subscription::Entity::find()
            .order_by_asc(subscription::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_subscription)
            .collect()
    }
}
