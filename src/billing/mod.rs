//! Billing periods and payment reconciliation for tracked subscriptions.
//!
//! A subscription's start date, cycle and duration define a deterministic
//! list of billing periods. Payment rows are created lazily for periods that
//! are current or past due, and reconciled whenever the schedule changes.
//!
//! # Features
//!
//! - `database` - Enables the SeaORM-backed store
//!
//! # Example
//!
//! ```rust,ignore
//! use subtrack::billing::{
//!     BillingCycle, InMemoryPaymentStore, InMemorySubscriptionStore, ScheduleManager,
//!     Subscription, SubscriptionManager,
//! };
//!
//! let schedule = ScheduleManager::new(InMemoryPaymentStore::new());
//! let manager = SubscriptionManager::new(InMemorySubscriptionStore::new(), schedule);
//!
//! let sub = manager
//!     .save_subscription(
//!         Subscription::new("Streaming", BillingCycle::Monthly, start)
//!             .with_monthly_cost(1299)
//!             .with_duration_months(12),
//!     )
//!     .await?;
//!
//! let periods = manager.schedule().get_billing_periods(&sub, today).await?;
//! manager.schedule().mark_payment_paid(&sub, periods[0].start, None, today).await?;
//! ```

pub mod audit;
pub mod calculation;
pub mod category;
pub mod cycle;
pub mod error;
pub mod memory;
pub mod payment;
pub mod period;
pub mod renewal;
pub mod schedule;
#[cfg(feature = "database")]
pub mod sea_orm_store;
pub mod status;
pub mod storage;
pub mod subscription;
pub mod validation;

// Core types
pub use cycle::BillingCycle;
pub use payment::Payment;
pub use period::{BillingPeriod, PeriodView, build_period_views, generate_intended_periods};
pub use subscription::{Subscription, SubscriptionId, SubscriptionManager};

// Schedule exports
pub use schedule::{ReconcileOutcome, ResetOutcome, ScheduleManager};

// Storage exports
pub use memory::{InMemoryPaymentStore, InMemorySubscriptionStore};
pub use storage::{ChangeSummary, PaymentChange, PaymentChangeSet, PaymentStore, SubscriptionStore};

#[cfg(feature = "database")]
pub use sea_orm_store::SeaOrmScheduleStore;

// Status exports
pub use status::{
    Alert, AlertKind, CurrentPeriodStatus, FinancialSummary, HealthLevel, LifecycleSummary,
    PaymentStatus, PaymentSummary, SubscriptionHealth, SubscriptionReport,
};

// Calculation exports
pub use calculation::{
    CycleSavings, DEFAULT_HIGH_COST_THRESHOLD_CENTS, DashboardTotals, HighCostSubscription,
    PortfolioOptimization, SavingsOpportunity, break_even_months, calculate_portfolio_optimization,
    compute_dashboard_totals, find_high_cost_subscriptions, find_savings_opportunities,
    monthly_equivalent_cents, potential_savings_cents,
};

// Category exports
pub use category::{Category, CategoryId, DEFAULT_CATEGORY_NAME, subcategories, validate_category};

// Validation exports
pub use validation::{validate_payment_period, validate_subscription};

// Audit exports
pub use audit::{NoOpAuditLogger, ScheduleAuditEvent, ScheduleAuditLogger, TracingAuditLogger};

// Error exports
pub use error::ScheduleError;
