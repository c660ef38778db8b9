//! Subtrack - billing periods and payment tracking for personal subscriptions
//!
//! Subtrack derives the billing schedule of a subscription from its start
//! date, billing cycle and optional duration, keeps one payment row per
//! elapsed period, and reports payment status, renewals and health.
//!
//! # Features
//!
//! - **Schedule**: Deterministic period generation with month-end clamping
//! - **Reconciliation**: Paid history survives schedule edits
//! - **Status**: Current-period, overall and health reporting
//! - **Storage**: In-memory stores, plus SeaORM with the `database` feature
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use subtrack::billing::{
//!     BillingCycle, InMemoryPaymentStore, InMemorySubscriptionStore, ScheduleManager,
//!     Subscription, SubscriptionManager,
//! };
//!
//! #[tokio::main]
//! async fn main() -> subtrack::Result<()> {
//!     subtrack::init_tracing();
//!
//!     let config = subtrack::ConfigBuilder::new().from_env().build()?;
//!     let schedule = ScheduleManager::new(InMemoryPaymentStore::new()).with_config(config.schedule);
//!     let manager = SubscriptionManager::new(InMemorySubscriptionStore::new(), schedule);
//!
//!     let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//!     let sub = manager
//!         .save_subscription(
//!             Subscription::new("Streaming", BillingCycle::Monthly, start)
//!                 .with_monthly_cost(1299)
//!                 .with_duration_months(3),
//!         )
//!         .await?;
//!
//!     let today = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
//!     for period in manager.schedule().get_billing_periods(&sub, today).await? {
//!         println!("{} {} -> {} paid={}", period.period_number, period.start, period.end, period.is_paid);
//!     }
//!     Ok(())
//! }
//! ```

#![allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds properly

pub mod billing;
mod config;
mod error;

// Re-exports for public API
pub use billing::{
    BillingCycle, BillingPeriod, Payment, PaymentStatus, PeriodView, ScheduleManager, Subscription,
    SubscriptionManager,
};
pub use config::{Config, ConfigBuilder, LoggingConfig, ScheduleConfig};
pub use error::{Result, SubtrackError};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "subtrack=debug")
/// - `SUBTRACK_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("SUBTRACK_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing from a [`LoggingConfig`]
pub fn init_tracing_with_config(config: &LoggingConfig) {
    let env_filter = EnvFilter::new(&config.level);

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
