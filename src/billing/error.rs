//! Schedule-specific error types.
//!
//! Provides granular error types for billing schedule operations, enabling
//! callers to tell validation failures apart from storage problems.

use std::fmt;

use chrono::NaiveDate;

use super::subscription::SubscriptionId;

/// Billing schedule errors.
///
/// These errors carry more context than generic errors and can be
/// converted to `SubtrackError` at the crate boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    // Configuration errors
    /// The billing cycle is neither monthly nor yearly.
    InvalidBillingCycle { value: String },
    /// A duration was given but is zero or longer than supported.
    InvalidDuration { field: &'static str, value: u32, max: u32 },
    /// The subscription name is empty or too long.
    InvalidName { reason: String },
    /// A cost is negative or above the supported maximum.
    InvalidCost { field: &'static str, cents: i64, max: i64 },
    /// The category name or parent is invalid.
    InvalidCategory { reason: String },
    /// Calendar arithmetic left the supported date range.
    DateOutOfRange { date: NaiveDate },

    // Subscription errors
    /// The operation needs a persisted subscription identity.
    UnsavedSubscription,
    /// No subscription exists with this ID.
    SubscriptionNotFound { subscription_id: SubscriptionId },
    /// Payments cannot be changed on an inactive subscription.
    SubscriptionInactive { subscription_id: SubscriptionId },

    // General errors
    /// An unexpected internal error occurred.
    Internal { message: String },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBillingCycle { value } => {
                write!(f, "Invalid billing cycle '{}': expected 'monthly' or 'yearly'", value)
            }
            Self::InvalidDuration { field, value, max } => {
                write!(f, "Invalid {}: {} (must be between 1 and {})", field, value, max)
            }
            Self::InvalidName { reason } => {
                write!(f, "Invalid subscription name: {}", reason)
            }
            Self::InvalidCost { field, cents, max } => {
                write!(f, "Invalid {}: {} cents (must be between 0 and {})", field, cents, max)
            }
            Self::InvalidCategory { reason } => {
                write!(f, "Invalid category: {}", reason)
            }
            Self::DateOutOfRange { date } => {
                write!(f, "Date arithmetic from {} is out of range", date)
            }
            Self::UnsavedSubscription => {
                write!(f, "Subscription has not been saved yet")
            }
            Self::SubscriptionNotFound { subscription_id } => {
                write!(f, "Subscription not found: {}", subscription_id)
            }
            Self::SubscriptionInactive { subscription_id } => {
                write!(f, "Cannot modify payments for inactive subscription {}", subscription_id)
            }
            Self::Internal { message } => {
                write!(f, "Internal schedule error: {}", message)
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<ScheduleError> for crate::error::SubtrackError {
    fn from(err: ScheduleError) -> Self {
        match &err {
            ScheduleError::SubscriptionNotFound { .. } => {
                crate::error::SubtrackError::NotFound(err.to_string())
            }

            ScheduleError::SubscriptionInactive { .. } => {
                crate::error::SubtrackError::Forbidden(err.to_string())
            }

            ScheduleError::InvalidBillingCycle { .. }
            | ScheduleError::InvalidDuration { .. }
            | ScheduleError::InvalidName { .. }
            | ScheduleError::InvalidCost { .. }
            | ScheduleError::InvalidCategory { .. }
            | ScheduleError::DateOutOfRange { .. }
            | ScheduleError::UnsavedSubscription => {
                crate::error::SubtrackError::BadRequest(err.to_string())
            }

            ScheduleError::Internal { .. } => {
                crate::error::SubtrackError::Internal(err.to_string())
            }
        }
    }
}

impl ScheduleError {
    /// Check if this error was caused by the caller's input or state.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Check if this is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}
