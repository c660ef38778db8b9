//! Billing cycle and calendar arithmetic.
//!
//! Month and year steps clamp to the last day of the target month, so
//! January 31st plus one month is the last day of February.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::ScheduleError;

/// How often a subscription is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// Get the cycle as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Number of calendar months in one cycle.
    #[must_use]
    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 12,
        }
    }

    /// The other cycle.
    #[must_use]
    pub fn alternate(&self) -> Self {
        match self {
            Self::Monthly => Self::Yearly,
            Self::Yearly => Self::Monthly,
        }
    }

    /// Move `date` forward by one cycle.
    pub fn advance(&self, date: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        self.advance_by(date, 1)
    }

    /// Move `date` forward by `count` cycles in a single step.
    ///
    /// A single step clamps once, which differs from applying [`advance`](Self::advance)
    /// `count` times when the start falls on a day some months lack.
    pub fn advance_by(&self, date: NaiveDate, count: u32) -> Result<NaiveDate, ScheduleError> {
        self.months()
            .checked_mul(count)
            .and_then(|months| date.checked_add_months(Months::new(months)))
            .ok_or(ScheduleError::DateOutOfRange { date })
    }

    /// Move `date` back by one cycle.
    pub fn retreat(&self, date: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        date.checked_sub_months(Months::new(self.months()))
            .ok_or(ScheduleError::DateOutOfRange { date })
    }

    /// Last day of the period beginning on `start`.
    pub fn period_end(&self, start: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        let next = self.advance(start)?;
        next.checked_sub_days(Days::new(1))
            .ok_or(ScheduleError::DateOutOfRange { date: next })
    }
}

impl FromStr for BillingCycle {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(ScheduleError::InvalidBillingCycle {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
