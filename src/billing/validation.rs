//! Input validation for subscriptions and payment periods.

use chrono::NaiveDate;

use crate::error::Result;

use super::error::ScheduleError;
use super::period::generate_intended_periods;
use super::subscription::Subscription;

/// Maximum length for subscription names, in characters.
const MAX_NAME_LENGTH: usize = 200;

/// Largest accepted cost: 99,999,999.99 in a currency with two decimal places.
pub const MAX_COST_CENTS: i64 = 9_999_999_999;

/// Longest monthly schedule accepted (100 years).
pub const MAX_DURATION_MONTHS: u32 = 1200;

/// Longest yearly schedule accepted.
pub const MAX_DURATION_YEARS: u32 = 100;

/// Validate a subscription before it is saved.
///
/// Subscriptions must:
/// - Have a non-blank name of at most 200 characters
/// - Have costs between 0 and [`MAX_COST_CENTS`]
/// - Have durations between 1 and [`MAX_DURATION_MONTHS`] / [`MAX_DURATION_YEARS`]
///   (leave them unset for an open-ended schedule)
///
/// # Errors
///
/// Returns the matching `ScheduleError`, converted to `SubtrackError::BadRequest`.
pub fn validate_subscription(subscription: &Subscription) -> Result<()> {
    validate_name(&subscription.name)?;

    validate_cost("monthly_cost", subscription.monthly_cost_cents)?;
    validate_cost("yearly_cost", subscription.yearly_cost_cents)?;

    validate_duration("duration_months", subscription.duration_months, MAX_DURATION_MONTHS)?;
    validate_duration("duration_years", subscription.duration_years, MAX_DURATION_YEARS)?;

    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ScheduleError::InvalidName {
            reason: "name cannot be empty".to_string(),
        }
        .into());
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ScheduleError::InvalidName {
            reason: format!("name exceeds maximum length of {}", MAX_NAME_LENGTH),
        }
        .into());
    }

    Ok(())
}

fn validate_cost(field: &'static str, cents: Option<i64>) -> Result<()> {
    match cents {
        Some(cents) if !(0..=MAX_COST_CENTS).contains(&cents) => Err(ScheduleError::InvalidCost {
            field,
            cents,
            max: MAX_COST_CENTS,
        }
        .into()),
        _ => Ok(()),
    }
}

fn validate_duration(field: &'static str, value: Option<u32>, max: u32) -> Result<()> {
    match value {
        Some(value) if value == 0 || value > max => {
            Err(ScheduleError::InvalidDuration { field, value, max }.into())
        }
        _ => Ok(()),
    }
}

/// Whether `period_start` is the start of one of the subscription's periods.
pub fn validate_payment_period(subscription: &Subscription, period_start: NaiveDate) -> Result<bool> {
    let periods = generate_intended_periods(subscription)?;
    Ok(periods.iter().any(|p| p.start == period_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::cycle::BillingCycle;
    use crate::error::SubtrackError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_valid() -> Subscription {
        Subscription::new("Newspaper", BillingCycle::Monthly, date(2024, 1, 15))
            .with_monthly_cost(1299)
            .with_duration_months(6)
    }

    #[test]
    fn test_valid_subscription() {
        assert!(validate_subscription(&make_valid()).is_ok());
    }

    #[test]
    fn test_empty_name() {
        let mut sub = make_valid();
        sub.name = "   ".to_string();
        let err = validate_subscription(&sub).unwrap_err();
        assert!(matches!(err, SubtrackError::BadRequest(_)));
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_long_name() {
        let mut sub = make_valid();
        sub.name = "x".repeat(201);
        assert!(validate_subscription(&sub).is_err());
        sub.name = "x".repeat(200);
        assert!(validate_subscription(&sub).is_ok());
    }

    #[test]
    fn test_negative_cost() {
        let sub = make_valid().with_yearly_cost(-1);
        let err = validate_subscription(&sub).unwrap_err();
        assert!(err.to_string().contains("yearly_cost"));
    }

    #[test]
    fn test_zero_duration() {
        let sub = make_valid().with_duration_years(0);
        let err = validate_subscription(&sub).unwrap_err();
        assert!(err.to_string().contains("duration_years"));
    }

    #[test]
    fn test_duration_upper_bound() {
        let sub = make_valid().with_duration_months(MAX_DURATION_MONTHS);
        assert!(validate_subscription(&sub).is_ok());

        let sub = make_valid().with_duration_months(MAX_DURATION_MONTHS + 1);
        let err = validate_subscription(&sub).unwrap_err();
        assert!(matches!(err, SubtrackError::BadRequest(_)));
        assert!(err.to_string().contains("duration_months"));

        let sub = make_valid().with_duration_months(u32::MAX);
        assert!(validate_subscription(&sub).is_err());

        let sub = make_valid().with_duration_years(MAX_DURATION_YEARS + 1);
        assert!(validate_subscription(&sub).is_err());
    }

    #[test]
    fn test_cost_upper_bound() {
        let sub = make_valid().with_monthly_cost(MAX_COST_CENTS);
        assert!(validate_subscription(&sub).is_ok());

        let sub = make_valid().with_monthly_cost(MAX_COST_CENTS + 1);
        let err = validate_subscription(&sub).unwrap_err();
        assert!(err.to_string().contains("monthly_cost"));

        let sub = make_valid().with_yearly_cost(i64::MAX / 2);
        assert!(validate_subscription(&sub).is_err());
    }

    #[test]
    fn test_validate_payment_period() {
        let sub = make_valid();
        assert!(validate_payment_period(&sub, date(2024, 1, 15)).unwrap());
        assert!(validate_payment_period(&sub, date(2024, 6, 15)).unwrap());
        assert!(!validate_payment_period(&sub, date(2024, 7, 15)).unwrap());
        assert!(!validate_payment_period(&sub, date(2024, 2, 1)).unwrap());
    }
}
