//! Renewal date arithmetic.

use chrono::NaiveDate;

use super::error::ScheduleError;
use super::status::CurrentPeriodStatus;
use super::subscription::Subscription;

/// Renewal date one cycle after the stored one.
///
/// Falls back to the start date when no renewal date is stored.
pub fn calculate_next_renewal(subscription: &Subscription) -> Result<NaiveDate, ScheduleError> {
    let anchor = subscription.renewal_date.unwrap_or(subscription.start_date);
    subscription.billing_cycle.advance(anchor)
}

/// Renewal date for a new schedule: one cycle after the start date.
pub fn initial_renewal_date(subscription: &Subscription) -> Result<NaiveDate, ScheduleError> {
    subscription.billing_cycle.advance(subscription.start_date)
}

/// Renewal date to use for status checks, computing it when none is stored.
pub fn effective_renewal_date(subscription: &Subscription) -> Result<NaiveDate, ScheduleError> {
    match subscription.renewal_date {
        Some(date) => Ok(date),
        None => initial_renewal_date(subscription),
    }
}

/// Signed days from `today` to the renewal date.
///
/// `None` for inactive subscriptions or when no renewal date is stored.
#[must_use]
pub fn days_until_renewal(subscription: &Subscription, today: NaiveDate) -> Option<i64> {
    if !subscription.is_active {
        return None;
    }
    subscription
        .renewal_date
        .map(|renewal| (renewal - today).num_days())
}

/// Whether the subscription renews between today and `days` from now, inclusive.
///
/// Renewal dates already in the past never count.
#[must_use]
pub fn is_renewing_within(subscription: &Subscription, days: i64, today: NaiveDate) -> bool {
    days_until_renewal(subscription, today).is_some_and(|d| (0..=days).contains(&d))
}

/// Auto-renewal applies to active, open-ended subscriptions whose current period is paid.
#[must_use]
pub fn should_auto_renew(subscription: &Subscription, current: CurrentPeriodStatus) -> bool {
    subscription.auto_renewal
        && subscription.is_active
        && !subscription.is_bounded()
        && current == CurrentPeriodStatus::Paid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::cycle::BillingCycle;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly() -> Subscription {
        Subscription::new("Cloud", BillingCycle::Monthly, date(2024, 1, 15))
            .with_renewal_date(date(2024, 2, 15))
    }

    #[test]
    fn test_next_renewal() {
        assert_eq!(calculate_next_renewal(&monthly()).unwrap(), date(2024, 3, 15));

        let mut yearly = monthly();
        yearly.billing_cycle = BillingCycle::Yearly;
        assert_eq!(calculate_next_renewal(&yearly).unwrap(), date(2025, 2, 15));
    }

    #[test]
    fn test_initial_renewal() {
        let sub = Subscription::new("Cloud", BillingCycle::Monthly, date(2024, 3, 1));
        assert_eq!(initial_renewal_date(&sub).unwrap(), date(2024, 4, 1));
        assert_eq!(effective_renewal_date(&sub).unwrap(), date(2024, 4, 1));
        assert_eq!(effective_renewal_date(&monthly()).unwrap(), date(2024, 2, 15));
    }

    #[test]
    fn test_days_until_renewal() {
        let sub = monthly();
        assert_eq!(days_until_renewal(&sub, date(2024, 2, 10)), Some(5));
        assert_eq!(days_until_renewal(&sub, date(2024, 2, 20)), Some(-5));

        let inactive = monthly().with_active(false);
        assert_eq!(days_until_renewal(&inactive, date(2024, 2, 10)), None);

        let unset = Subscription::new("Cloud", BillingCycle::Monthly, date(2024, 1, 15));
        assert_eq!(days_until_renewal(&unset, date(2024, 2, 10)), None);
    }

    #[test]
    fn test_renewing_within() {
        let sub = monthly();
        assert!(is_renewing_within(&sub, 7, date(2024, 2, 8)));
        assert!(is_renewing_within(&sub, 7, date(2024, 2, 15)));
        assert!(!is_renewing_within(&sub, 7, date(2024, 2, 7)));
        assert!(!is_renewing_within(&sub, 7, date(2024, 2, 16)));
    }

    #[test]
    fn test_should_auto_renew() {
        let sub = monthly();
        assert!(should_auto_renew(&sub, CurrentPeriodStatus::Paid));
        assert!(!should_auto_renew(&sub, CurrentPeriodStatus::Unpaid));
        assert!(!should_auto_renew(&sub.clone().with_auto_renewal(false), CurrentPeriodStatus::Paid));
        assert!(!should_auto_renew(&sub.clone().with_duration_months(12), CurrentPeriodStatus::Paid));
    }
}
