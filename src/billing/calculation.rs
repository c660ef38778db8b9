//! Cost comparisons between billing cycles and portfolio totals.
//!
//! All amounts are in cents. Sums over many subscriptions saturate rather
//! than overflow.

use serde::{Deserialize, Serialize};

use super::cycle::BillingCycle;
use super::subscription::Subscription;

/// Cost per month under the current cycle.
///
/// Yearly costs are divided by 12, rounding half up.
#[must_use]
pub fn monthly_equivalent_cents(subscription: &Subscription) -> i64 {
    match subscription.billing_cycle {
        BillingCycle::Monthly => subscription.monthly_cost_cents.unwrap_or(0),
        BillingCycle::Yearly => {
            let yearly = subscription.yearly_cost_cents.unwrap_or(0);
            yearly.div_euclid(12) + i64::from(yearly.rem_euclid(12) >= 6)
        }
    }
}

/// Result of comparing the current cycle with the alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSavings {
    /// The cycle that would be switched to.
    pub switch_to: BillingCycle,
    /// Amount saved per year by switching. Negative when switching costs more.
    pub yearly_savings_cents: i64,
}

/// Yearly savings from switching to the other billing cycle.
///
/// `None` unless both costs are set and positive, or when the yearly
/// comparison overflows.
#[must_use]
pub fn potential_savings_cents(subscription: &Subscription) -> Option<CycleSavings> {
    let monthly = subscription.monthly_cost_cents.filter(|c| *c > 0)?;
    let yearly = subscription.yearly_cost_cents.filter(|c| *c > 0)?;

    let monthly_per_year = monthly.checked_mul(12)?;
    let yearly_savings_cents = match subscription.billing_cycle {
        BillingCycle::Monthly => monthly_per_year.checked_sub(yearly)?,
        BillingCycle::Yearly => yearly.checked_sub(monthly_per_year)?,
    };

    Some(CycleSavings {
        switch_to: subscription.billing_cycle.alternate(),
        yearly_savings_cents,
    })
}

/// Months of monthly billing that cost as much as one year of yearly billing.
///
/// `None` when either cost is not positive.
#[must_use]
pub fn break_even_months(monthly_cost_cents: i64, yearly_cost_cents: i64) -> Option<f64> {
    if monthly_cost_cents <= 0 || yearly_cost_cents <= 0 {
        return None;
    }
    Some(yearly_cost_cents as f64 / monthly_cost_cents as f64)
}

fn yearly_savings(subscription: &Subscription) -> i64 {
    potential_savings_cents(subscription).map_or(0, |s| s.yearly_savings_cents)
}

/// Default monthly-equivalent threshold for [`find_high_cost_subscriptions`].
pub const DEFAULT_HIGH_COST_THRESHOLD_CENTS: i64 = 5000;

/// Savings above this make the portfolio worth optimizing.
const NOTABLE_SAVINGS_CENTS: i64 = 10_000;
/// Savings below this mean the cycles are already a good fit.
const NEGLIGIBLE_SAVINGS_CENTS: i64 = 1_000;

/// Headline spend figures for a set of subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTotals {
    /// Monthly costs of monthly-billed subscriptions.
    pub monthly_direct_cents: i64,
    /// Yearly costs of yearly-billed subscriptions.
    pub yearly_direct_cents: i64,
    /// Monthly spend with yearly costs spread over 12 months.
    pub total_monthly_cents: i64,
    pub total_yearly_cents: i64,
    pub subscription_count: usize,
}

/// Sum what the given subscriptions cost per month and per year.
///
/// Yearly-billed costs are summed first and then spread over 12 months,
/// rounding half up.
#[must_use]
pub fn compute_dashboard_totals(subscriptions: &[Subscription]) -> DashboardTotals {
    let mut totals = DashboardTotals {
        subscription_count: subscriptions.len(),
        ..DashboardTotals::default()
    };
    for sub in subscriptions {
        match sub.billing_cycle {
            BillingCycle::Monthly => {
                totals.monthly_direct_cents = totals
                    .monthly_direct_cents
                    .saturating_add(sub.monthly_cost_cents.unwrap_or(0));
            }
            BillingCycle::Yearly => {
                totals.yearly_direct_cents = totals
                    .yearly_direct_cents
                    .saturating_add(sub.yearly_cost_cents.unwrap_or(0));
            }
        }
    }

    let yearly = totals.yearly_direct_cents;
    let spread = yearly.div_euclid(12) + i64::from(yearly.rem_euclid(12) >= 6);
    totals.total_monthly_cents = totals.monthly_direct_cents.saturating_add(spread);
    totals.total_yearly_cents = totals.total_monthly_cents.saturating_mul(12);
    totals
}

/// A subscription whose monthly equivalent reached the high-cost threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighCostSubscription<'a> {
    pub subscription: &'a Subscription,
    pub monthly_equivalent_cents: i64,
    /// Yearly savings from switching cycle, 0 when unknown.
    pub potential_savings_cents: i64,
}

/// Subscriptions costing at least `threshold_cents` per month, most
/// expensive first.
#[must_use]
pub fn find_high_cost_subscriptions(
    subscriptions: &[Subscription],
    threshold_cents: i64,
) -> Vec<HighCostSubscription<'_>> {
    let mut found: Vec<_> = subscriptions
        .iter()
        .map(|subscription| HighCostSubscription {
            subscription,
            monthly_equivalent_cents: monthly_equivalent_cents(subscription),
            potential_savings_cents: yearly_savings(subscription),
        })
        .filter(|h| h.monthly_equivalent_cents >= threshold_cents)
        .collect();
    found.sort_by(|a, b| b.monthly_equivalent_cents.cmp(&a.monthly_equivalent_cents));
    found
}

/// A subscription that would be cheaper on the other billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavingsOpportunity<'a> {
    pub subscription: &'a Subscription,
    pub current_cycle: BillingCycle,
    pub recommended_cycle: BillingCycle,
    pub yearly_savings_cents: i64,
}

/// Subscriptions that save money by switching cycle, largest saving first.
#[must_use]
pub fn find_savings_opportunities(subscriptions: &[Subscription]) -> Vec<SavingsOpportunity<'_>> {
    let mut found: Vec<_> = subscriptions
        .iter()
        .filter_map(|subscription| {
            let savings = potential_savings_cents(subscription)?;
            (savings.yearly_savings_cents > 0).then_some(SavingsOpportunity {
                subscription,
                current_cycle: subscription.billing_cycle,
                recommended_cycle: savings.switch_to,
                yearly_savings_cents: savings.yearly_savings_cents,
            })
        })
        .collect();
    found.sort_by(|a, b| b.yearly_savings_cents.cmp(&a.yearly_savings_cents));
    found
}

/// Billing-cycle mix and savings potential of a set of subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioOptimization {
    /// Sum of monthly equivalents.
    pub total_monthly_cents: i64,
    pub total_yearly_cents: i64,
    /// Net yearly savings from switching every subscription's cycle.
    /// Subscriptions that would cost more pull this down.
    pub total_potential_savings_cents: i64,
    pub monthly_count: usize,
    pub yearly_count: usize,
    /// Potential savings relative to the monthly total, in percent.
    pub optimization_percentage: f64,
    pub recommendations: Vec<String>,
}

fn format_dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}

/// Summarize the portfolio and suggest billing-cycle changes.
#[must_use]
pub fn calculate_portfolio_optimization(subscriptions: &[Subscription]) -> PortfolioOptimization {
    let mut total_monthly_cents = 0i64;
    let mut total_potential_savings_cents = 0i64;
    let mut monthly_count = 0usize;
    let mut yearly_count = 0usize;

    for sub in subscriptions {
        total_monthly_cents = total_monthly_cents.saturating_add(monthly_equivalent_cents(sub));
        total_potential_savings_cents =
            total_potential_savings_cents.saturating_add(yearly_savings(sub));
        match sub.billing_cycle {
            BillingCycle::Monthly => monthly_count += 1,
            BillingCycle::Yearly => yearly_count += 1,
        }
    }

    let optimization_percentage = if total_monthly_cents > 0 {
        total_potential_savings_cents as f64 / total_monthly_cents as f64 * 100.0
    } else {
        0.0
    };

    let mut recommendations = Vec::new();
    if total_potential_savings_cents > NOTABLE_SAVINGS_CENTS {
        recommendations.push(format!(
            "Potential savings of {} available through billing cycle optimization",
            format_dollars(total_potential_savings_cents)
        ));
    }
    if monthly_count > yearly_count.saturating_mul(2) {
        recommendations
            .push("Consider switching more subscriptions to yearly billing for better rates".to_string());
    } else if yearly_count > monthly_count.saturating_mul(2) {
        recommendations.push(
            "Some yearly subscriptions might benefit from monthly billing for flexibility".to_string(),
        );
    }
    if total_potential_savings_cents < NEGLIGIBLE_SAVINGS_CENTS {
        recommendations.push("Current billing cycles appear well-optimized".to_string());
    }

    PortfolioOptimization {
        total_monthly_cents,
        total_yearly_cents: total_monthly_cents.saturating_mul(12),
        total_potential_savings_cents,
        monthly_count,
        yearly_count,
        optimization_percentage,
        recommendations,
    }
}
