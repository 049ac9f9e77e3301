//! Seasonal monthly distribution.
//!
//! Case records rarely carry a real month, so a year's totals are spread over
//! the calendar with a fixed wet/dry-season profile for Indonesia. Output of
//! this module is always tagged [`MonthlySeries::Estimated`].

use crate::models::{MonthlyPoint, MonthlySeries};

/// Short month labels, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Relative dengue activity per month. Peaks in July.
const SEASONAL_PROFILE: [f64; 12] = [
    0.06, 0.07, 0.08, 0.09, 0.10, 0.11, 0.12, 0.10, 0.09, 0.08, 0.07, 0.05,
];

/// Monthly weights, normalised so they sum to exactly 1.0.
///
/// The raw profile adds up to 1.02; scaling keeps its shape while making the
/// monthly estimates add back up to the yearly total.
pub fn seasonal_weights() -> [f64; 12] {
    let sum: f64 = SEASONAL_PROFILE.iter().sum();
    SEASONAL_PROFILE.map(|w| w / sum)
}

/// Label for a 1-based month number, or `"?"` when out of range.
pub fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_LABELS.get(idx as usize))
        .copied()
        .unwrap_or("?")
}

/// Spread a year's cases and deaths across twelve months.
///
/// Each month gets `round(total * weight)` with the normalised weights from
/// [`seasonal_weights`], so every month sits about 2% below the raw profile
/// share: 10 000 cases put 588 in January rather than 600. The fatality rate
/// is the yearly rate carried through unchanged, not recomputed per month.
pub fn estimate_monthly(total_cases: u64, total_deaths: u64, fatality_rate: f64) -> MonthlySeries {
    let points = seasonal_weights()
        .iter()
        .enumerate()
        .map(|(idx, weight)| MonthlyPoint {
            month: idx as u32 + 1,
            label: MONTH_LABELS[idx].to_string(),
            cases: (total_cases as f64 * weight).round() as u64,
            deaths: (total_deaths as f64 * weight).round() as u64,
            fatality_rate,
        })
        .collect();

    MonthlySeries::Estimated(points)
}
