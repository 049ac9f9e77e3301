//! Derived epidemiological ratios.
//!
//! Every ratio here guards its denominator explicitly, so no caller ever sees
//! `NaN` or an infinity.

/// Round `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Case fatality rate: deaths per hundred cases, two decimals.
///
/// Returns 0 when there are no cases.
pub fn fatality_rate(deaths: u64, cases: u64) -> f64 {
    if cases == 0 {
        return 0.0;
    }
    round_to(deaths as f64 / cases as f64 * 100.0, 2)
}

/// Year-over-year percent change, one decimal.
///
/// `None` when the previous total is zero, i.e. there is no baseline.
pub fn percent_change(current: u64, previous: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    let delta = current as f64 - previous as f64;
    Some(round_to(delta / previous as f64 * 100.0, 1))
}
