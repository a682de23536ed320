//! Per-visit value metrics.

/// Average value per visit.
///
/// Returns `0.0` when `total_visits` is zero or when the quotient is not
/// finite, so callers never see `NaN` or infinity.
pub fn average_value(total_value: f64, total_visits: f64) -> f64 {
    if total_visits == 0.0 {
        return 0.0;
    }
    let avg = total_value / total_visits;
    if avg.is_finite() {
        avg
    } else {
        0.0
    }
}
