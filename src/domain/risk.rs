//! Risk/reward metrics derived from entry, target, and stop-loss prices.
//!
//! Pure functions with no subscription machinery: callers re-invoke
//! [`risk_reward`] whenever any of the three inputs changes, so the ratio is
//! never computed from stale values.

/// Rendered in place of a ratio that is undefined (zero sentinel).
pub const UNDEFINED_MARKER: &str = "-";

/// Ratio of potential profit to potential loss, rounded to 2 decimal places.
///
/// Returns the 0.0 "undefined" sentinel when any input is unset (≤ 0) or the
/// potential loss is zero; callers must render that as [`UNDEFINED_MARKER`],
/// never as `1:0`.
pub fn risk_reward(entry_price: f64, target_price: f64, stop_loss: f64) -> f64 {
    if !entry_price.is_finite() || !target_price.is_finite() || !stop_loss.is_finite() {
        return 0.0;
    }
    if entry_price <= 0.0 || target_price <= 0.0 || stop_loss <= 0.0 {
        return 0.0;
    }

    let potential_profit = (target_price - entry_price).abs();
    let potential_loss = (entry_price - stop_loss).abs();
    if potential_loss < f64::EPSILON {
        return 0.0;
    }

    let ratio = potential_profit / potential_loss;
    (ratio * 100.0).round() / 100.0
}

/// Presentation form: `1:2.0` for a ratio of 2.00, `-` when undefined.
pub fn format_risk_reward(ratio: f64) -> String {
    if !ratio.is_finite() || ratio <= 0.0 {
        return UNDEFINED_MARKER.to_string();
    }
    let text = format!("{ratio:.2}");
    let text = text.strip_suffix('0').unwrap_or(&text);
    format!("1:{text}")
}
