//! User-visible numeric formatting.
//!
//! Averages are shown with one decimal place and blood pressures as whole numbers. Both round
//! halves upward (towards positive infinity), which differs from the round-half-to-even that
//! `format!("{:.1}")` applies to exact ties.

/// Formats `value` with exactly one fractional digit, rounding exact ties upward.
pub fn fixed1(value: f64) -> String {
    if !value.is_finite() {
        return format!("{:.1}", value);
    }

    // Multiplying by a power of two is exact, so this detects values whose
    // tenths digit sits exactly on a .x5 boundary (m.25, m.75, ...).
    let is_exact_tie = (value * 4.0).fract() == 0.0 && (value * 2.0).fract() != 0.0;
    if is_exact_tie {
        let scaled = (value * 10.0 + 0.5).floor();
        return format!("{:.1}", scaled / 10.0);
    }

    format!("{:.1}", value)
}

/// Rounds to the nearest integer, with exact halves going towards positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded as i64
}
