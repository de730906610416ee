//! Numeric value generators.

use rand::Rng;
use rust_decimal::Decimal;

/// Draw a value uniformly from `[min, max]` and round it to cents.
///
/// Rounding is half away from zero on the value scaled by 100. The result
/// always has a scale of exactly 2, so `42.5` comes back as `42.50`.
pub fn generate_money<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> Decimal {
    let raw = rng.gen_range(min..=max);
    let cents = (raw * 100.0).round() as i64;
    Decimal::new(cents, 2)
}

/// Draw a value uniformly from `[min, max]` seconds.
///
/// Equal bounds are allowed and always yield `min`.
pub fn generate_f64_range<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if min >= max {
        min
    } else {
        rng.gen_range(min..=max)
    }
}
