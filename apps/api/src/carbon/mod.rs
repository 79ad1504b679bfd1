// Carbon accounting: static factor table and the pure calculator built on it.
// Nothing in here performs I/O.

pub mod calculator;
pub mod factors;

pub use calculator::{CalculationResult, CarbonCalculator};
pub use factors::{Category, EmissionFactorTable};

/// Rounds to two decimal places, the precision every emission figure is reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `round2(quantity × factor)`, or `None` when the result is not a finite number.
pub fn emission(quantity: f64, factor: f64) -> Option<f64> {
    let total = round2(quantity * factor);
    total.is_finite().then_some(total)
}
