//! Shared primitive types used across the analytics core.

/// Canonical entity code as found in the advisor registry.
pub type EntityCode = String;

/// Policy number exactly as supplied by the record store.
pub type PolicyNumber = String;

/// Coarse product classification ("ramo").
pub type Category = String;

/// Advisor used for policies whose entity cannot be resolved.
pub const UNASSIGNED_ADVISOR: &str = "Sin Asesor";

/// Production period as (year, month).
pub type Period = (i32, u32);

/// The calendar month immediately before `period`.
pub fn previous_period((year, month): Period) -> Period {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Signed month distance from `from` to `to`.
pub fn months_between((fy, fm): Period, (ty, tm): Period) -> i64 {
    (ty as i64 - fy as i64) * 12 + (tm as i64 - fm as i64)
}

/// Ratio with an explicit fallback when the denominator is zero.
pub fn ratio_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        fallback
    } else {
        numerator / denominator
    }
}
