//! Error types shared across the valuation and pricing components

use thiserror::Error;

/// Failure modes of the valuation core.
///
/// Every failure is a deterministic function of the inputs; re-invoking with
/// the same arguments reproduces the same error. Out-of-range age/duration/time
/// lookups are NOT errors - they clamp to the table boundary (the one
/// documented silent correction).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Construction-time rule violation in a table or curve. Never auto-corrected.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unequal-length parallel arrays (or a missing required column) passed to
    /// a projector, batch, or query.
    #[error("input mismatch: {0}")]
    Input(String),

    /// Unrecognized configuration value (expense basis/timing, product kind,
    /// premium type). Never defaulted.
    #[error("unrecognized configuration value: {0}")]
    Configuration(String),

    /// Zero or negative premium-annuity denominator in the premium solver:
    /// expenses exceed the premium-paying capacity of the policy.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}
