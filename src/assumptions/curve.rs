//! Discount curve built from a zero-rate term structure
//!
//! Supports:
//! - Scalar lookups (zero rate, discount factor at a time)
//! - Spread adjustments, flat or per policy
//! - Vectorized discount factors over a projection timeline
//!
//! All present-value code in the crate discounts through this component; no
//! caller recomputes discount factors locally.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::matrix::Matrix;

/// Immutable zero curve over integer times 1..=max, no gaps.
///
/// Discount factor at time t with spread s is `(1 + zero(t) + s)^-t`. Times
/// outside the tabulated range use the boundary zero rate (flat
/// extrapolation), matching the boundary-clamp policy of mortality lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCurve {
    /// Tabulated times, contiguous integers starting at 1
    times: Vec<u32>,

    /// Annualized spot zero rate per time point
    zero_rates: Vec<f64>,

    /// Curve name, e.g. "BoE spot"
    name: String,
}

impl DiscountCurve {
    /// Build a curve, validating that times are contiguous from 1 and match
    /// the rate array in length.
    pub fn new(
        times: Vec<u32>,
        zero_rates: Vec<f64>,
        name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        if times.is_empty() {
            return Err(ModelError::Validation("curve must not be empty".into()));
        }
        if times.len() != zero_rates.len() {
            return Err(ModelError::Validation(
                "times and zero rates must have the same length".into(),
            ));
        }
        if times[0] != 1 {
            return Err(ModelError::Validation("curve times must start at 1".into()));
        }
        if !times.windows(2).all(|w| w[1] == w[0] + 1) {
            return Err(ModelError::Validation(
                "curve times must be contiguous with no gaps".into(),
            ));
        }

        Ok(Self {
            times,
            zero_rates,
            name: name.into(),
        })
    }

    /// Flat curve at a single rate out to `max_time`
    pub fn flat(rate: f64, max_time: u32, name: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(
            (1..=max_time).collect(),
            vec![rate; max_time as usize],
            name,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_time(&self) -> u32 {
        self.times[0]
    }

    pub fn max_time(&self) -> u32 {
        *self.times.last().unwrap()
    }

    /// Zero rate at time t, boundary-clamped
    pub fn zero_rate(&self, t: u32) -> f64 {
        let idx = (t.clamp(self.min_time(), self.max_time()) - self.min_time()) as usize;
        self.zero_rates[idx]
    }

    /// Discount factor at time t with no spread
    pub fn discount_factor(&self, t: u32) -> f64 {
        self.discount_factor_with_spread(t, 0.0)
    }

    /// Discount factor at time t with an additive spread on the zero rate.
    /// The exponent is the actual time, so times past the curve keep
    /// discounting at the boundary rate.
    pub fn discount_factor_with_spread(&self, t: u32, spread: f64) -> f64 {
        (1.0 + self.zero_rate(t) + spread).powi(-(t as i32))
    }

    /// Discount factors over a timeline at one flat spread
    pub fn discount_factors(&self, times: &[u32], spread: f64) -> Vec<f64> {
        times
            .iter()
            .map(|&t| self.discount_factor_with_spread(t, spread))
            .collect()
    }

    /// Discount factor matrix for a timeline against per-policy spreads:
    /// rows = times, columns = spreads.
    pub fn discount_factor_matrix(&self, times: &[u32], spreads: &[f64]) -> Matrix {
        let mut out = Matrix::zeros(times.len(), spreads.len());
        for (r, &t) in times.iter().enumerate() {
            for (c, &s) in spreads.iter().enumerate() {
                out.set(r, c, self.discount_factor_with_spread(t, s));
            }
        }
        out
    }
}
