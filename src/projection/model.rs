//! Shared interface for anything producing or valuing time-indexed cashflows

use crate::assumptions::DiscountCurve;
use crate::error::ModelError;
use crate::matrix::Matrix;

/// Spread applied on top of the curve's zero rates when discounting.
#[derive(Debug, Clone)]
pub enum Spread {
    /// One spread for every policy
    Flat(f64),
    /// One spread per policy column
    PerPolicy(Vec<f64>),
}

impl Spread {
    pub fn zero() -> Self {
        Spread::Flat(0.0)
    }

    /// Expand to one spread per policy, checking vector length.
    pub fn resolve(&self, num_policies: usize) -> Result<Vec<f64>, ModelError> {
        match self {
            Spread::Flat(s) => Ok(vec![*s; num_policies]),
            Spread::PerPolicy(spreads) => {
                if spreads.len() != num_policies {
                    return Err(ModelError::Input(format!(
                        "spread vector ({}) does not match policy count ({})",
                        spreads.len(),
                        num_policies
                    )));
                }
                Ok(spreads.clone())
            }
        }
    }
}

impl Default for Spread {
    fn default() -> Self {
        Spread::zero()
    }
}

impl From<f64> for Spread {
    fn from(s: f64) -> Self {
        Spread::Flat(s)
    }
}

/// A model projecting cashflows onto an integer timeline and valuing them
/// against a discount curve.
///
/// The cashflow matrix is rows = time steps of `times()`, columns = policies,
/// zero-filled outside each policy's valid window. Matrices are computed per
/// call and owned by the caller; nothing is cached across calls.
pub trait CashflowModel {
    /// Projection timeline, ascending
    fn times(&self) -> &[u32];

    /// Curve used for discounting
    fn curve(&self) -> &DiscountCurve;

    /// Number of policy columns
    fn num_policies(&self) -> usize;

    /// Project the full time x policy cashflow matrix
    fn project_cashflows(&self) -> Result<Matrix, ModelError>;

    /// Aggregate cashflow per time step (row sums of the matrix)
    fn aggregate_cashflows(&self) -> Result<Vec<f64>, ModelError> {
        Ok(self.project_cashflows()?.row_sums())
    }

    /// Present value per policy: sum over time of discount factor times
    /// cashflow, discounted through the curve only.
    fn present_value(&self, spread: &Spread) -> Result<Vec<f64>, ModelError> {
        let cf = self.project_cashflows()?;
        let spreads = spread.resolve(self.num_policies())?;
        let df = self.curve().discount_factor_matrix(self.times(), &spreads);

        let mut pv = vec![0.0; self.num_policies()];
        for r in 0..cf.rows() {
            for (j, value) in pv.iter_mut().enumerate() {
                *value += df.get(r, j) * cf.get(r, j);
            }
        }
        Ok(pv)
    }

    /// Present value summed across policies
    fn aggregate_present_value(&self, spread: &Spread) -> Result<f64, ModelError> {
        Ok(self.present_value(spread)?.iter().sum())
    }
}

/// Row index of time `t` on a timeline, if present
pub(crate) fn row_of(times: &[u32], t: u32) -> Option<usize> {
    times.binary_search(&t).ok()
}
