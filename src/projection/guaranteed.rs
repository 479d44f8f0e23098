//! Guaranteed (deterministic) cashflow projection
//!
//! Coupon each year through maturity plus principal at maturity; no mortality
//! dependency. Present here for interface symmetry with the contingent
//! projectors and for bond-like asset positions.

use std::sync::Arc;

use crate::assumptions::DiscountCurve;
use crate::error::ModelError;
use crate::matrix::Matrix;
use crate::projection::model::{CashflowModel, Spread};

/// Projector for guaranteed coupon-plus-principal streams.
#[derive(Debug, Clone)]
pub struct GuaranteedCashflow {
    curve: Arc<DiscountCurve>,
    notionals: Vec<f64>,
    coupon_rates: Vec<f64>,
    maturities: Vec<u32>,
    /// Position-level spreads, used as the default valuation spread
    spreads: Vec<f64>,
    times: Vec<u32>,
}

impl GuaranteedCashflow {
    pub fn new(
        curve: Arc<DiscountCurve>,
        notionals: &[f64],
        coupon_rates: &[f64],
        maturities: &[u32],
    ) -> Result<Self, ModelError> {
        if notionals.len() != coupon_rates.len() || notionals.len() != maturities.len() {
            return Err(ModelError::Input(format!(
                "notionals ({}), coupon rates ({}) and maturities ({}) must have the same length",
                notionals.len(),
                coupon_rates.len(),
                maturities.len()
            )));
        }

        let max_maturity = maturities.iter().copied().max().unwrap_or(0);
        Ok(Self {
            curve,
            notionals: notionals.to_vec(),
            coupon_rates: coupon_rates.to_vec(),
            maturities: maturities.to_vec(),
            spreads: vec![0.0; notionals.len()],
            times: (1..=max_maturity).collect(),
        })
    }

    /// Position-level valuation spreads
    pub fn with_spreads(mut self, spreads: &[f64]) -> Result<Self, ModelError> {
        if spreads.len() != self.notionals.len() {
            return Err(ModelError::Input(format!(
                "spreads ({}) must match position count ({})",
                spreads.len(),
                self.notionals.len()
            )));
        }
        self.spreads = spreads.to_vec();
        Ok(self)
    }

    /// Replace the default 1..=max(maturity) timeline
    pub fn with_projection_steps(mut self, times: Vec<u32>) -> Self {
        self.times = times;
        self
    }

    /// Present value at each position's own spread
    pub fn present_value_at_position_spreads(&self) -> Result<Vec<f64>, ModelError> {
        self.present_value(&Spread::PerPolicy(self.spreads.clone()))
    }
}

impl CashflowModel for GuaranteedCashflow {
    fn times(&self) -> &[u32] {
        &self.times
    }

    fn curve(&self) -> &DiscountCurve {
        &self.curve
    }

    fn num_policies(&self) -> usize {
        self.notionals.len()
    }

    fn project_cashflows(&self) -> Result<Matrix, ModelError> {
        let n = self.num_policies();
        let mut cf = Matrix::zeros(self.times.len(), n);

        for (r, &t) in self.times.iter().enumerate() {
            if t < 1 {
                continue;
            }
            for j in 0..n {
                let maturity = self.maturities[j];
                if t <= maturity {
                    cf.add_at(r, j, self.notionals[j] * self.coupon_rates[j]);
                }
                if t == maturity {
                    cf.add_at(r, j, self.notionals[j]);
                }
            }
        }
        Ok(cf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn curve() -> Arc<DiscountCurve> {
        Arc::new(DiscountCurve::flat(0.04, 20, "flat 4%").unwrap())
    }

    #[test]
    fn test_coupon_and_principal_rows() {
        let model = GuaranteedCashflow::new(curve(), &[100.0, 50.0], &[0.05, 0.02], &[3, 5])
            .unwrap();

        let cf = model.project_cashflows().unwrap();
        assert_eq!((cf.rows(), cf.cols()), (5, 2));

        // Position 0: coupons years 1-2, coupon + principal year 3, nothing after
        assert_eq!(cf.get(0, 0), 5.0);
        assert_eq!(cf.get(1, 0), 5.0);
        assert_eq!(cf.get(2, 0), 105.0);
        assert_eq!(cf.get(3, 0), 0.0);

        // Position 1: coupons through year 4, redemption year 5
        assert_eq!(cf.get(3, 1), 1.0);
        assert_eq!(cf.get(4, 1), 51.0);
    }

    #[test]
    fn test_present_value_matches_closed_form() {
        let model = GuaranteedCashflow::new(curve(), &[100.0], &[0.04], &[10]).unwrap();

        // A 4% bond discounted at a flat 4% curve prices at par
        let pv = model.aggregate_present_value(&Spread::zero()).unwrap();
        assert_abs_diff_eq!(pv, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_position_spreads_default() {
        let model = GuaranteedCashflow::new(curve(), &[100.0, 100.0], &[0.04, 0.04], &[5, 5])
            .unwrap()
            .with_spreads(&[0.0, 0.02])
            .unwrap();

        let pv = model.present_value_at_position_spreads().unwrap();
        assert_abs_diff_eq!(pv[0], 100.0, epsilon = 1e-9);
        assert!(pv[1] < pv[0]);
    }

    #[test]
    fn test_length_mismatch() {
        let err = GuaranteedCashflow::new(curve(), &[100.0], &[0.05, 0.02], &[3, 5]).unwrap_err();
        assert!(matches!(err, ModelError::Input(_)));
    }
}
