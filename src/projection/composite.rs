//! Aggregation of multiple cashflow projectors into one product valuation
//!
//! Members share one curve and one policy population; the composite timeline
//! is the sorted, deduplicated union of member timelines, and the composite
//! matrix is the elementwise sum with zero-padding for times a member does
//! not cover.

use std::sync::Arc;

use crate::assumptions::DiscountCurve;
use crate::error::ModelError;
use crate::matrix::Matrix;
use crate::projection::model::{row_of, CashflowModel, Spread};

/// Ordered list of projectors valued as one product.
///
/// `present_value` discounts the summed cashflow matrix; it must agree with
/// the sum of member present values (`sum_member_present_values`) to floating
/// tolerance - both aggregation paths are exposed so the equivalence stays
/// regression-tested.
pub struct CompositeValuationEngine {
    components: Vec<Box<dyn CashflowModel>>,
    curve: Arc<DiscountCurve>,
    times: Vec<u32>,
    num_policies: usize,
}

impl std::fmt::Debug for CompositeValuationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeValuationEngine")
            .field("components", &self.components.len())
            .field("curve", &self.curve)
            .field("times", &self.times)
            .field("num_policies", &self.num_policies)
            .finish()
    }
}

impl CompositeValuationEngine {
    pub fn new(
        components: Vec<Box<dyn CashflowModel>>,
        curve: Arc<DiscountCurve>,
    ) -> Result<Self, ModelError> {
        if components.is_empty() {
            return Err(ModelError::Input(
                "composite requires at least one component".into(),
            ));
        }

        let num_policies = components[0].num_policies();
        if components.iter().any(|c| c.num_policies() != num_policies) {
            return Err(ModelError::Input(
                "composite components must share one policy population".into(),
            ));
        }

        let mut times: Vec<u32> = components.iter().flat_map(|c| c.times().to_vec()).collect();
        times.sort_unstable();
        times.dedup();

        Ok(Self {
            components,
            curve,
            times,
            num_policies,
        })
    }

    /// Present value as the sum of member present values (the second
    /// aggregation path; see the type-level invariant).
    pub fn sum_member_present_values(&self, spread: &Spread) -> Result<Vec<f64>, ModelError> {
        let mut total = vec![0.0; self.num_policies];
        for component in &self.components {
            for (sum, pv) in total.iter_mut().zip(component.present_value(spread)?) {
                *sum += pv;
            }
        }
        Ok(total)
    }
}

impl CashflowModel for CompositeValuationEngine {
    fn times(&self) -> &[u32] {
        &self.times
    }

    fn curve(&self) -> &DiscountCurve {
        &self.curve
    }

    fn num_policies(&self) -> usize {
        self.num_policies
    }

    fn project_cashflows(&self) -> Result<Matrix, ModelError> {
        let mut out = Matrix::zeros(self.times.len(), self.num_policies);
        for component in &self.components {
            let member = component.project_cashflows()?;
            for (src_row, &t) in component.times().iter().enumerate() {
                // Union timeline always contains every member time
                if let Some(dst_row) = row_of(&self.times, t) {
                    out.add_row_from(dst_row, &member, src_row);
                }
            }
        }
        Ok(out)
    }
}
