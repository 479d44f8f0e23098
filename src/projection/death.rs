//! Death-contingent cashflow projection
//!
//! Pays a single amount in the year of death, weighted by the death-in-year
//! probability, restricted to years [1, term].

use std::sync::Arc;

use crate::assumptions::{DiscountCurve, MortalityTable};
use crate::error::ModelError;
use crate::matrix::Matrix;
use crate::projection::model::CashflowModel;

/// Projector for death-contingent benefit streams.
#[derive(Debug, Clone)]
pub struct DeathContingentCashflow {
    curve: Arc<DiscountCurve>,
    mortality: Arc<MortalityTable>,
    ages: Vec<u32>,
    terms: Vec<u32>,
    amounts: Vec<f64>,
    escalation: f64,
    times: Vec<u32>,
}

impl DeathContingentCashflow {
    pub fn new(
        curve: Arc<DiscountCurve>,
        mortality: Arc<MortalityTable>,
        ages: &[u32],
        terms: &[Option<u32>],
        amounts: &[f64],
    ) -> Result<Self, ModelError> {
        if ages.len() != terms.len() || ages.len() != amounts.len() {
            return Err(ModelError::Input(format!(
                "ages ({}), terms ({}) and amounts ({}) must have the same length",
                ages.len(),
                terms.len(),
                amounts.len()
            )));
        }

        let resolved: Vec<u32> = ages
            .iter()
            .zip(terms)
            .map(|(&age, term)| term.unwrap_or_else(|| mortality.remaining_lifetime(age)))
            .collect();
        let max_term = resolved.iter().copied().max().unwrap_or(0);

        Ok(Self {
            curve,
            mortality,
            ages: ages.to_vec(),
            terms: resolved,
            amounts: amounts.to_vec(),
            escalation: 0.0,
            times: (1..=max_term).collect(),
        })
    }

    /// Unit death benefit for every policy (expense incidence factors)
    pub fn unit(
        curve: Arc<DiscountCurve>,
        mortality: Arc<MortalityTable>,
        ages: &[u32],
        terms: &[Option<u32>],
    ) -> Result<Self, ModelError> {
        let amounts = vec![1.0; ages.len()];
        Self::new(curve, mortality, ages, terms, &amounts)
    }

    /// Geometric escalation rate applied as (1 + rate)^elapsed
    pub fn with_escalation(mut self, rate: f64) -> Self {
        self.escalation = rate;
        self
    }

    /// Replace the default 1..=max(term) timeline
    pub fn with_projection_steps(mut self, times: Vec<u32>) -> Self {
        self.times = times;
        self
    }

    pub fn terms(&self) -> &[u32] {
        &self.terms
    }
}

impl CashflowModel for DeathContingentCashflow {
    fn times(&self) -> &[u32] {
        &self.times
    }

    fn curve(&self) -> &DiscountCurve {
        &self.curve
    }

    fn num_policies(&self) -> usize {
        self.ages.len()
    }

    fn project_cashflows(&self) -> Result<Matrix, ModelError> {
        let n = self.num_policies();
        let mut cf = Matrix::zeros(self.times.len(), n);

        let path = self.mortality.death_path(&self.ages, &self.terms)?;
        for (r, &t) in self.times.iter().enumerate() {
            if t < 1 || t as usize > path.rows() {
                continue;
            }
            for j in 0..n {
                cf.set(r, j, self.amounts[j] * path.get(t as usize - 1, j));
            }
        }

        if self.escalation != 0.0 {
            for (r, &t) in self.times.iter().enumerate() {
                cf.scale_row(r, (1.0 + self.escalation).powi(t as i32));
            }
        }

        Ok(cf)
    }
}
