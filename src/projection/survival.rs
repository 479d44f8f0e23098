//! Survival-contingent cashflow projection
//!
//! Pays a periodic amount each year the policy is confirmed in force and/or a
//! terminal amount at the policy's own term, each weighted by the survival
//! probability to that point. Both components support geometric escalation.

use std::sync::Arc;

use crate::assumptions::{DiscountCurve, MortalityTable};
use crate::error::ModelError;
use crate::matrix::Matrix;
use crate::projection::model::{row_of, CashflowModel};

/// Projector for survival-contingent benefit streams.
///
/// Policies with an open-ended (None) term run the mortality table to
/// extinction. Input slices are copied on ingest; caller-owned storage is
/// never mutated.
#[derive(Debug, Clone)]
pub struct SurvivalContingentCashflow {
    curve: Arc<DiscountCurve>,
    mortality: Arc<MortalityTable>,
    ages: Vec<u32>,
    terms: Vec<u32>,
    periodic_amounts: Option<Vec<f64>>,
    terminal_amounts: Option<Vec<f64>>,
    escalation: f64,
    times: Vec<u32>,
}

impl SurvivalContingentCashflow {
    pub fn new(
        curve: Arc<DiscountCurve>,
        mortality: Arc<MortalityTable>,
        ages: &[u32],
        terms: &[Option<u32>],
    ) -> Result<Self, ModelError> {
        if ages.len() != terms.len() {
            return Err(ModelError::Input(format!(
                "ages ({}) and terms ({}) must have the same length",
                ages.len(),
                terms.len()
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
            periodic_amounts: None,
            terminal_amounts: None,
            escalation: 0.0,
            times: (1..=max_term).collect(),
        })
    }

    /// Periodic payment per policy, paid each year 1..=term in force
    pub fn with_periodic_amounts(mut self, amounts: &[f64]) -> Result<Self, ModelError> {
        self.check_amounts(amounts, "periodic amounts")?;
        self.periodic_amounts = Some(amounts.to_vec());
        Ok(self)
    }

    /// Terminal payment per policy, paid at each policy's own term on survival
    pub fn with_terminal_amounts(mut self, amounts: &[f64]) -> Result<Self, ModelError> {
        self.check_amounts(amounts, "terminal amounts")?;
        self.terminal_amounts = Some(amounts.to_vec());
        Ok(self)
    }

    /// Geometric escalation rate applied as (1 + rate)^elapsed
    pub fn with_escalation(mut self, rate: f64) -> Self {
        self.escalation = rate;
        self
    }

    /// Replace the default 1..=max(term) timeline (rows may start at 0)
    pub fn with_projection_steps(mut self, times: Vec<u32>) -> Self {
        self.times = times;
        self
    }

    pub fn terms(&self) -> &[u32] {
        &self.terms
    }

    fn check_amounts(&self, amounts: &[f64], what: &str) -> Result<(), ModelError> {
        if amounts.len() != self.ages.len() {
            return Err(ModelError::Input(format!(
                "{} ({}) must match policy count ({})",
                what,
                amounts.len(),
                self.ages.len()
            )));
        }
        Ok(())
    }
}

impl CashflowModel for SurvivalContingentCashflow {
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

        if let Some(periodic) = &self.periodic_amounts {
            let path = self.mortality.survival_path(&self.ages, &self.terms)?;
            for (r, &t) in self.times.iter().enumerate() {
                if t < 1 || t as usize > path.rows() {
                    continue;
                }
                for j in 0..n {
                    cf.add_at(r, j, periodic[j] * path.get(t as usize - 1, j));
                }
            }
        }

        if let Some(terminal) = &self.terminal_amounts {
            let survival = self
                .mortality
                .survival_probability(&self.ages, &self.terms)?;
            for j in 0..n {
                if let Some(r) = row_of(&self.times, self.terms[j]) {
                    cf.add_at(r, j, terminal[j] * survival[j]);
                }
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
