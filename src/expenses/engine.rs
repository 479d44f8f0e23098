//! Expense allocation engine
//!
//! Each (policy x expense line) pair gets an incidence factor: the present
//! value of a unit expense with the line's timing, inflated at the engine's
//! expense inflation rate. Expense PV is then factor x amount, or
//! factor x amount x premium for percent-of-premium lines. The factors reuse
//! the contingent projectors with unit amounts; nothing here discounts or
//! projects on its own.
//!
//! Grouping and pivoting of results is presentation-layer work and stays out
//! of this engine; it returns per-policy totals and per-line columns only.

use std::sync::Arc;

use log::debug;

use crate::assumptions::{DiscountCurve, MortalityTable};
use crate::error::ModelError;
use crate::policy::PolicyBatch;
use crate::projection::{CashflowModel, DeathContingentCashflow, Spread, SurvivalContingentCashflow};
use crate::products::ProductKind;

use super::spec::{ExpenseBasis, ExpenseLine, ExpenseTiming};

/// Per-policy expense totals split by basis.
///
/// `pct_premium_factor` is computed at a unit premium, so it is the
/// multiplier the premium solver subtracts from the annuity factor.
#[derive(Debug, Clone)]
pub struct ExpenseFactors {
    /// PV of fixed per-policy expenses
    pub per_policy_pv: Vec<f64>,

    /// PV of percent-of-premium expenses per unit of annual premium
    pub pct_premium_factor: Vec<f64>,
}

/// Aggregate expense cashflow stream for one spec line.
#[derive(Debug, Clone)]
pub struct ExpenseCashflowColumn {
    pub product: ProductKind,

    /// "description (TIMING)", following the spec table convention
    pub label: String,

    /// Aggregate flow per time step, times 0..=horizon
    pub flows: Vec<f64>,
}

/// Values expense lines against a policy batch.
pub struct ExpenseAllocationEngine {
    spec: Vec<ExpenseLine>,
    curve: Arc<DiscountCurve>,
    mortality: Arc<MortalityTable>,
    inflation_rate: f64,
}

impl ExpenseAllocationEngine {
    pub fn new(
        spec: Vec<ExpenseLine>,
        curve: Arc<DiscountCurve>,
        mortality: Arc<MortalityTable>,
        inflation_rate: f64,
    ) -> Self {
        Self {
            spec,
            curve,
            mortality,
            inflation_rate,
        }
    }

    pub fn spec(&self) -> &[ExpenseLine] {
        &self.spec
    }

    pub fn inflation_rate(&self) -> f64 {
        self.inflation_rate
    }

    /// Incidence factor per policy for one timing: the PV of a unit expense
    /// with that timing, inflation-escalated.
    pub fn incidence_factors(
        &self,
        timing: ExpenseTiming,
        ages: &[u32],
        terms: &[Option<u32>],
    ) -> Result<Vec<f64>, ModelError> {
        if ages.len() != terms.len() {
            return Err(ModelError::Input(format!(
                "ages ({}) and terms ({}) must have the same length",
                ages.len(),
                terms.len()
            )));
        }
        let units = vec![1.0; ages.len()];

        match timing {
            ExpenseTiming::Initial => Ok(units),
            ExpenseTiming::Renewal => {
                // Renewal expenses fall in years 1..term-1; the initial year
                // is covered by the INITIAL line.
                let renewal_terms: Vec<Option<u32>> = ages
                    .iter()
                    .zip(terms)
                    .map(|(&age, term)| {
                        Some(
                            term.unwrap_or_else(|| self.mortality.remaining_lifetime(age))
                                .saturating_sub(1),
                        )
                    })
                    .collect();
                SurvivalContingentCashflow::new(
                    Arc::clone(&self.curve),
                    Arc::clone(&self.mortality),
                    ages,
                    &renewal_terms,
                )?
                .with_periodic_amounts(&units)?
                .with_escalation(self.inflation_rate)
                .present_value(&Spread::zero())
            }
            ExpenseTiming::Maturity => SurvivalContingentCashflow::new(
                Arc::clone(&self.curve),
                Arc::clone(&self.mortality),
                ages,
                terms,
            )?
            .with_terminal_amounts(&units)?
            .with_escalation(self.inflation_rate)
            .present_value(&Spread::zero()),
            ExpenseTiming::Death => Ok(DeathContingentCashflow::unit(
                Arc::clone(&self.curve),
                Arc::clone(&self.mortality),
                ages,
                terms,
            )?
            .with_escalation(self.inflation_rate)
            .present_value(&Spread::zero())?),
        }
    }

    /// Per-policy expense PV totals split by basis, at a unit premium.
    pub fn expense_factors(&self, batch: &PolicyBatch) -> Result<ExpenseFactors, ModelError> {
        batch.validate()?;
        let n = batch.len();
        let mut per_policy_pv = vec![0.0; n];
        let mut pct_premium_factor = vec![0.0; n];

        for line in &self.spec {
            let indices = batch.indices_of(line.product);
            if indices.is_empty() {
                continue;
            }
            let ages: Vec<u32> = indices.iter().map(|&i| batch.ages[i]).collect();
            let terms: Vec<Option<u32>> = indices.iter().map(|&i| batch.terms[i]).collect();

            let factors = self.incidence_factors(line.timing, &ages, &terms)?;
            debug!(
                "expense line '{}' ({}): {} policies",
                line.description,
                line.timing.as_str(),
                indices.len()
            );

            for (k, &i) in indices.iter().enumerate() {
                match line.basis {
                    ExpenseBasis::PerPolicy => per_policy_pv[i] += factors[k] * line.amount,
                    ExpenseBasis::PctPremium => pct_premium_factor[i] += factors[k] * line.amount,
                }
            }
        }

        Ok(ExpenseFactors {
            per_policy_pv,
            pct_premium_factor,
        })
    }

    /// Per-policy total expense PV at known premiums. Falls back to the
    /// batch's premium column, then to unit premiums.
    pub fn present_value(
        &self,
        batch: &PolicyBatch,
        premiums: Option<&[f64]>,
    ) -> Result<Vec<f64>, ModelError> {
        let factors = self.expense_factors(batch)?;

        let premium_of = |i: usize| -> f64 {
            premiums
                .map(|p| p[i])
                .or_else(|| batch.annual_premiums.as_ref().map(|p| p[i]))
                .unwrap_or(1.0)
        };
        if let Some(premiums) = premiums {
            if premiums.len() != batch.len() {
                return Err(ModelError::Input(format!(
                    "premiums ({}) must match policy count ({})",
                    premiums.len(),
                    batch.len()
                )));
            }
        }

        Ok((0..batch.len())
            .map(|i| factors.per_policy_pv[i] + factors.pct_premium_factor[i] * premium_of(i))
            .collect())
    }

    /// Aggregate expense cashflow per line over times 0..=table span, for
    /// cashflow reporting. Lines with no matching policies are omitted.
    pub fn project_cashflows(
        &self,
        batch: &PolicyBatch,
    ) -> Result<Vec<ExpenseCashflowColumn>, ModelError> {
        batch.validate()?;
        let horizon = self.mortality.len() as u32;
        let times: Vec<u32> = (0..=horizon).collect();
        let mut columns = Vec::new();

        for line in &self.spec {
            let indices = batch.indices_of(line.product);
            if indices.is_empty() {
                continue;
            }
            let ages: Vec<u32> = indices.iter().map(|&i| batch.ages[i]).collect();
            let terms: Vec<Option<u32>> = indices.iter().map(|&i| batch.terms[i]).collect();
            let amounts: Vec<f64> = indices
                .iter()
                .map(|&i| match line.basis {
                    ExpenseBasis::PerPolicy => line.amount,
                    ExpenseBasis::PctPremium => {
                        line.amount
                            * batch
                                .annual_premiums
                                .as_ref()
                                .map(|p| p[i])
                                .unwrap_or(1.0)
                    }
                })
                .collect();

            let flows = match line.timing {
                ExpenseTiming::Initial => {
                    let mut flows = vec![0.0; times.len()];
                    flows[0] = amounts.iter().sum();
                    flows
                }
                ExpenseTiming::Renewal => {
                    let renewal_terms: Vec<Option<u32>> = ages
                        .iter()
                        .zip(&terms)
                        .map(|(&age, term)| {
                            Some(
                                term.unwrap_or_else(|| self.mortality.remaining_lifetime(age))
                                    .saturating_sub(1),
                            )
                        })
                        .collect();
                    SurvivalContingentCashflow::new(
                        Arc::clone(&self.curve),
                        Arc::clone(&self.mortality),
                        &ages,
                        &renewal_terms,
                    )?
                    .with_periodic_amounts(&amounts)?
                    .with_escalation(self.inflation_rate)
                    .with_projection_steps(times.clone())
                    .aggregate_cashflows()?
                }
                ExpenseTiming::Maturity => SurvivalContingentCashflow::new(
                    Arc::clone(&self.curve),
                    Arc::clone(&self.mortality),
                    &ages,
                    &terms,
                )?
                .with_terminal_amounts(&amounts)?
                .with_escalation(self.inflation_rate)
                .with_projection_steps(times.clone())
                .aggregate_cashflows()?,
                ExpenseTiming::Death => DeathContingentCashflow::new(
                    Arc::clone(&self.curve),
                    Arc::clone(&self.mortality),
                    &ages,
                    &terms,
                    &amounts,
                )?
                .with_escalation(self.inflation_rate)
                .with_projection_steps(times.clone())
                .aggregate_cashflows()?,
            };

            columns.push(ExpenseCashflowColumn {
                product: line.product,
                label: format!("{} ({})", line.description, line.timing.as_str()),
                flows,
            });
        }

        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::mortality::am92_subset;
    use crate::policy::PremiumType;
    use approx::assert_abs_diff_eq;

    fn fixtures() -> (Arc<DiscountCurve>, Arc<MortalityTable>) {
        (
            Arc::new(DiscountCurve::flat(0.03, 60, "flat 3%").unwrap()),
            Arc::new(am92_subset()),
        )
    }

    fn engine(spec: Vec<ExpenseLine>) -> ExpenseAllocationEngine {
        let (curve, mortality) = fixtures();
        ExpenseAllocationEngine::new(spec, curve, mortality, 0.03)
    }

    fn term_batch() -> PolicyBatch {
        PolicyBatch {
            policy_ids: vec![1, 2],
            ages: vec![34, 47],
            terms: vec![Some(10), Some(10)],
            periodic_survival_benefits: None,
            terminal_survival_benefits: None,
            death_benefits: Some(vec![50_000.0, 50_000.0]),
            annual_premiums: None,
            premium_types: vec![PremiumType::Regular, PremiumType::Regular],
            product_kinds: vec![ProductKind::TermAssurance, ProductKind::TermAssurance],
        }
    }

    #[test]
    fn test_initial_factor_is_one() {
        let eng = engine(vec![]);
        let factors = eng
            .incidence_factors(ExpenseTiming::Initial, &[34, 47], &[Some(10), None])
            .unwrap();
        assert_eq!(factors, vec![1.0, 1.0]);
    }

    #[test]
    fn test_renewal_factor_is_inflated_survival_annuity() {
        let (curve, mortality) = fixtures();
        let eng = engine(vec![]);
        let factor = eng
            .incidence_factors(ExpenseTiming::Renewal, &[47], &[Some(10)])
            .unwrap()[0];

        // Hand-built: sum over t=1..9 of (1.03)^t * df(t) * tp(47, t)
        let mut expected = 0.0;
        for t in 1..=9u32 {
            let s = mortality.survival_probability(&[47], &[t]).unwrap()[0];
            expected += 1.03f64.powi(t as i32) * curve.discount_factor(t) * s;
        }
        assert_abs_diff_eq!(factor, expected, epsilon = 1e-10);
        // With inflation equal to the discount rate, close to term-1 years
        assert!(factor < 9.0);
    }

    #[test]
    fn test_maturity_factor_is_weighted_discount() {
        let (curve, mortality) = fixtures();
        let eng = engine(vec![]);
        let factor = eng
            .incidence_factors(ExpenseTiming::Maturity, &[47], &[Some(10)])
            .unwrap()[0];

        let s = mortality.survival_probability(&[47], &[10]).unwrap()[0];
        let expected = 1.03f64.powi(10) * curve.discount_factor(10) * s;
        assert_abs_diff_eq!(factor, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_death_factor_is_weighted_discount_mass() {
        let (curve, mortality) = fixtures();
        let eng = engine(vec![]);
        let factor = eng
            .incidence_factors(ExpenseTiming::Death, &[73], &[Some(3)])
            .unwrap()[0];

        let deaths = mortality.death_path(&[73], &[3]).unwrap();
        let expected: f64 = (1..=3u32)
            .map(|t| {
                1.03f64.powi(t as i32)
                    * curve.discount_factor(t)
                    * deaths.get(t as usize - 1, 0)
            })
            .sum();
        assert_abs_diff_eq!(factor, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_expense_factors_split_by_basis() {
        let spec = vec![
            ExpenseLine {
                product: ProductKind::TermAssurance,
                description: "New business admin".into(),
                basis: ExpenseBasis::PerPolicy,
                timing: ExpenseTiming::Initial,
                amount: 150.0,
            },
            ExpenseLine {
                product: ProductKind::TermAssurance,
                description: "Commission".into(),
                basis: ExpenseBasis::PctPremium,
                timing: ExpenseTiming::Renewal,
                amount: 0.025,
            },
            ExpenseLine {
                product: ProductKind::Annuity,
                description: "Payment processing".into(),
                basis: ExpenseBasis::PerPolicy,
                timing: ExpenseTiming::Renewal,
                amount: 30.0,
            },
        ];
        let eng = engine(spec);
        let batch = term_batch();

        let factors = eng.expense_factors(&batch).unwrap();
        // Initial line lands in full on each policy
        assert_abs_diff_eq!(factors.per_policy_pv[0], 150.0, epsilon = 1e-9);
        // Annuity line has no matching policies in this batch
        assert!(factors.pct_premium_factor[0] > 0.0);
        assert!(factors.pct_premium_factor[0] < 0.025 * 9.0 * 1.4);

        // Present value at a known premium is the linear combination
        let pv = eng.present_value(&batch, Some(&[1000.0, 1000.0])).unwrap();
        for i in 0..2 {
            assert_abs_diff_eq!(
                pv[i],
                factors.per_policy_pv[i] + factors.pct_premium_factor[i] * 1000.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_project_cashflows_columns() {
        let spec = vec![
            ExpenseLine {
                product: ProductKind::TermAssurance,
                description: "New business admin".into(),
                basis: ExpenseBasis::PerPolicy,
                timing: ExpenseTiming::Initial,
                amount: 150.0,
            },
            ExpenseLine {
                product: ProductKind::TermAssurance,
                description: "Claims handling".into(),
                basis: ExpenseBasis::PerPolicy,
                timing: ExpenseTiming::Death,
                amount: 250.0,
            },
        ];
        let eng = engine(spec);
        let batch = term_batch();

        let columns = eng.project_cashflows(&batch).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].label, "New business admin (INITIAL)");

        // Initial: both policies at t=0, nothing after
        assert_abs_diff_eq!(columns[0].flows[0], 300.0, epsilon = 1e-9);
        assert_eq!(columns[0].flows[1], 0.0);

        // Death: nothing at t=0, positive exposure inside the term window
        assert_eq!(columns[1].flows[0], 0.0);
        assert!(columns[1].flows[1] > 0.0);
        assert!(columns[1].flows[10] > 0.0);
        assert_eq!(columns[1].flows[11], 0.0);
    }
}
