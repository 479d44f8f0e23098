//! Premium pricing engine
//!
//! Solves the per-policy breakeven premium from the equilibrium
//!
//! ```text
//! benefit PV + expense PV(premium) = premium x annuity factor
//! ```
//!
//! The percent-of-premium expense term is linear in the unknown premium, so
//! the equation isolates algebraically:
//!
//! ```text
//! premium = (benefit PV + per-policy expense PV)
//!         / (annuity factor - pct-premium expense factor)
//! ```
//!
//! A zero or negative denominator means expenses exceed the premium-paying
//! capacity; it surfaces as an arithmetic error, never a clamped price.

use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::assumptions::{DiscountCurve, MortalityTable};
use crate::error::ModelError;
use crate::expenses::{ExpenseAllocationEngine, ExpenseLine};
use crate::policy::{PolicyBatch, PremiumType};
use crate::products::build_product;
use crate::projection::{CashflowModel, Spread, SurvivalContingentCashflow};

/// Breakeven price for one policy.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyPrice {
    pub policy_id: u32,
    pub premium: f64,
}

/// Prices policy batches against one mortality table, curve and expense spec.
pub struct PricingEngine {
    mortality: Arc<MortalityTable>,
    curve: Arc<DiscountCurve>,
    expenses: ExpenseAllocationEngine,
}

impl PricingEngine {
    pub fn new(
        mortality: Arc<MortalityTable>,
        curve: Arc<DiscountCurve>,
        expense_spec: Vec<ExpenseLine>,
        expense_inflation_rate: f64,
    ) -> Self {
        let expenses = ExpenseAllocationEngine::new(
            expense_spec,
            Arc::clone(&curve),
            Arc::clone(&mortality),
            expense_inflation_rate,
        );
        Self {
            mortality,
            curve,
            expenses,
        }
    }

    pub fn expenses(&self) -> &ExpenseAllocationEngine {
        &self.expenses
    }

    /// Solve the breakeven premium for every policy in the batch, returning
    /// one price per policy identifier in batch order.
    pub fn price_policy_batch(&self, batch: &PolicyBatch) -> Result<Vec<PolicyPrice>, ModelError> {
        batch.validate()?;

        let kinds = batch.product_kinds_present();
        info!(
            "pricing {} policies across {} product groups",
            batch.len(),
            kinds.len()
        );

        let benefit_pvs = self.benefit_present_values(batch)?;
        let annuity_factors = self.premium_annuity_factors(batch)?;
        let expense_factors = self.expenses.expense_factors(batch)?;

        let mut prices = Vec::with_capacity(batch.len());
        for i in 0..batch.len() {
            let denominator = annuity_factors[i] - expense_factors.pct_premium_factor[i];
            if denominator <= 0.0 {
                return Err(ModelError::Arithmetic(format!(
                    "policy {}: premium annuity factor {} does not cover pct-premium expenses {}",
                    batch.policy_ids[i], annuity_factors[i], expense_factors.pct_premium_factor[i]
                )));
            }
            prices.push(PolicyPrice {
                policy_id: batch.policy_ids[i],
                premium: (benefit_pvs[i] + expense_factors.per_policy_pv[i]) / denominator,
            });
        }
        Ok(prices)
    }

    /// Benefit PV per policy, grouped by product kind.
    pub fn benefit_present_values(&self, batch: &PolicyBatch) -> Result<Vec<f64>, ModelError> {
        let mut out = vec![0.0; batch.len()];
        for kind in batch.product_kinds_present() {
            let indices = batch.indices_of(kind);
            let subset = batch.subset(&indices);
            let product = build_product(kind, &subset, &self.curve, &self.mortality)?;
            let pvs = product.present_value(&Spread::zero())?;
            for (&i, pv) in indices.iter().zip(pvs) {
                out[i] = pv;
            }
        }
        Ok(out)
    }

    /// Premium annuity factor per policy: 1 for single premium; 1 plus the
    /// unit survival annuity over term-1 years for regular premiums (level
    /// annual premiums in advance, stopping the year before the policy's own
    /// term runs out).
    pub fn premium_annuity_factors(&self, batch: &PolicyBatch) -> Result<Vec<f64>, ModelError> {
        let mut factors = vec![1.0; batch.len()];

        let regular: Vec<usize> = (0..batch.len())
            .filter(|&i| batch.premium_types[i] == PremiumType::Regular)
            .collect();
        if regular.is_empty() {
            return Ok(factors);
        }

        let ages: Vec<u32> = regular.iter().map(|&i| batch.ages[i]).collect();
        let terms: Vec<Option<u32>> = regular
            .iter()
            .map(|&i| {
                Some(
                    batch.terms[i]
                        .unwrap_or_else(|| self.mortality.remaining_lifetime(batch.ages[i]))
                        .saturating_sub(1),
                )
            })
            .collect();
        let units = vec![1.0; regular.len()];

        let annuity = SurvivalContingentCashflow::new(
            Arc::clone(&self.curve),
            Arc::clone(&self.mortality),
            &ages,
            &terms,
        )?
        .with_periodic_amounts(&units)?;

        let pvs = annuity.present_value(&Spread::zero())?;
        for (&i, pv) in regular.iter().zip(pvs) {
            factors[i] = 1.0 + pv;
        }
        Ok(factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::mortality::am92_subset;
    use crate::expenses::{ExpenseBasis, ExpenseTiming};
    use crate::products::ProductKind;
    use approx::assert_abs_diff_eq;

    fn fixtures() -> (Arc<DiscountCurve>, Arc<MortalityTable>) {
        (
            Arc::new(DiscountCurve::flat(0.03, 60, "flat 3%").unwrap()),
            Arc::new(am92_subset()),
        )
    }

    fn expense_spec() -> Vec<ExpenseLine> {
        vec![
            ExpenseLine {
                product: ProductKind::PureEndowment,
                description: "New business admin".into(),
                basis: ExpenseBasis::PerPolicy,
                timing: ExpenseTiming::Initial,
                amount: 100.0,
            },
            ExpenseLine {
                product: ProductKind::Endowment,
                description: "New business admin".into(),
                basis: ExpenseBasis::PerPolicy,
                timing: ExpenseTiming::Initial,
                amount: 100.0,
            },
            ExpenseLine {
                product: ProductKind::Endowment,
                description: "Renewal admin".into(),
                basis: ExpenseBasis::PerPolicy,
                timing: ExpenseTiming::Renewal,
                amount: 25.0,
            },
            ExpenseLine {
                product: ProductKind::Endowment,
                description: "Commission".into(),
                basis: ExpenseBasis::PctPremium,
                timing: ExpenseTiming::Renewal,
                amount: 0.025,
            },
        ]
    }

    #[test]
    fn test_single_premium_pure_endowment_by_hand() {
        let (curve, mortality) = fixtures();
        let engine = PricingEngine::new(
            Arc::clone(&mortality),
            Arc::clone(&curve),
            vec![],
            0.0,
        );

        let batch = PolicyBatch {
            policy_ids: vec![1],
            ages: vec![73],
            terms: vec![Some(3)],
            terminal_survival_benefits: Some(vec![1000.0]),
            premium_types: vec![PremiumType::Single],
            product_kinds: vec![ProductKind::PureEndowment],
            ..PolicyBatch::default()
        };

        let prices = engine.price_policy_batch(&batch).unwrap();
        // No expenses, single premium: price = benefit PV
        let s3 = mortality.survival_probability(&[73], &[3]).unwrap()[0];
        let expected = 1000.0 * s3 * curve.discount_factor(3);
        assert_abs_diff_eq!(prices[0].premium, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_premium_equilibrium_residual() {
        let (curve, mortality) = fixtures();
        let engine =
            PricingEngine::new(Arc::clone(&mortality), Arc::clone(&curve), expense_spec(), 0.03);

        let batch = PolicyBatch {
            policy_ids: vec![1, 2],
            ages: vec![34, 47],
            terms: vec![Some(20), Some(15)],
            terminal_survival_benefits: Some(vec![25_000.0, 40_000.0]),
            death_benefits: Some(vec![25_000.0, 40_000.0]),
            premium_types: vec![PremiumType::Regular, PremiumType::Single],
            product_kinds: vec![ProductKind::Endowment, ProductKind::Endowment],
            ..PolicyBatch::default()
        };

        let prices = engine.price_policy_batch(&batch).unwrap();
        let premiums: Vec<f64> = prices.iter().map(|p| p.premium).collect();

        let benefit_pvs = engine.benefit_present_values(&batch).unwrap();
        let annuities = engine.premium_annuity_factors(&batch).unwrap();
        let expense_pvs = engine
            .expenses()
            .present_value(&batch, Some(&premiums))
            .unwrap();

        // benefitPV + expensePV(p) - p x annuityFactor = 0, both premium types
        for i in 0..2 {
            let residual = benefit_pvs[i] + expense_pvs[i] - premiums[i] * annuities[i];
            assert_abs_diff_eq!(residual, 0.0, epsilon = 1e-8);
        }
        // Regular premium spreads cost over the term: smaller instalments
        assert!(premiums[0] < benefit_pvs[0]);
        // Single premium annuity factor is exactly 1
        assert_abs_diff_eq!(annuities[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_regular_premium_annuity_factor_by_hand() {
        let (curve, mortality) = fixtures();
        let engine = PricingEngine::new(
            Arc::clone(&mortality),
            Arc::clone(&curve),
            vec![],
            0.0,
        );

        let batch = PolicyBatch {
            policy_ids: vec![1],
            ages: vec![47],
            terms: vec![Some(5)],
            death_benefits: Some(vec![10_000.0]),
            premium_types: vec![PremiumType::Regular],
            product_kinds: vec![ProductKind::TermAssurance],
            ..PolicyBatch::default()
        };

        let factor = engine.premium_annuity_factors(&batch).unwrap()[0];
        // 1 + sum over t=1..4 of df(t) * tp(47, t)
        let mut expected = 1.0;
        for t in 1..=4u32 {
            let s = mortality.survival_probability(&[47], &[t]).unwrap()[0];
            expected += curve.discount_factor(t) * s;
        }
        assert_abs_diff_eq!(factor, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_expense_overrun_is_arithmetic_error() {
        let (curve, mortality) = fixtures();
        // A 150% of premium recurring expense can never break even
        let spec = vec![ExpenseLine {
            product: ProductKind::TermAssurance,
            description: "Runaway commission".into(),
            basis: ExpenseBasis::PctPremium,
            timing: ExpenseTiming::Renewal,
            amount: 1.5,
        }];
        let engine = PricingEngine::new(mortality, curve, spec, 0.0);

        let batch = PolicyBatch {
            policy_ids: vec![1],
            ages: vec![34],
            terms: vec![Some(20)],
            death_benefits: Some(vec![50_000.0]),
            premium_types: vec![PremiumType::Regular],
            product_kinds: vec![ProductKind::TermAssurance],
            ..PolicyBatch::default()
        };

        let err = engine.price_policy_batch(&batch).unwrap_err();
        assert!(matches!(err, ModelError::Arithmetic(_)));
    }
}
