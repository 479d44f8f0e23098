//! Product catalogue: each product kind is configuration over the closed set
//! of projector variants, composed by the generic valuation engine. New
//! products are new configurations, not new projector implementations.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assumptions::{DiscountCurve, MortalityTable};
use crate::error::ModelError;
use crate::policy::PolicyBatch;
use crate::projection::{
    CashflowModel, CompositeValuationEngine, DeathContingentCashflow, SurvivalContingentCashflow,
};

/// Supported product kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKind {
    /// Periodic payment while the annuitant survives
    Annuity,
    /// Sum assured on death within term or on survival to term
    Endowment,
    /// Sum assured on survival to term only
    PureEndowment,
    /// Sum assured on death within term only
    TermAssurance,
    /// Sum assured on death, whenever it occurs
    WholeOfLifeAssurance,
}

impl ProductKind {
    pub const ALL: [ProductKind; 5] = [
        ProductKind::Annuity,
        ProductKind::Endowment,
        ProductKind::PureEndowment,
        ProductKind::TermAssurance,
        ProductKind::WholeOfLifeAssurance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Annuity => "Annuity",
            ProductKind::Endowment => "Endowment",
            ProductKind::PureEndowment => "Pure Endowment",
            ProductKind::TermAssurance => "Term Assurance",
            ProductKind::WholeOfLifeAssurance => "Whole-of-Life Assurance",
        }
    }
}

impl FromStr for ProductKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| ModelError::Configuration(format!("unknown product kind '{}'", s)))
    }
}

/// Build the composite valuation for one product kind over a batch of
/// policies of that kind.
pub fn build_product(
    kind: ProductKind,
    batch: &PolicyBatch,
    curve: &Arc<DiscountCurve>,
    mortality: &Arc<MortalityTable>,
) -> Result<CompositeValuationEngine, ModelError> {
    let mut components: Vec<Box<dyn CashflowModel>> = Vec::new();

    match kind {
        ProductKind::Annuity => {
            let survival = SurvivalContingentCashflow::new(
                Arc::clone(curve),
                Arc::clone(mortality),
                &batch.ages,
                &batch.terms,
            )?
            .with_periodic_amounts(batch.periodic_survival_benefits()?)?;
            components.push(Box::new(survival));
        }
        ProductKind::PureEndowment => {
            let survival = SurvivalContingentCashflow::new(
                Arc::clone(curve),
                Arc::clone(mortality),
                &batch.ages,
                &batch.terms,
            )?
            .with_terminal_amounts(batch.terminal_survival_benefits()?)?;
            components.push(Box::new(survival));
        }
        ProductKind::Endowment => {
            let survival = SurvivalContingentCashflow::new(
                Arc::clone(curve),
                Arc::clone(mortality),
                &batch.ages,
                &batch.terms,
            )?
            .with_terminal_amounts(batch.terminal_survival_benefits()?)?;
            let death = DeathContingentCashflow::new(
                Arc::clone(curve),
                Arc::clone(mortality),
                &batch.ages,
                &batch.terms,
                batch.death_benefits()?,
            )?;
            components.push(Box::new(survival));
            components.push(Box::new(death));
        }
        ProductKind::TermAssurance | ProductKind::WholeOfLifeAssurance => {
            let death = DeathContingentCashflow::new(
                Arc::clone(curve),
                Arc::clone(mortality),
                &batch.ages,
                &batch.terms,
                batch.death_benefits()?,
            )?;
            components.push(Box::new(death));
        }
    }

    CompositeValuationEngine::new(components, Arc::clone(curve))
}
