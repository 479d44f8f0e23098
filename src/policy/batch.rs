//! Policy batch: the portfolio as parallel column arrays
//!
//! The batch is a value object consumed by the core, never mutated in place:
//! projectors copy the columns they need and clamp terms on their own copies,
//! so caller-owned storage is untouched.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::products::ProductKind;

/// Premium payment pattern of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PremiumType {
    /// One premium at outset
    Single,
    /// Level annual premiums in advance while in force
    Regular,
}

impl PremiumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PremiumType::Single => "Single",
            PremiumType::Regular => "Regular",
        }
    }
}

impl std::str::FromStr for PremiumType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Single" => Ok(PremiumType::Single),
            "Regular" => Ok(PremiumType::Regular),
            other => Err(ModelError::Configuration(format!(
                "unknown premium type '{}'",
                other
            ))),
        }
    }
}

/// Portfolio of policies as equal-length parallel arrays.
///
/// `terms` entries of None mean open-ended: the term defaults to the
/// mortality table's remaining lifetime when a projector ingests the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyBatch {
    /// Unique policy identifiers
    pub policy_ids: Vec<u32>,

    /// Age at valuation
    pub ages: Vec<u32>,

    /// Policy term in years; None = open-ended
    pub terms: Vec<Option<u32>>,

    /// Annual survival-contingent benefit amount (annuities)
    pub periodic_survival_benefits: Option<Vec<f64>>,

    /// Benefit paid on survival to the policy's own term (endowments)
    pub terminal_survival_benefits: Option<Vec<f64>>,

    /// Benefit paid in the year of death (assurances, endowments)
    pub death_benefits: Option<Vec<f64>>,

    /// Known annual premiums, where already priced
    pub annual_premiums: Option<Vec<f64>>,

    /// Single or regular premium
    pub premium_types: Vec<PremiumType>,

    /// Product kind per policy
    pub product_kinds: Vec<ProductKind>,
}

impl PolicyBatch {
    /// Number of policies
    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    /// Check that every present column matches the policy count.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.len();
        let check = |len: usize, what: &str| -> Result<(), ModelError> {
            if len != n {
                return Err(ModelError::Input(format!(
                    "{} ({}) must match policy count ({})",
                    what, len, n
                )));
            }
            Ok(())
        };

        check(self.policy_ids.len(), "policy ids")?;
        check(self.terms.len(), "terms")?;
        check(self.premium_types.len(), "premium types")?;
        check(self.product_kinds.len(), "product kinds")?;
        if let Some(col) = &self.periodic_survival_benefits {
            check(col.len(), "periodic survival benefits")?;
        }
        if let Some(col) = &self.terminal_survival_benefits {
            check(col.len(), "terminal survival benefits")?;
        }
        if let Some(col) = &self.death_benefits {
            check(col.len(), "death benefits")?;
        }
        if let Some(col) = &self.annual_premiums {
            check(col.len(), "annual premiums")?;
        }
        Ok(())
    }

    pub fn periodic_survival_benefits(&self) -> Result<&[f64], ModelError> {
        self.periodic_survival_benefits
            .as_deref()
            .ok_or_else(|| ModelError::Input("batch has no periodic survival benefit column".into()))
    }

    pub fn terminal_survival_benefits(&self) -> Result<&[f64], ModelError> {
        self.terminal_survival_benefits
            .as_deref()
            .ok_or_else(|| ModelError::Input("batch has no terminal survival benefit column".into()))
    }

    pub fn death_benefits(&self) -> Result<&[f64], ModelError> {
        self.death_benefits
            .as_deref()
            .ok_or_else(|| ModelError::Input("batch has no death benefit column".into()))
    }

    /// Indices of policies with the given product kind, in batch order
    pub fn indices_of(&self, kind: ProductKind) -> Vec<usize> {
        self.product_kinds
            .iter()
            .enumerate()
            .filter(|(_, &k)| k == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct product kinds present, in first-appearance order
    pub fn product_kinds_present(&self) -> Vec<ProductKind> {
        let mut seen = Vec::new();
        for &kind in &self.product_kinds {
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }
        seen
    }

    /// New batch holding copies of the rows at `indices`
    pub fn subset(&self, indices: &[usize]) -> PolicyBatch {
        let pick_f64 = |col: &Option<Vec<f64>>| {
            col.as_ref()
                .map(|v| indices.iter().map(|&i| v[i]).collect())
        };

        PolicyBatch {
            policy_ids: indices.iter().map(|&i| self.policy_ids[i]).collect(),
            ages: indices.iter().map(|&i| self.ages[i]).collect(),
            terms: indices.iter().map(|&i| self.terms[i]).collect(),
            periodic_survival_benefits: pick_f64(&self.periodic_survival_benefits),
            terminal_survival_benefits: pick_f64(&self.terminal_survival_benefits),
            death_benefits: pick_f64(&self.death_benefits),
            annual_premiums: pick_f64(&self.annual_premiums),
            premium_types: indices.iter().map(|&i| self.premium_types[i]).collect(),
            product_kinds: indices.iter().map(|&i| self.product_kinds[i]).collect(),
        }
    }
}
