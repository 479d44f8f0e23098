//! Expense specification rows
//!
//! String forms follow the tabular spec files (`PER_POLICY`, `INITIAL`, ...).
//! Unrecognized values surface as configuration errors at parse time; they
//! are never defaulted.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::products::ProductKind;

/// How an expense amount scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseBasis {
    /// Fixed amount per policy
    PerPolicy,
    /// Amount is a fraction of the annual premium
    PctPremium,
}

impl ExpenseBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseBasis::PerPolicy => "PER_POLICY",
            ExpenseBasis::PctPremium => "PCT_PREMIUM",
        }
    }
}

impl FromStr for ExpenseBasis {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PER_POLICY" => Ok(ExpenseBasis::PerPolicy),
            "PCT_PREMIUM" => Ok(ExpenseBasis::PctPremium),
            other => Err(ModelError::Configuration(format!(
                "unknown expense basis '{}'",
                other
            ))),
        }
    }
}

/// When an expense is incurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseTiming {
    /// Once at outset, undiscounted
    Initial,
    /// Each renewal year the policy is in force (years 1..term-1)
    Renewal,
    /// On survival to the policy's own term
    Maturity,
    /// In the year of death
    Death,
}

impl ExpenseTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseTiming::Initial => "INITIAL",
            ExpenseTiming::Renewal => "RENEWAL",
            ExpenseTiming::Maturity => "SURVIVAL",
            ExpenseTiming::Death => "DEATH",
        }
    }
}

impl FromStr for ExpenseTiming {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIAL" => Ok(ExpenseTiming::Initial),
            "RENEWAL" => Ok(ExpenseTiming::Renewal),
            "SURVIVAL" => Ok(ExpenseTiming::Maturity),
            "DEATH" => Ok(ExpenseTiming::Death),
            other => Err(ModelError::Configuration(format!(
                "unknown expense timing '{}'",
                other
            ))),
        }
    }
}

/// One row of the expense specification table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseLine {
    /// Product the line applies to
    pub product: ProductKind,

    /// Free-text description, carried through to reporting
    pub description: String,

    pub basis: ExpenseBasis,

    pub timing: ExpenseTiming,

    /// Amount per policy, or fraction of premium for PCT_PREMIUM lines
    pub amount: f64,
}
