//! Contingent cashflow projection and valuation

mod composite;
mod death;
mod guaranteed;
mod model;
mod survival;

pub use composite::CompositeValuationEngine;
pub use death::DeathContingentCashflow;
pub use guaranteed::GuaranteedCashflow;
pub use model::{CashflowModel, Spread};
pub use survival::SurvivalContingentCashflow;
