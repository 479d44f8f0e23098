//! Valuation assumptions: mortality decrements and discounting

mod curve;
pub(crate) mod mortality;

pub mod loader;

pub use curve::DiscountCurve;
pub use mortality::MortalityTable;
