//! Policy portfolio data structures and ingestion

mod batch;
pub mod loader;

pub use batch::{PolicyBatch, PremiumType};
