//! Expense specification and allocation

mod engine;
mod spec;

pub use engine::{ExpenseAllocationEngine, ExpenseCashflowColumn, ExpenseFactors};
pub use spec::{ExpenseBasis, ExpenseLine, ExpenseTiming};
