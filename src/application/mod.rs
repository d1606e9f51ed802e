//! Application layer orchestrating the ledger's operations.
//!
//! `AggregationLedger` is the single entry point. Its operations are split
//! by concern: deposits, routes and queries in `ledger`, settlement in
//! `settlement`, role and safety controls in `governance`.

pub mod authorization;
mod governance;
pub mod ledger;
pub mod locks;
pub mod settlement;
