//! Outer adapters: the CSV operation journal and balance report, and the
//! replay driver that feeds journal operations into the ledger.

pub mod csv;
pub mod replay;
