//! Domain model: identifiers, amounts, per-key state, signed messages and
//! the ports the ledger talks to its collaborators through.

pub mod amount;
pub mod event;
pub mod key;
pub mod message;
pub mod ports;
pub mod role;
pub mod signature;
pub mod state;
