//! decisiongraph-chain
//!
//! The chain container, the ordered commit gate, per-type structural
//! validation, and the `Ledger` that composes journal, gate, tail, and index
//! fan-out under one writer lock.

pub mod builder;
pub mod chain;
pub mod gate;
pub mod ledger;
pub mod structural;

pub use builder::CellDraft;
pub use chain::Chain;
pub use ledger::{CellSink, Journal, Ledger, LedgerState};
