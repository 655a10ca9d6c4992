//! decisiongraph-scholar
//!
//! The read side of the ledger: namespace-authorized, bitemporal fact
//! queries with deterministic conflict resolution and proof bundles.

pub mod authz;
pub mod index;
pub mod resolver;

pub use authz::{authorize_read, ReadGrant};
pub use index::ScholarIndex;
pub use resolver::{
    active_policy_head, query_facts, PolicyMode, ProofBundle, QueryParams, QueryResult,
    ResolutionEvent, ResolutionEventKind,
};
