//! Core data model for the DecisionGraph reasoning ledger: cells, sealed
//! bytes, canonicalization, typed payloads, and the shared error taxonomy.

pub mod canonical;
pub mod cell;
pub mod constants;
pub mod error;
pub mod payload;
pub mod types;

pub use canonical::{assert_no_floats, to_canonical_bytes};
pub use cell::{sealed_bytes, Cell, CellHeader, EvidenceItem, Fact, FactObject, LogicAnchor, Proof};
pub use constants::*;
pub use error::DgError;
pub use types::{
    CellId, CellType, Confidence, GraphId, HashScheme, Namespace, SourceQuality, UtcStamp,
    NULL_HASH,
};
