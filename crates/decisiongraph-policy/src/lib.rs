//! decisiongraph-policy
//!
//! Threshold-witnessed policy promotion: witness-set resolution, the
//! in-memory promotion state machine, and PolicyHead construction.

pub mod promotion;
pub mod witness;

pub use promotion::{
    promotion_signing_bytes, PromotionManager, PromotionRequest, PromotionState, PromotionStatus,
};
pub use witness::{active_witness_set, latest_policy_head};
