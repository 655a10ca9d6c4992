//! decisiongraph-precedent
//!
//! The precedent engine: sealed judgments, domain registries, and the
//! three-layer comparability model — equivalence-class gating, typed
//! driver-aware similarity, and governed confidence.

pub mod confidence;
pub mod domain;
pub mod domains;
pub mod engine;
pub mod gate;
pub mod judgment;
pub mod report;
pub mod similarity;
pub mod store;

pub use confidence::{
    governed_confidence, ConfidenceInputs, ConfidenceLevel, Dimension, DimensionScore,
    GovernedConfidence, Measure,
};
pub use domain::{ComparisonFn, DomainRegistry, FieldDef, FieldTier, FieldType, Gate};
pub use engine::{score, CaseFacts};
pub use gate::{comparability, GateCheck, GateOutcome};
pub use judgment::{create_judgment, fingerprint_hash, JudgmentInput};
pub use report::{
    DistinguishingFactors, DivergenceJustification, PrecedentPools, PrecedentReport,
    ScoredPrecedent,
};
pub use similarity::{
    classify_match, compare_values, score_precedent, FactorContribution, MatchClass,
    NeutralReason, SimilarityOutcome,
};
pub use store::{AppealStats, JudgmentRecord, PrecedentIndex, PrecedentStatistics};
