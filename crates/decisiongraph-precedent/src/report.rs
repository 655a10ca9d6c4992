//! The classified output of a precedent scoring run.

use decisiongraph_core::payload::Disposition;

use crate::confidence::GovernedConfidence;
use crate::gate::GateOutcome;
use crate::similarity::{FactorContribution, MatchClass, NeutralReason, SimilarityOutcome};
use crate::store::JudgmentRecord;

/// One precedent after gating, scoring, and classification.
#[derive(Clone, Debug)]
pub struct ScoredPrecedent {
    pub record: JudgmentRecord,
    /// Absent for precedents the gate barred before scoring.
    pub similarity: Option<SimilarityOutcome>,
    pub gate: GateOutcome,
    pub class: MatchClass,
    pub neutral_reason: Option<NeutralReason>,
}

impl ScoredPrecedent {
    pub fn similarity_value(&self) -> Option<f64> {
        self.similarity.as_ref().map(|s| s.similarity)
    }
}

/// The five pools a precedent can land in. A precedent appears in exactly
/// one.
#[derive(Debug, Default)]
pub struct PrecedentPools {
    pub supporting: Vec<ScoredPrecedent>,
    pub contrary: Vec<ScoredPrecedent>,
    pub neutral: Vec<ScoredPrecedent>,
    pub below_floor: Vec<ScoredPrecedent>,
    pub non_transferable: Vec<ScoredPrecedent>,
}

impl PrecedentPools {
    pub fn total(&self) -> usize {
        self.supporting.len()
            + self.contrary.len()
            + self.neutral.len()
            + self.below_floor.len()
            + self.non_transferable.len()
    }
}

/// Where a precedent's score came from, for the report's top-K section.
#[derive(Clone, Debug)]
pub struct DistinguishingFactors {
    pub precedent_id: String,
    pub similarity: f64,
    /// Contributions ordered by how much score they cost, worst first.
    pub factors: Vec<FactorContribution>,
}

/// Emitted when the proposed disposition disagrees with the decisive pool.
#[derive(Clone, Debug)]
pub struct DivergenceJustification {
    pub proposed: Disposition,
    pub pool_majority: Disposition,
    /// Share of the decisive pool holding the majority disposition.
    pub majority_share: f64,
    /// Highest-similarity precedents the proposal diverges from.
    pub leading_counterexamples: Vec<String>,
}

#[derive(Debug)]
pub struct PrecedentReport {
    pub domain_id: String,
    pub pools: PrecedentPools,
    pub confidence: GovernedConfidence,
    pub distinguishing: Vec<DistinguishingFactors>,
    pub divergence: Option<DivergenceJustification>,
    /// Gate warnings accumulated across the pool (deduplicated).
    pub warnings: Vec<String>,
}
