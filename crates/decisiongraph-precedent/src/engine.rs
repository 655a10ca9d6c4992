//! The scoring pipeline: registry load → pool retrieval → comparability
//! gate → typed similarity → classification → governed confidence → report.
//!
//! Domain errors fail the whole computation; there is no partial report.

use std::collections::BTreeMap;
use tracing::debug;

use decisiongraph_chain::Chain;
use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{Disposition, DispositionBasis, FieldValue};
use decisiongraph_core::types::{Namespace, UtcStamp};

use crate::confidence::{governed_confidence, ConfidenceInputs};
use crate::domain::DomainRegistry;
use crate::gate::comparability;
use crate::report::{
    DistinguishingFactors, DivergenceJustification, PrecedentPools, PrecedentReport,
    ScoredPrecedent,
};
use crate::similarity::{classify_match, score_precedent, MatchClass, NeutralReason};
use crate::store::PrecedentIndex;

/// How many top precedents get a distinguishing-factor breakdown.
const DISTINGUISHING_TOP_K: usize = 5;

/// The case under decision, as the engine sees it.
#[derive(Clone, Debug)]
pub struct CaseFacts {
    pub values: BTreeMap<String, FieldValue>,
    /// The proposed disposition being tested against history.
    pub disposition: Disposition,
    pub disposition_basis: DispositionBasis,
    /// Typology for floor overrides, when the case has been typed.
    pub typology: Option<String>,
}

/// Score `case` against the sealed judgments under `namespace_prefix`.
pub fn score(
    chain: &Chain,
    index: &PrecedentIndex,
    case: &CaseFacts,
    domain_id: &str,
    namespace_prefix: &Namespace,
    as_of: Option<&UtcStamp>,
) -> Result<PrecedentReport, DgError> {
    let registry = DomainRegistry::load(domain_id)?;
    let pool = index.all_in(chain, namespace_prefix, as_of);
    debug!(domain_id, pool = pool.len(), "scoring precedent pool");

    let mut pools = PrecedentPools::default();
    let mut warnings: Vec<String> = Vec::new();

    for record in pool {
        let gate = comparability(&registry, case, &record.payload);
        for warning in &gate.warnings {
            if !warnings.contains(warning) {
                warnings.push(warning.clone());
            }
        }

        if !gate.comparable {
            // Cross-basis precedents stay visible as neutral; other gate
            // failures are incomparable in kind and reported the same way.
            let reason = if gate.cross_basis {
                NeutralReason::CrossBasis
            } else {
                NeutralReason::GateMismatch
            };
            pools.neutral.push(ScoredPrecedent {
                record,
                similarity: None,
                gate,
                class: MatchClass::Neutral,
                neutral_reason: Some(reason),
            });
            continue;
        }

        let outcome = score_precedent(&registry, case, &record.payload)?;
        // Floor overrides key off the precedent's driver typology; an
        // untyped precedent falls back to the case's own typology.
        let typology = record
            .payload
            .driver_typology
            .as_deref()
            .or(case.typology.as_deref());
        let floor = registry.floor_for(typology);
        if outcome.similarity < floor {
            pools.below_floor.push(ScoredPrecedent {
                record,
                similarity: Some(outcome),
                gate,
                class: MatchClass::Neutral,
                neutral_reason: None,
            });
            continue;
        }

        let (class, neutral_reason) = classify_match(case, &record.payload, outcome.non_transferable);
        let scored = ScoredPrecedent {
            record,
            similarity: Some(outcome),
            gate,
            class,
            neutral_reason,
        };
        if scored
            .similarity
            .as_ref()
            .map(|s| s.non_transferable)
            .unwrap_or(false)
        {
            // A non-transferable precedent never supports; it is kept
            // aside to explain contrary outcomes and distinguishing factors.
            pools.non_transferable.push(scored);
        } else {
            match class {
                MatchClass::Supporting => pools.supporting.push(scored),
                MatchClass::Contrary => pools.contrary.push(scored),
                MatchClass::Neutral => pools.neutral.push(scored),
            }
        }
    }

    // Deterministic order inside each pool: similarity desc, then cell id.
    for bucket in [
        &mut pools.supporting,
        &mut pools.contrary,
        &mut pools.neutral,
        &mut pools.below_floor,
        &mut pools.non_transferable,
    ] {
        bucket.sort_by(|a, b| {
            b.similarity_value()
                .unwrap_or(0.0)
                .partial_cmp(&a.similarity_value().unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.cell_id.cmp(&b.record.cell_id))
        });
    }

    // ── Confidence ───────────────────────────────────────────────────────────
    let scored_similarities: Vec<f64> = pools
        .supporting
        .iter()
        .chain(&pools.contrary)
        .chain(&pools.neutral)
        .filter_map(|p| p.similarity_value())
        .collect();
    let confidence = governed_confidence(
        &registry,
        &ConfidenceInputs {
            scored_similarities: &scored_similarities,
            supporting_count: pools.supporting.len(),
            contrary_count: pools.contrary.len(),
            case_values: &case.values,
        },
    );

    // ── Distinguishing factors for the strongest precedents ─────────────────
    let distinguishing = pools
        .supporting
        .iter()
        .chain(&pools.contrary)
        .take(DISTINGUISHING_TOP_K)
        .filter_map(|p| {
            let outcome = p.similarity.as_ref()?;
            let mut factors = outcome.contributions.clone();
            factors.sort_by(|a, b| {
                let cost_a = a.weight * a.multiplier * (1.0 - a.score);
                let cost_b = b.weight * b.multiplier * (1.0 - b.score);
                cost_b
                    .partial_cmp(&cost_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.field.cmp(&b.field))
            });
            Some(DistinguishingFactors {
                precedent_id: p.record.payload.precedent_id.clone(),
                similarity: outcome.similarity,
                factors,
            })
        })
        .collect();

    // ── Divergence from the decisive pool ────────────────────────────────────
    let divergence = divergence_block(case, &pools);

    Ok(PrecedentReport {
        domain_id: registry.id.clone(),
        pools,
        confidence,
        distinguishing,
        divergence,
        warnings,
    })
}

/// When the decisive pool leans one way and the proposal goes the other,
/// the report carries the counter-evidence the decision-maker must answer.
///
/// A strict majority is required: an exact count tie between dispositions
/// means the pool has no majority, and no block is emitted. Picking a side
/// implicitly would bias a tied pool toward whichever disposition happens
/// to sort first.
fn divergence_block(case: &CaseFacts, pools: &PrecedentPools) -> Option<DivergenceJustification> {
    let mut counts: BTreeMap<Disposition, usize> = BTreeMap::new();
    for p in pools.supporting.iter().chain(&pools.contrary) {
        *counts.entry(p.record.payload.disposition).or_default() += 1;
    }
    let decisive: usize = counts.values().sum();
    if decisive == 0 {
        return None;
    }
    let top = counts.values().copied().max()?;
    let mut leaders = counts.iter().filter(|(_, count)| **count == top);
    let (majority, majority_count) = leaders.next().map(|(d, c)| (*d, *c))?;
    if leaders.next().is_some() {
        // Tied pool: no majority exists to diverge from.
        return None;
    }
    if majority == case.disposition {
        return None;
    }
    let leading_counterexamples = pools
        .supporting
        .iter()
        .chain(&pools.contrary)
        .filter(|p| p.record.payload.disposition == majority)
        .take(3)
        .map(|p| p.record.payload.precedent_id.clone())
        .collect();
    Some(DivergenceJustification {
        proposed: case.disposition,
        pool_majority: majority,
        majority_share: majority_count as f64 / decisive as f64,
        leading_counterexamples,
    })
}
