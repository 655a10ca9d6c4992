//! Layer 2: typed similarity with driver awareness.
//!
//! Five comparators, resolved by the field's `ComparisonFn` tag, accumulate
//! a weighted score over the non-structural fields present on both sides.
//! Fields the precedent flagged as decision drivers count double — and a
//! driver that contradicts the case, or is simply absent from it, marks the
//! precedent non-transferable: its causal story does not carry over, however
//! high the arithmetic lands.

use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{Disposition, FieldValue, JudgmentPayload};

use crate::domain::{ComparisonFn, DomainRegistry, FieldDef, FieldTier};
use crate::engine::CaseFacts;
use crate::gate::classify;

/// One field's part in a precedent's score.
#[derive(Clone, Debug)]
pub struct FactorContribution {
    pub field: String,
    pub score: f64,
    pub weight: f64,
    /// 2 for drivers, 1 for context.
    pub multiplier: f64,
    pub is_driver: bool,
    pub case_value: FieldValue,
    pub precedent_value: FieldValue,
}

#[derive(Clone, Debug)]
pub struct SimilarityOutcome {
    pub similarity: f64,
    pub non_transferable: bool,
    pub non_transferable_reasons: Vec<String>,
    pub contributions: Vec<FactorContribution>,
}

/// Score one comparable precedent against the case.
pub fn score_precedent(
    registry: &DomainRegistry,
    case: &CaseFacts,
    precedent: &JudgmentPayload,
) -> Result<SimilarityOutcome, DgError> {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut outcome = SimilarityOutcome {
        similarity: 0.0,
        non_transferable: false,
        non_transferable_reasons: Vec::new(),
        contributions: Vec::new(),
    };

    for (name, def) in &registry.fields {
        if def.tier == FieldTier::Structural {
            continue;
        }
        let is_driver = precedent.decision_drivers.contains(name);
        let case_value = case.values.get(name);
        let precedent_value = precedent.anchor_facts.get(name);

        match (case_value, precedent_value) {
            (Some(cv), Some(pv)) => {
                let score = compare_values(name, def, cv, pv)?;
                let multiplier = if is_driver { 2.0 } else { 1.0 };
                numerator += def.weight * multiplier * score;
                denominator += def.weight * multiplier;
                if is_driver && score == 0.0 {
                    outcome.non_transferable = true;
                    outcome
                        .non_transferable_reasons
                        .push(format!("driver {name:?} contradicts the case"));
                }
                outcome.contributions.push(FactorContribution {
                    field: name.clone(),
                    score,
                    weight: def.weight,
                    multiplier,
                    is_driver,
                    case_value: cv.clone(),
                    precedent_value: pv.clone(),
                });
            }
            (None, Some(_)) if is_driver => {
                outcome.non_transferable = true;
                outcome
                    .non_transferable_reasons
                    .push(format!("driver {name:?} is absent from the case"));
            }
            _ => {}
        }
    }

    outcome.similarity = if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    };
    Ok(outcome)
}

/// The five typed comparators. Every score lands in [0, 1].
pub fn compare_values(
    field: &str,
    def: &FieldDef,
    a: &FieldValue,
    b: &FieldValue,
) -> Result<f64, DgError> {
    match def.comparison {
        ComparisonFn::Exact => Ok(if a == b { 1.0 } else { 0.0 }),
        ComparisonFn::EquivalenceClass => {
            if a == b {
                return Ok(1.0);
            }
            match (classify(def, a), classify(def, b)) {
                (Some(ca), Some(cb)) if ca == cb => Ok(1.0),
                _ => Ok(0.0),
            }
        }
        ComparisonFn::DistanceDecay => {
            let (FieldValue::Int(x), FieldValue::Int(y)) = (a, b) else {
                return Err(DgError::InvalidField {
                    field: field.to_string(),
                    detail: format!(
                        "distance decay compares integers, got {}/{}",
                        a.type_name(),
                        b.type_name()
                    ),
                });
            };
            let max = def.max_distance.expect("validated at registry load") as f64;
            let distance = (x - y).abs() as f64;
            Ok((1.0 - distance / max).clamp(0.0, 1.0))
        }
        ComparisonFn::Step => {
            let pos = |v: &FieldValue| -> Result<usize, DgError> {
                let FieldValue::Text(s) = v else {
                    return Err(DgError::InvalidField {
                        field: field.to_string(),
                        detail: format!("ordinal values are text, got {}", v.type_name()),
                    });
                };
                def.ordered_values.iter().position(|o| o == s).ok_or_else(|| {
                    DgError::InvalidField {
                        field: field.to_string(),
                        detail: format!("{s:?} is not on the ordinal scale"),
                    }
                })
            };
            let max_steps = def.ordered_values.len().saturating_sub(1);
            if max_steps == 0 {
                return Ok(1.0);
            }
            let diff = pos(a)?.abs_diff(pos(b)?);
            Ok(1.0 - diff as f64 / max_steps as f64)
        }
        ComparisonFn::Jaccard => {
            let (FieldValue::Set(x), FieldValue::Set(y)) = (a, b) else {
                return Err(DgError::InvalidField {
                    field: field.to_string(),
                    detail: format!(
                        "jaccard compares sets, got {}/{}",
                        a.type_name(),
                        b.type_name()
                    ),
                });
            };
            if x.is_empty() && y.is_empty() {
                return Ok(1.0);
            }
            let intersection = x.intersection(y).count() as f64;
            let union = x.union(y).count() as f64;
            Ok(intersection / union)
        }
    }
}

// ── Match classification ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchClass {
    Supporting,
    Contrary,
    Neutral,
}

/// Why a precedent landed in the neutral class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeutralReason {
    UnknownDisposition,
    EddInvolved,
    CrossBasis,
    NonTransferable,
    GateMismatch,
    NonTerminal,
}

/// Classify a scored precedent against the proposed disposition. Evaluated
/// in fixed order; only terminal ALLOW↔BLOCK contradictions count as
/// contrary, and a non-transferable precedent can never support.
pub fn classify_match(
    case: &CaseFacts,
    precedent: &JudgmentPayload,
    non_transferable: bool,
) -> (MatchClass, Option<NeutralReason>) {
    use Disposition::*;

    let (c, p) = (case.disposition, precedent.disposition);

    if c == Unknown || p == Unknown {
        return (MatchClass::Neutral, Some(NeutralReason::UnknownDisposition));
    }
    if (c == Edd || p == Edd) && !(c == Edd && p == Edd && !non_transferable) {
        return (MatchClass::Neutral, Some(NeutralReason::EddInvolved));
    }
    if crate::gate::comparability_cross_basis(case.disposition_basis, precedent.disposition_basis)
    {
        return (MatchClass::Neutral, Some(NeutralReason::CrossBasis));
    }
    if c == p {
        return if non_transferable {
            (MatchClass::Neutral, Some(NeutralReason::NonTransferable))
        } else {
            (MatchClass::Supporting, None)
        };
    }
    if matches!((c, p), (Allow, Block) | (Block, Allow)) {
        return (MatchClass::Contrary, None);
    }
    (MatchClass::Neutral, Some(NeutralReason::NonTerminal))
}
