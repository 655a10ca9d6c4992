//! Layer 3: governed confidence.
//!
//! Four dimensions — pool adequacy, similarity quality, outcome consistency,
//! evidence completeness — each mapped to a level, with the final level the
//! minimum of the four after hard caps. The governing principle: a number is
//! only ever reported when a real computation produced it. Where no
//! computation is possible, the measure says so and carries the reason.

use decisiongraph_core::payload::FieldValue;
use std::collections::BTreeMap;

use crate::domain::DomainRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceLevel {
    None,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::None => "NONE",
            ConfidenceLevel::Low => "LOW",
            ConfidenceLevel::Moderate => "MODERATE",
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::VeryHigh => "VERY_HIGH",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dimension {
    PoolAdequacy,
    SimilarityQuality,
    OutcomeConsistency,
    EvidenceCompleteness,
}

/// A measured quantity, or an honest refusal to invent one.
#[derive(Clone, Debug, PartialEq)]
pub enum Measure {
    Count(usize),
    Ratio(f64),
    NotApplicable { reason: String },
}

#[derive(Clone, Debug)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub level: ConfidenceLevel,
    pub measure: Measure,
    pub note: Option<String>,
}

#[derive(Clone, Debug)]
pub struct GovernedConfidence {
    pub level: ConfidenceLevel,
    pub dimensions: Vec<DimensionScore>,
    /// The dimensions sitting at the final level — what to fix first.
    pub bottlenecks: Vec<Dimension>,
    /// Hard rules that clamped the result, in application order.
    pub caps_applied: Vec<String>,
    pub explanation: String,
    /// Mean similarity of the scored pool, when one exists.
    pub mean_similarity: Measure,
}

/// Everything the confidence layer needs from the scoring pass.
pub struct ConfidenceInputs<'a> {
    /// Similarities of every scored precedent (gate-passed, above floor,
    /// transferable or neutrally classified).
    pub scored_similarities: &'a [f64],
    pub supporting_count: usize,
    pub contrary_count: usize,
    pub case_values: &'a BTreeMap<String, FieldValue>,
}

pub fn governed_confidence(
    registry: &DomainRegistry,
    inputs: &ConfidenceInputs<'_>,
) -> GovernedConfidence {
    let scored = inputs.scored_similarities.len();

    // Zero scored precedents: nothing to measure, and no percentage may be
    // conjured for the gap.
    if scored == 0 {
        let reason = "no scored precedents".to_string();
        return GovernedConfidence {
            level: ConfidenceLevel::None,
            dimensions: vec![
                DimensionScore {
                    dimension: Dimension::PoolAdequacy,
                    level: ConfidenceLevel::None,
                    measure: Measure::Count(0),
                    note: None,
                },
                DimensionScore {
                    dimension: Dimension::SimilarityQuality,
                    level: ConfidenceLevel::None,
                    measure: Measure::NotApplicable { reason: reason.clone() },
                    note: None,
                },
                DimensionScore {
                    dimension: Dimension::OutcomeConsistency,
                    level: ConfidenceLevel::None,
                    measure: Measure::NotApplicable { reason: reason.clone() },
                    note: None,
                },
                DimensionScore {
                    dimension: Dimension::EvidenceCompleteness,
                    level: ConfidenceLevel::None,
                    measure: Measure::NotApplicable { reason: reason.clone() },
                    note: None,
                },
            ],
            bottlenecks: vec![Dimension::PoolAdequacy],
            caps_applied: vec!["zero scored precedents".to_string()],
            explanation: "No comparable precedents survived gating and the similarity floor; \
                          no confidence can be stated."
                .to_string(),
            mean_similarity: Measure::NotApplicable { reason },
        };
    }

    // ── Pool adequacy ────────────────────────────────────────────────────────
    let pool_level = match scored {
        0 => ConfidenceLevel::None,
        1..=4 => ConfidenceLevel::Low,
        5..=14 => ConfidenceLevel::Moderate,
        15..=49 => ConfidenceLevel::High,
        _ => ConfidenceLevel::VeryHigh,
    };

    // ── Similarity quality ───────────────────────────────────────────────────
    let mean = inputs.scored_similarities.iter().sum::<f64>() / scored as f64;
    let similarity_level = if mean < 0.50 {
        ConfidenceLevel::Low
    } else if mean < 0.70 {
        ConfidenceLevel::Moderate
    } else if mean < 0.85 {
        ConfidenceLevel::High
    } else {
        ConfidenceLevel::VeryHigh
    };

    // ── Outcome consistency ──────────────────────────────────────────────────
    let decisive = inputs.supporting_count + inputs.contrary_count;
    let (consistency_level, consistency_measure, consistency_note) = if decisive == 0 {
        (
            ConfidenceLevel::Moderate,
            Measure::NotApplicable {
                reason: "no decisive precedents".to_string(),
            },
            Some("no decisive precedents; consistency capped".to_string()),
        )
    } else {
        let majority = inputs.supporting_count.max(inputs.contrary_count);
        let ratio = majority as f64 / decisive as f64;
        let level = if ratio < 0.60 {
            ConfidenceLevel::Low
        } else if ratio < 0.80 {
            ConfidenceLevel::Moderate
        } else if ratio < 0.95 {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::VeryHigh
        };
        (level, Measure::Ratio(ratio), None)
    };

    // ── Evidence completeness ────────────────────────────────────────────────
    let required: Vec<&String> = registry
        .fields
        .iter()
        .filter(|(_, def)| def.required)
        .map(|(name, _)| name)
        .collect();
    let present = required
        .iter()
        .filter(|name| inputs.case_values.contains_key(name.as_str()))
        .count();
    let missing_critical: Vec<&String> = registry
        .critical_fields
        .iter()
        .filter(|name| !inputs.case_values.contains_key(name.as_str()))
        .collect();
    let (evidence_level, evidence_measure, evidence_note) = if required.is_empty() {
        (
            ConfidenceLevel::VeryHigh,
            Measure::NotApplicable {
                reason: "schema declares no required fields".to_string(),
            },
            None,
        )
    } else {
        let ratio = present as f64 / required.len() as f64;
        let mut level = if ratio < 0.80 {
            ConfidenceLevel::Low
        } else if ratio < 0.90 {
            ConfidenceLevel::Moderate
        } else if ratio < 0.95 {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::VeryHigh
        };
        let mut note = None;
        if !missing_critical.is_empty() {
            level = level.min(ConfidenceLevel::Low);
            note = Some(format!(
                "critical field(s) absent: {}",
                missing_critical
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        (level, Measure::Ratio(ratio), note)
    };

    // ── Hard caps, then min() ────────────────────────────────────────────────
    let mut caps_applied = Vec::new();
    let mut cap = ConfidenceLevel::VeryHigh;
    if inputs.scored_similarities.iter().all(|s| *s < 0.50) {
        cap = cap.min(ConfidenceLevel::Low);
        caps_applied.push("every scored precedent sits below 50% similarity".to_string());
    }
    if scored < registry.pool_minimum {
        cap = cap.min(ConfidenceLevel::Low);
        caps_applied.push(format!(
            "pool of {scored} is below the domain minimum of {}",
            registry.pool_minimum
        ));
    }
    if decisive == 0 {
        cap = cap.min(ConfidenceLevel::Moderate);
        caps_applied.push("no decisive precedents".to_string());
    }

    let dimensions = vec![
        DimensionScore {
            dimension: Dimension::PoolAdequacy,
            level: pool_level,
            measure: Measure::Count(scored),
            note: None,
        },
        DimensionScore {
            dimension: Dimension::SimilarityQuality,
            level: similarity_level,
            measure: Measure::Ratio(mean),
            note: None,
        },
        DimensionScore {
            dimension: Dimension::OutcomeConsistency,
            level: consistency_level,
            measure: consistency_measure,
            note: consistency_note,
        },
        DimensionScore {
            dimension: Dimension::EvidenceCompleteness,
            level: evidence_level,
            measure: evidence_measure,
            note: evidence_note,
        },
    ];

    let floor_level = dimensions
        .iter()
        .map(|d| d.level)
        .min()
        .expect("four dimensions");
    let level = floor_level.min(cap);
    let bottlenecks: Vec<Dimension> = dimensions
        .iter()
        .filter(|d| d.level == level)
        .map(|d| d.dimension)
        .collect();

    let explanation = format!(
        "{} confidence over {scored} scored precedents (mean similarity {:.2}); \
         limited by {}",
        level.as_str(),
        mean,
        if caps_applied.is_empty() {
            format!("{bottlenecks:?}")
        } else {
            caps_applied.join("; ")
        }
    );

    GovernedConfidence {
        level,
        dimensions,
        bottlenecks,
        caps_applied,
        explanation,
        mean_similarity: Measure::Ratio(mean),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_case_values() -> BTreeMap<String, FieldValue> {
        let registry = crate::domains::banking_aml();
        registry
            .fields
            .iter()
            .map(|(name, def)| {
                let value = match def.field_type {
                    crate::domain::FieldType::Boolean => FieldValue::Bool(true),
                    crate::domain::FieldType::Numeric => FieldValue::Int(1),
                    crate::domain::FieldType::Set => FieldValue::Set(Default::default()),
                    _ => FieldValue::Text("high".to_string()),
                };
                (name.clone(), value)
            })
            .collect()
    }

    #[test]
    fn zero_pool_is_none_with_no_percentage() {
        let registry = crate::domains::banking_aml();
        let values = full_case_values();
        let out = governed_confidence(
            &registry,
            &ConfidenceInputs {
                scored_similarities: &[],
                supporting_count: 0,
                contrary_count: 0,
                case_values: &values,
            },
        );
        assert_eq!(out.level, ConfidenceLevel::None);
        assert!(matches!(out.mean_similarity, Measure::NotApplicable { .. }));
        assert!(!out.explanation.is_empty());
    }

    #[test]
    fn final_level_is_the_minimum_dimension() {
        let registry = crate::domains::banking_aml();
        let values = full_case_values();
        // 14 scored: pool Moderate. 10/11 decisive: High. Mean sim 0.9: VeryHigh.
        let sims: Vec<f64> = vec![0.9; 14];
        let out = governed_confidence(
            &registry,
            &ConfidenceInputs {
                scored_similarities: &sims,
                supporting_count: 10,
                contrary_count: 1,
                case_values: &values,
            },
        );
        assert_eq!(out.level, ConfidenceLevel::Moderate);
        assert!(out.bottlenecks.contains(&Dimension::PoolAdequacy));
    }

    #[test]
    fn all_below_half_similarity_caps_at_low() {
        let registry = crate::domains::banking_aml();
        let values = full_case_values();
        let sims: Vec<f64> = vec![0.45; 20];
        let out = governed_confidence(
            &registry,
            &ConfidenceInputs {
                scored_similarities: &sims,
                supporting_count: 18,
                contrary_count: 0,
                case_values: &values,
            },
        );
        assert_eq!(out.level, ConfidenceLevel::Low);
        assert!(!out.caps_applied.is_empty());
    }

    #[test]
    fn no_decisive_pool_caps_at_moderate() {
        let registry = crate::domains::banking_aml();
        let values = full_case_values();
        let sims: Vec<f64> = vec![0.9; 20];
        let out = governed_confidence(
            &registry,
            &ConfidenceInputs {
                scored_similarities: &sims,
                supporting_count: 0,
                contrary_count: 0,
                case_values: &values,
            },
        );
        assert!(out.level <= ConfidenceLevel::Moderate);
        let consistency = out
            .dimensions
            .iter()
            .find(|d| d.dimension == Dimension::OutcomeConsistency)
            .unwrap();
        assert!(matches!(consistency.measure, Measure::NotApplicable { .. }));
    }

    #[test]
    fn missing_critical_field_caps_evidence_at_low() {
        let registry = crate::domains::banking_aml();
        let mut values = full_case_values();
        values.remove("structuring_indicator");
        let sims: Vec<f64> = vec![0.9; 20];
        let out = governed_confidence(
            &registry,
            &ConfidenceInputs {
                scored_similarities: &sims,
                supporting_count: 18,
                contrary_count: 1,
                case_values: &values,
            },
        );
        let evidence = out
            .dimensions
            .iter()
            .find(|d| d.dimension == Dimension::EvidenceCompleteness)
            .unwrap();
        assert_eq!(evidence.level, ConfidenceLevel::Low);
        assert_eq!(out.level, ConfidenceLevel::Low);
    }
}
