//! Domain registries: the typed field schema, comparability gates, floors,
//! and outcome mappings a precedent engine runs under. A registry is built
//! by a named factory at process init, validated once, and immutable after.

use std::collections::{BTreeMap, BTreeSet};

use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{Disposition, DispositionBasis, Reporting};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Categorical,
    Numeric,
    Ordinal,
    Set,
}

/// Which comparator scores a field. Resolved by enum tag; see
/// `similarity::compare_values` for the five implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonFn {
    Exact,
    EquivalenceClass,
    DistanceDecay,
    Step,
    Jaccard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldTier {
    /// Gate material: decides comparability, never scored.
    Structural,
    Behavioral,
    Contextual,
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub field_type: FieldType,
    pub comparison: ComparisonFn,
    /// Scoring weight in [0, 1]. Read-side only; never hashed.
    pub weight: f64,
    pub tier: FieldTier,
    pub required: bool,
    pub critical: bool,
    /// For EQUIVALENCE_CLASS: class name → member values.
    pub equivalence_classes: BTreeMap<String, BTreeSet<String>>,
    /// For DISTANCE_DECAY: the distance at which similarity reaches zero.
    pub max_distance: Option<i64>,
    /// For STEP: the ordinal scale, in order.
    pub ordered_values: Vec<String>,
}

impl FieldDef {
    pub fn new(field_type: FieldType, comparison: ComparisonFn, weight: f64, tier: FieldTier) -> Self {
        Self {
            field_type,
            comparison,
            weight,
            tier,
            required: false,
            critical: false,
            equivalence_classes: BTreeMap::new(),
            max_distance: None,
            ordered_values: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self.required = true;
        self
    }

    pub fn classes(mut self, classes: &[(&str, &[&str])]) -> Self {
        for (name, members) in classes {
            self.equivalence_classes.insert(
                name.to_string(),
                members.iter().map(|m| m.to_string()).collect(),
            );
        }
        self
    }

    pub fn max_distance(mut self, distance: i64) -> Self {
        self.max_distance = Some(distance);
        self
    }

    pub fn ordered(mut self, values: &[&str]) -> Self {
        self.ordered_values = values.iter().map(|v| v.to_string()).collect();
        self
    }
}

/// One comparability gate: the named field, classified through its
/// equivalence classes on both sides.
#[derive(Clone, Debug)]
pub struct Gate {
    pub field: String,
}

/// Raw institutional outcome strings → the canonical three-field outcome.
#[derive(Clone, Debug, Default)]
pub struct OutcomeMappings {
    pub disposition: BTreeMap<String, Disposition>,
    pub basis: BTreeMap<String, DispositionBasis>,
    pub reporting: BTreeMap<String, Reporting>,
}

#[derive(Clone, Debug)]
pub struct DomainRegistry {
    pub id: String,
    pub fields: BTreeMap<String, FieldDef>,
    pub comparability_gates: Vec<Gate>,
    pub similarity_floor: f64,
    pub similarity_floor_overrides: BTreeMap<String, f64>,
    pub pool_minimum: usize,
    pub critical_fields: BTreeSet<String>,
    pub outcomes: OutcomeMappings,
}

impl DomainRegistry {
    /// Load a registry by domain id. Unknown ids fail with `DomainNotFound`;
    /// a factory that produces an inconsistent schema fails validation here,
    /// at init, not mid-scoring.
    pub fn load(domain_id: &str) -> Result<DomainRegistry, DgError> {
        let registry = match domain_id {
            "banking_aml" => crate::domains::banking_aml(),
            "insurance_claims" => crate::domains::insurance_claims(),
            other => return Err(DgError::DomainNotFound(other.to_string())),
        };
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> Result<(), DgError> {
        for (name, def) in &self.fields {
            if !(0.0..=1.0).contains(&def.weight) {
                return Err(DgError::InvalidField {
                    field: name.clone(),
                    detail: format!("weight {} outside [0, 1]", def.weight),
                });
            }
            match def.comparison {
                ComparisonFn::EquivalenceClass => {
                    if def.equivalence_classes.is_empty()
                        || def.equivalence_classes.values().any(BTreeSet::is_empty)
                    {
                        return Err(DgError::InvalidField {
                            field: name.clone(),
                            detail: "equivalence classes must be non-empty".to_string(),
                        });
                    }
                }
                ComparisonFn::Step => {
                    if def.ordered_values.is_empty() {
                        return Err(DgError::InvalidField {
                            field: name.clone(),
                            detail: "step comparison needs ordered_values".to_string(),
                        });
                    }
                }
                ComparisonFn::DistanceDecay => match def.max_distance {
                    Some(d) if d > 0 => {}
                    _ => {
                        return Err(DgError::InvalidField {
                            field: name.clone(),
                            detail: "distance decay needs max_distance > 0".to_string(),
                        })
                    }
                },
                ComparisonFn::Exact | ComparisonFn::Jaccard => {}
            }
        }
        for critical in &self.critical_fields {
            if !self.fields.contains_key(critical) {
                return Err(DgError::InvalidField {
                    field: critical.clone(),
                    detail: "critical field is not in the schema".to_string(),
                });
            }
        }
        for gate in &self.comparability_gates {
            match self.fields.get(&gate.field) {
                Some(def) if !def.equivalence_classes.is_empty() => {}
                Some(_) => {
                    return Err(DgError::InvalidField {
                        field: gate.field.clone(),
                        detail: "gate field has no equivalence classes".to_string(),
                    })
                }
                None => {
                    return Err(DgError::InvalidField {
                        field: gate.field.clone(),
                        detail: "gate references a field outside the schema".to_string(),
                    })
                }
            }
        }
        for (typology, floor) in &self.similarity_floor_overrides {
            if !(0.0..=1.0).contains(floor) {
                return Err(DgError::InvalidField {
                    field: typology.clone(),
                    detail: format!("floor override {floor} outside [0, 1]"),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.similarity_floor) {
            return Err(DgError::InvalidField {
                field: "similarity_floor".to_string(),
                detail: format!("{} outside [0, 1]", self.similarity_floor),
            });
        }
        Ok(())
    }

    /// The similarity floor for a precedent, honoring typology overrides.
    pub fn floor_for(&self, typology: Option<&str>) -> f64 {
        typology
            .and_then(|t| self.similarity_floor_overrides.get(t))
            .copied()
            .unwrap_or(self.similarity_floor)
    }

    pub fn map_disposition(&self, raw: &str) -> Disposition {
        self.outcomes
            .disposition
            .get(raw)
            .copied()
            .unwrap_or(Disposition::Unknown)
    }

    pub fn map_basis(&self, raw: &str) -> DispositionBasis {
        self.outcomes
            .basis
            .get(raw)
            .copied()
            .unwrap_or(DispositionBasis::Unknown)
    }

    pub fn map_reporting(&self, raw: &str) -> Reporting {
        self.outcomes
            .reporting
            .get(raw)
            .copied()
            .unwrap_or(Reporting::Unknown)
    }
}
