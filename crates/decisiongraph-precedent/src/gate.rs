//! Layer 1: the comparability gate.
//!
//! Before any similarity arithmetic, a precedent must be *comparable*:
//! every gate field classifies case and precedent into the same equivalence
//! class, and the decision bases must not straddle the mandatory/
//! discretionary line. The gate is conservative in one direction only — a
//! value it cannot classify passes, because incomparability must be proven,
//! not presumed.

use decisiongraph_core::payload::{DispositionBasis, FieldValue, JudgmentPayload};

use crate::domain::{DomainRegistry, FieldDef};
use crate::engine::CaseFacts;

#[derive(Clone, Debug)]
pub struct GateCheck {
    pub field: String,
    pub case_class: Option<String>,
    pub precedent_class: Option<String>,
    pub passed: bool,
}

#[derive(Clone, Debug)]
pub struct GateOutcome {
    pub comparable: bool,
    /// The mandatory/discretionary bar specifically — such precedents are
    /// barred from scoring but still reported.
    pub cross_basis: bool,
    pub checks: Vec<GateCheck>,
    pub warnings: Vec<String>,
}

/// Run every gate for `case` against one precedent.
pub fn comparability(
    registry: &DomainRegistry,
    case: &CaseFacts,
    precedent: &JudgmentPayload,
) -> GateOutcome {
    let mut outcome = GateOutcome {
        comparable: true,
        cross_basis: false,
        checks: Vec::new(),
        warnings: Vec::new(),
    };

    // Mandatory and discretionary decisions answer different questions;
    // comparing them is forbidden outright.
    if comparability_cross_basis(case.disposition_basis, precedent.disposition_basis) {
        outcome.comparable = false;
        outcome.cross_basis = true;
        return outcome;
    }

    for gate in &registry.comparability_gates {
        let Some(def) = registry.fields.get(&gate.field) else {
            continue;
        };

        let precedent_class = precedent
            .anchor_facts
            .get(&gate.field)
            .and_then(|v| classify(def, v));

        let case_class = match case.values.get(&gate.field) {
            Some(value) => classify(def, value),
            None => {
                // Fall back to the broadest class rather than refusing to
                // compare a case that omitted a gate field.
                let broadest = broadest_class(def);
                if let Some(class) = &broadest {
                    outcome.warnings.push(format!(
                        "case omits gate field {:?}; assuming broadest class {:?}",
                        gate.field, class
                    ));
                }
                broadest
            }
        };

        let passed = match (&case_class, &precedent_class) {
            // Unclassifiable on either side: cannot prove incomparable.
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a == b,
        };
        if !passed {
            outcome.comparable = false;
        }
        outcome.checks.push(GateCheck {
            field: gate.field.clone(),
            case_class,
            precedent_class,
            passed,
        });
    }

    outcome
}

/// True when the two bases straddle the mandatory/discretionary line.
pub(crate) fn comparability_cross_basis(a: DispositionBasis, b: DispositionBasis) -> bool {
    matches!(
        (a, b),
        (DispositionBasis::Mandatory, DispositionBasis::Discretionary)
            | (DispositionBasis::Discretionary, DispositionBasis::Mandatory)
    )
}

/// Map a value into its equivalence class, if any class lists it.
pub(crate) fn classify(def: &FieldDef, value: &FieldValue) -> Option<String> {
    let key = match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Set(_) => return None,
    };
    def.equivalence_classes
        .iter()
        .find(|(_, members)| members.contains(&key))
        .map(|(class, _)| class.clone())
}

/// The class with the most members; ties break to the lexicographically
/// first name so the fallback is deterministic.
fn broadest_class(def: &FieldDef) -> Option<String> {
    def.equivalence_classes
        .iter()
        .max_by(|(name_a, a), (name_b, b)| {
            a.len().cmp(&b.len()).then_with(|| name_b.cmp(name_a))
        })
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use decisiongraph_core::payload::Disposition;
    use std::collections::BTreeMap;

    fn case_with(field: &str, value: FieldValue) -> CaseFacts {
        let mut values = BTreeMap::new();
        values.insert(field.to_string(), value);
        CaseFacts {
            values,
            disposition: Disposition::Block,
            disposition_basis: DispositionBasis::Discretionary,
            typology: None,
        }
    }

    fn precedent_with(field: &str, value: FieldValue) -> JudgmentPayload {
        let mut anchor_facts = BTreeMap::new();
        anchor_facts.insert(field.to_string(), value);
        JudgmentPayload {
            precedent_id: "p1".to_string(),
            case_id_hash: "00".repeat(32),
            jurisdiction: "CA-ON".to_string(),
            fingerprint_hash: "11".repeat(32),
            schema_id: "aml:v3".to_string(),
            anchor_facts,
            disposition: Disposition::Block,
            disposition_basis: DispositionBasis::Discretionary,
            reporting: decisiongraph_core::payload::Reporting::FileStr,
            decision_drivers: Default::default(),
            driver_typology: None,
            exclusion_codes: Default::default(),
            policy_regime: "pcmltfa:2025-06".to_string(),
            decision_authority: "aml_officer".to_string(),
            appeal_outcome: None,
            amends_precedent_id: None,
        }
    }

    #[test]
    fn same_class_passes_different_class_fails() {
        let registry = crate::domains::banking_aml();
        let case = case_with("customer_type", FieldValue::Text("corporation".to_string()));

        let same = precedent_with("customer_type", FieldValue::Text("partnership".to_string()));
        assert!(comparability(&registry, &case, &same).comparable);

        let other = precedent_with("customer_type", FieldValue::Text("msb".to_string()));
        let outcome = comparability(&registry, &case, &other);
        assert!(!outcome.comparable);
        assert!(!outcome.cross_basis);
    }

    #[test]
    fn cross_basis_is_a_hard_bar() {
        let registry = crate::domains::banking_aml();
        let case = case_with("customer_type", FieldValue::Text("corporation".to_string()));
        let mut precedent =
            precedent_with("customer_type", FieldValue::Text("corporation".to_string()));
        precedent.disposition_basis = DispositionBasis::Mandatory;
        let outcome = comparability(&registry, &case, &precedent);
        assert!(!outcome.comparable);
        assert!(outcome.cross_basis);
    }

    #[test]
    fn missing_case_field_warns_and_uses_broadest_class() {
        let registry = crate::domains::banking_aml();
        let case = case_with("unrelated", FieldValue::Bool(true));
        let precedent =
            precedent_with("customer_type", FieldValue::Text("corporation".to_string()));
        let outcome = comparability(&registry, &case, &precedent);
        assert!(!outcome.warnings.is_empty());
        // Broadest class for customer_type is "msb" (3 members) vs "entity"
        // (3 members): tie breaks to the first name alphabetically.
        let check = outcome.checks.iter().find(|c| c.field == "customer_type").unwrap();
        assert!(check.case_class.is_some());
    }

    #[test]
    fn unclassifiable_value_cannot_prove_incomparable() {
        let registry = crate::domains::banking_aml();
        let case = case_with("customer_type", FieldValue::Text("charity".to_string()));
        let precedent =
            precedent_with("customer_type", FieldValue::Text("corporation".to_string()));
        let outcome = comparability(&registry, &case, &precedent);
        assert!(outcome.comparable, "unknown value passes the gate");
    }
}
