//! Property tests: every comparator lands in [0, 1] and behaves like a
//! similarity (identical inputs score 1, symmetry holds).

use proptest::prelude::*;
use std::collections::BTreeSet;

use decisiongraph_core::payload::FieldValue;
use decisiongraph_precedent::{compare_values, ComparisonFn, DomainRegistry};

fn registry() -> DomainRegistry {
    DomainRegistry::load("banking_aml").unwrap()
}

fn arb_set() -> impl Strategy<Value = FieldValue> {
    prop::collection::btree_set("[a-z_]{1,10}", 0..6).prop_map(FieldValue::Set)
}

proptest! {
    #[test]
    fn distance_decay_is_bounded_and_symmetric(a in -500i64..500, b in -500i64..500) {
        let reg = registry();
        let def = reg.fields.get("account_tenure_months").unwrap();
        let ab = compare_values("account_tenure_months", def, &FieldValue::Int(a), &FieldValue::Int(b)).unwrap();
        let ba = compare_values("account_tenure_months", def, &FieldValue::Int(b), &FieldValue::Int(a)).unwrap();
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(ab, ba);
        if a == b {
            prop_assert_eq!(ab, 1.0);
        }
    }

    #[test]
    fn jaccard_is_bounded_and_symmetric(a in arb_set(), b in arb_set()) {
        let reg = registry();
        let def = reg.fields.get("typology_markers").unwrap();
        let ab = compare_values("typology_markers", def, &a, &b).unwrap();
        let ba = compare_values("typology_markers", def, &b, &a).unwrap();
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(ab, ba);
        prop_assert_eq!(compare_values("typology_markers", def, &a, &a).unwrap(), 1.0);
    }

    #[test]
    fn step_is_bounded_over_the_scale(ai in 0usize..4, bi in 0usize..4) {
        let reg = registry();
        let def = reg.fields.get("jurisdiction_risk").unwrap();
        let a = FieldValue::Text(def.ordered_values[ai].clone());
        let b = FieldValue::Text(def.ordered_values[bi].clone());
        let score = compare_values("jurisdiction_risk", def, &a, &b).unwrap();
        prop_assert!((0.0..=1.0).contains(&score));
        if ai == bi {
            prop_assert_eq!(score, 1.0);
        } else {
            prop_assert!(score < 1.0);
        }
    }

    #[test]
    fn exact_is_binary(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        let reg = registry();
        let def = reg.fields.get("structuring_indicator").unwrap();
        prop_assume!(matches!(def.comparison, ComparisonFn::Exact));
        let va = FieldValue::Text(a.clone());
        let vb = FieldValue::Text(b.clone());
        let score = compare_values("structuring_indicator", def, &va, &vb).unwrap();
        prop_assert!(score == 0.0 || score == 1.0);
        prop_assert_eq!(score == 1.0, a == b);
    }
}

/// Empty sets are identical by convention; one-sided emptiness is disjoint.
#[test]
fn jaccard_empty_conventions() {
    let reg = registry();
    let def = reg.fields.get("typology_markers").unwrap();
    let empty = FieldValue::Set(BTreeSet::new());
    let full = FieldValue::Set(["layering".to_string()].into_iter().collect());
    assert_eq!(compare_values("typology_markers", def, &empty, &empty).unwrap(), 1.0);
    assert_eq!(compare_values("typology_markers", def, &empty, &full).unwrap(), 0.0);
}
