//! End-to-end precedent engine tests over a real chain: classification
//! pools, governed confidence, divergence, and the registry queries.
//!
//! Run with:
//!   cargo test -p decisiongraph-precedent --test classification

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use decisiongraph_chain::Ledger;
use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{
    AppealOutcome, Disposition, DispositionBasis, FieldValue, Reporting,
};
use decisiongraph_core::types::{Namespace, UtcStamp};
use decisiongraph_crypto::StaticKeyResolver;
use decisiongraph_genesis::{create_genesis, GenesisSpec};
use decisiongraph_precedent::{
    create_judgment, fingerprint_hash, score, CaseFacts, ConfidenceLevel, Dimension,
    JudgmentInput, Measure, MatchClass, NeutralReason, PrecedentIndex,
};

fn ns(s: &str) -> Namespace {
    Namespace::parse(s).unwrap()
}

fn stamp(s: &str) -> UtcStamp {
    UtcStamp::parse(s).unwrap()
}

fn text(s: &str) -> FieldValue {
    FieldValue::Text(s.to_string())
}

fn set(items: &[&str]) -> FieldValue {
    FieldValue::Set(items.iter().map(|s| s.to_string()).collect())
}

/// The anchored shape shared by the case and the well-matching precedents.
fn matching_anchor(prior_strs: i64) -> BTreeMap<String, FieldValue> {
    let mut facts = BTreeMap::new();
    facts.insert("customer_type".to_string(), text("corporation"));
    facts.insert("product_channel".to_string(), text("international_wire"));
    facts.insert("jurisdiction_risk".to_string(), text("high"));
    facts.insert("transaction_band".to_string(), text("band_50k_250k"));
    facts.insert("structuring_indicator".to_string(), FieldValue::Bool(true));
    facts.insert("pep_exposure".to_string(), FieldValue::Bool(false));
    facts.insert(
        "typology_markers".to_string(),
        set(&["layering", "rapid_movement"]),
    );
    facts.insert("prior_strs_filed".to_string(), FieldValue::Int(prior_strs));
    facts.insert("account_tenure_months".to_string(), FieldValue::Int(24));
    facts.insert("source_of_funds_verified".to_string(), FieldValue::Bool(false));
    facts
}

fn judgment_input(
    case_no: usize,
    anchor: BTreeMap<String, FieldValue>,
    drivers: &[&str],
    disposition: Disposition,
    basis: DispositionBasis,
) -> JudgmentInput {
    JudgmentInput {
        case_id: format!("TM-2025-{case_no:04}"),
        jurisdiction: "CA-ON".to_string(),
        schema_id: "aml:v3".to_string(),
        anchor_facts: anchor,
        disposition,
        disposition_basis: basis,
        reporting: Reporting::FileStr,
        decision_drivers: drivers.iter().map(|s| s.to_string()).collect(),
        driver_typology: None,
        exclusion_codes: ["ec_structuring", "ec_high_risk_geo"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        policy_regime: "pcmltfa:2025-06".to_string(),
        decision_authority: "aml_officer".to_string(),
        appeal_outcome: None,
        amends_precedent_id: None,
    }
}

fn block_case() -> CaseFacts {
    CaseFacts {
        values: matching_anchor(2),
        disposition: Disposition::Block,
        disposition_basis: DispositionBasis::Discretionary,
        typology: None,
    }
}

/// A ledger seeded with the scenario pool: 10 discretionary blocks, one
/// discretionary allow, three discretionary EDDs, two mandatory blocks.
fn scenario_ledger() -> Ledger<PrecedentIndex> {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut spec = GenesisSpec::bootstrap("BankGraph", ns("bank"), "founder:bank");
    spec.at = Some(stamp("2026-01-01T00:00:00Z"));
    let ledger = Ledger::new(
        create_genesis(&spec, None).unwrap(),
        Arc::new(StaticKeyResolver::new()),
        PrecedentIndex::new(),
        None,
    )
    .unwrap();

    let drivers = ["structuring_indicator", "jurisdiction_risk"];
    let mut case_no = 0usize;
    let mut seal = |input: JudgmentInput| {
        case_no += 1;
        let at = stamp(&format!("2026-02-{:02}T00:00:00Z", case_no));
        ledger
            .append_with(|chain| {
                create_judgment(chain, ns("bank.aml"), b"institution-salt", &input, Some(at))
            })
            .unwrap();
    };

    for i in 0..10 {
        seal(judgment_input(
            i,
            matching_anchor(i as i64),
            &drivers,
            Disposition::Block,
            DispositionBasis::Discretionary,
        ));
    }
    seal(judgment_input(
        10,
        matching_anchor(3),
        &drivers,
        Disposition::Allow,
        DispositionBasis::Discretionary,
    ));
    for i in 11..14 {
        seal(judgment_input(
            i,
            matching_anchor(i as i64 - 5),
            &drivers,
            Disposition::Edd,
            DispositionBasis::Discretionary,
        ));
    }
    for i in 14..16 {
        seal(judgment_input(
            i,
            matching_anchor(2),
            &drivers,
            Disposition::Block,
            DispositionBasis::Mandatory,
        ));
    }
    ledger
}

// ── Classification and confidence (the flagship scenario) ─────────────────────

#[test]
fn pool_classification_and_governed_confidence() {
    let ledger = scenario_ledger();
    let guard = ledger.read();
    let report = score(
        &guard.chain,
        &guard.sinks,
        &block_case(),
        "banking_aml",
        &ns("bank.aml"),
        None,
    )
    .unwrap();

    assert_eq!(report.pools.supporting.len(), 10);
    assert_eq!(report.pools.contrary.len(), 1);
    assert_eq!(report.pools.neutral.len(), 5);
    assert!(report.pools.below_floor.is_empty());
    assert!(report.pools.non_transferable.is_empty());

    let edd_neutral = report
        .pools
        .neutral
        .iter()
        .filter(|p| p.neutral_reason == Some(NeutralReason::EddInvolved))
        .count();
    let cross_basis_neutral = report
        .pools
        .neutral
        .iter()
        .filter(|p| p.neutral_reason == Some(NeutralReason::CrossBasis))
        .count();
    assert_eq!(edd_neutral, 3);
    assert_eq!(cross_basis_neutral, 2);

    // 14 scored (cross-basis precedents are barred from scoring).
    let pool_dim = report
        .confidence
        .dimensions
        .iter()
        .find(|d| d.dimension == Dimension::PoolAdequacy)
        .unwrap();
    assert_eq!(pool_dim.measure, Measure::Count(14));
    assert_eq!(pool_dim.level, ConfidenceLevel::Moderate);

    // Outcome consistency: 10 of 11 decisive agree.
    let consistency = report
        .confidence
        .dimensions
        .iter()
        .find(|d| d.dimension == Dimension::OutcomeConsistency)
        .unwrap();
    match &consistency.measure {
        Measure::Ratio(r) => assert!((r - 10.0 / 11.0).abs() < 1e-9),
        other => panic!("expected a ratio, got {other:?}"),
    }
    assert_eq!(consistency.level, ConfidenceLevel::High);

    // Final level is the minimum across dimensions: the pool.
    assert_eq!(report.confidence.level, ConfidenceLevel::Moderate);
    assert!(report
        .confidence
        .bottlenecks
        .contains(&Dimension::PoolAdequacy));

    // Proposal agrees with the pool: no divergence block.
    assert!(report.divergence.is_none());

    // Distinguishing factors cover the strongest precedents.
    assert!(!report.distinguishing.is_empty());
    assert!(report.distinguishing.len() <= 5);
}

#[test]
fn divergent_proposal_gets_a_justification_block() {
    let ledger = scenario_ledger();
    let guard = ledger.read();
    let mut case = block_case();
    case.disposition = Disposition::Allow;

    let report = score(
        &guard.chain,
        &guard.sinks,
        &case,
        "banking_aml",
        &ns("bank.aml"),
        None,
    )
    .unwrap();

    // Now the one allow supports and the ten blocks are contrary.
    assert_eq!(report.pools.supporting.len(), 1);
    assert_eq!(report.pools.contrary.len(), 10);

    let divergence = report.divergence.expect("proposal diverges from the pool");
    assert_eq!(divergence.proposed, Disposition::Allow);
    assert_eq!(divergence.pool_majority, Disposition::Block);
    assert!((divergence.majority_share - 10.0 / 11.0).abs() < 1e-9);
    assert!(!divergence.leading_counterexamples.is_empty());
}

#[test]
fn tied_decisive_pool_emits_no_divergence_block() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut spec = GenesisSpec::bootstrap("BankGraph", ns("bank"), "founder:bank");
    spec.at = Some(stamp("2026-01-01T00:00:00Z"));
    let ledger = Ledger::new(
        create_genesis(&spec, None).unwrap(),
        Arc::new(StaticKeyResolver::new()),
        PrecedentIndex::new(),
        None,
    )
    .unwrap();

    // Two blocks, two allows: dead even.
    let drivers = ["structuring_indicator", "jurisdiction_risk"];
    for (i, disposition) in [
        (0usize, Disposition::Block),
        (1, Disposition::Block),
        (2, Disposition::Allow),
        (3, Disposition::Allow),
    ] {
        let input = judgment_input(
            i,
            matching_anchor(i as i64),
            &drivers,
            disposition,
            DispositionBasis::Discretionary,
        );
        let at = stamp(&format!("2026-02-{:02}T00:00:00Z", i + 1));
        ledger
            .append_with(|chain| {
                create_judgment(chain, ns("bank.aml"), b"institution-salt", &input, Some(at))
            })
            .unwrap();
    }

    let guard = ledger.read();
    let report = score(
        &guard.chain,
        &guard.sinks,
        &block_case(),
        "banking_aml",
        &ns("bank.aml"),
        None,
    )
    .unwrap();
    assert_eq!(report.pools.supporting.len(), 2);
    assert_eq!(report.pools.contrary.len(), 2);
    assert!(
        report.divergence.is_none(),
        "a tied pool has no majority to diverge from"
    );
}

// ── Invariants around transferability and floors ─────────────────────────────

#[test]
fn driver_contradiction_never_supports() {
    let ledger = scenario_ledger();
    let mut anchor = matching_anchor(2);
    anchor.insert("structuring_indicator".to_string(), FieldValue::Bool(false));
    ledger
        .append_with(|chain| {
            create_judgment(
                chain,
                ns("bank.aml"),
                b"institution-salt",
                &judgment_input(
                    90,
                    anchor.clone(),
                    &["structuring_indicator"],
                    Disposition::Block,
                    DispositionBasis::Discretionary,
                ),
                Some(stamp("2026-03-01T00:00:00Z")),
            )
        })
        .unwrap();

    let guard = ledger.read();
    let report = score(
        &guard.chain,
        &guard.sinks,
        &block_case(),
        "banking_aml",
        &ns("bank.aml"),
        None,
    )
    .unwrap();

    assert_eq!(report.pools.non_transferable.len(), 1);
    let nt = &report.pools.non_transferable[0];
    assert_eq!(nt.class, MatchClass::Neutral);
    assert_eq!(nt.neutral_reason, Some(NeutralReason::NonTransferable));
    assert!(report.pools.supporting.len() == 10, "supporting pool unchanged");
}

#[test]
fn weak_matches_fall_below_the_floor() {
    let ledger = scenario_ledger();
    let mut anchor = BTreeMap::new();
    anchor.insert("customer_type".to_string(), text("partnership"));
    anchor.insert("product_channel".to_string(), text("domestic_wire"));
    anchor.insert("jurisdiction_risk".to_string(), text("low"));
    anchor.insert("transaction_band".to_string(), text("under_10k"));
    anchor.insert("structuring_indicator".to_string(), FieldValue::Bool(false));
    anchor.insert("pep_exposure".to_string(), FieldValue::Bool(true));
    anchor.insert("typology_markers".to_string(), set(&["mule_network"]));
    anchor.insert("prior_strs_filed".to_string(), FieldValue::Int(10));
    anchor.insert("account_tenure_months".to_string(), FieldValue::Int(120));
    anchor.insert("source_of_funds_verified".to_string(), FieldValue::Bool(true));
    ledger
        .append_with(|chain| {
            create_judgment(
                chain,
                ns("bank.aml"),
                b"institution-salt",
                &judgment_input(
                    91,
                    anchor.clone(),
                    &[],
                    Disposition::Block,
                    DispositionBasis::Discretionary,
                ),
                Some(stamp("2026-03-01T00:00:00Z")),
            )
        })
        .unwrap();

    let guard = ledger.read();
    let report = score(
        &guard.chain,
        &guard.sinks,
        &block_case(),
        "banking_aml",
        &ns("bank.aml"),
        None,
    )
    .unwrap();
    assert_eq!(report.pools.below_floor.len(), 1);
    assert!(report.pools.below_floor[0].similarity_value().unwrap() < 0.35);
}

#[test]
fn empty_pool_yields_none_confidence_without_percentages() {
    let ledger = scenario_ledger();
    let guard = ledger.read();
    let report = score(
        &guard.chain,
        &guard.sinks,
        &block_case(),
        "banking_aml",
        &ns("bank.retail"),
        None,
    )
    .unwrap();
    assert_eq!(report.pools.total(), 0);
    assert_eq!(report.confidence.level, ConfidenceLevel::None);
    assert!(matches!(
        report.confidence.mean_similarity,
        Measure::NotApplicable { .. }
    ));
}

#[test]
fn unknown_domain_fails_cleanly() {
    let ledger = scenario_ledger();
    let guard = ledger.read();
    let err = score(
        &guard.chain,
        &guard.sinks,
        &block_case(),
        "crypto_custody",
        &ns("bank.aml"),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, DgError::DomainNotFound(_)));
}

// ── Registry queries ──────────────────────────────────────────────────────────

#[test]
fn fingerprint_lookup_and_statistics() {
    let ledger = scenario_ledger();
    let guard = ledger.read();

    // The two mandatory blocks and one discretionary block share the
    // prior_strs_filed = 2 anchor, so they share a fingerprint.
    let fp = fingerprint_hash("aml:v3", &matching_anchor(2)).unwrap();
    let hits = guard
        .sinks
        .find_by_fingerprint(&guard.chain, &fp, &ns("bank.aml"), None);
    assert_eq!(hits.len(), 3);

    let stats = guard.sinks.get_statistics(&guard.chain, &fp, &ns("bank.aml"));
    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.outcome_counts.get(&Disposition::Block), Some(&3));
    assert_eq!(stats.appeal_stats.appealed, 0);

    // Time-scoped lookup excludes later records.
    let early = guard.sinks.find_by_fingerprint(
        &guard.chain,
        &fp,
        &ns("bank.aml"),
        Some(&stamp("2026-02-03T12:00:00Z")),
    );
    assert_eq!(early.len(), 1);
}

#[test]
fn exclusion_code_search_ranks_by_overlap() {
    let ledger = scenario_ledger();
    let guard = ledger.read();
    let codes: BTreeSet<String> = ["ec_structuring", "ec_smurfing"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let hits = guard.sinks.find_by_exclusion_codes(
        &guard.chain,
        &codes,
        &ns("bank.aml"),
        Some(Disposition::Block),
        1,
    );
    assert_eq!(hits.len(), 12, "10 discretionary + 2 mandatory blocks");
    assert!(hits.iter().all(|(_, overlap)| *overlap == 1));

    let none = guard.sinks.find_by_exclusion_codes(
        &guard.chain,
        &codes,
        &ns("bank.aml"),
        None,
        2,
    );
    assert!(none.is_empty(), "only one code overlaps");
}

#[test]
fn appeals_arrive_as_amendments() {
    let ledger = scenario_ledger();
    let original_id = {
        let guard = ledger.read();
        guard
            .sinks
            .all_in(&guard.chain, &ns("bank.aml"), None)
            .first()
            .unwrap()
            .payload
            .precedent_id
            .clone()
    };

    let mut input = judgment_input(
        99,
        matching_anchor(2),
        &["structuring_indicator"],
        Disposition::Allow,
        DispositionBasis::Discretionary,
    );
    input.appeal_outcome = Some(AppealOutcome::Overturned);
    input.amends_precedent_id = Some(original_id.clone());
    ledger
        .append_with(|chain| {
            create_judgment(
                chain,
                ns("bank.aml"),
                b"institution-salt",
                &input,
                Some(stamp("2026-04-01T00:00:00Z")),
            )
        })
        .unwrap();

    let guard = ledger.read();
    let all = guard.sinks.all_in(&guard.chain, &ns("bank.aml"), None);
    let amendment = all
        .iter()
        .find(|r| r.payload.amends_precedent_id.as_deref() == Some(original_id.as_str()))
        .expect("amendment indexed");
    assert_eq!(amendment.payload.appeal_outcome, Some(AppealOutcome::Overturned));
    // The original record is untouched on the chain.
    assert!(all.iter().any(|r| r.payload.precedent_id == original_id));
}
