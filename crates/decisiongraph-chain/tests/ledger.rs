//! Ledger-level integration tests: genesis admission, graph binding,
//! hash-link discipline, journal recovery.
//!
//! Run with:
//!   cargo test -p decisiongraph-chain --test ledger

use std::path::PathBuf;
use std::sync::Arc;

use decisiongraph_chain::{CellDraft, Chain, Ledger};
use decisiongraph_core::cell::FactObject;
use decisiongraph_core::error::DgError;
use decisiongraph_core::types::{CellType, Confidence, Namespace, SourceQuality, UtcStamp};
use decisiongraph_crypto::StaticKeyResolver;
use decisiongraph_genesis::{create_genesis, verify_genesis, GenesisSpec};
use decisiongraph_wal::Wal;

fn acme_spec() -> GenesisSpec {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut spec =
        GenesisSpec::bootstrap("AcmeCorp", Namespace::parse("acme").unwrap(), "founder:acme");
    // Pin the mint instant so appended test cells stay monotone.
    spec.at = Some(UtcStamp::parse("2026-01-01T00:00:00Z").unwrap());
    spec
}

fn resolver() -> Arc<StaticKeyResolver> {
    Arc::new(StaticKeyResolver::new())
}

fn salary_draft(amount: &str, stamp: &str) -> CellDraft {
    CellDraft::new(CellType::Fact, Namespace::parse("acme.hr").unwrap())
        .subject("employee:jane_doe")
        .predicate("has_salary")
        .object(FactObject::from(amount))
        .confidence(
            Confidence::from_basis_points(9_000).unwrap(),
            SourceQuality::Verified,
        )
        .rule("hr:salary:v2")
        .system_time(UtcStamp::parse(stamp).unwrap())
}

// ── Genesis round trip ────────────────────────────────────────────────────────

#[test]
fn genesis_round_trip() {
    let genesis = create_genesis(&acme_spec(), None).unwrap();
    let (ok, failures) = verify_genesis(&genesis, false);
    assert!(ok, "genesis failed checks: {failures:?}");
    assert!(genesis.header.prev_cell_hash.is_null());
    assert_eq!(
        genesis.fact.valid_from.as_str(),
        genesis.header.system_time.as_str()
    );
    assert!(decisiongraph_crypto::verify_integrity(&genesis));

    // Wire round trip preserves the seal.
    let wire = genesis.to_wire_json().unwrap();
    let parsed = decisiongraph_core::cell::Cell::from_wire_json(&wire).unwrap();
    assert_eq!(parsed.cell_id, genesis.cell_id);
    assert!(decisiongraph_crypto::verify_integrity(&parsed));
}

#[test]
fn exactly_one_null_hash_per_chain() {
    let ledger = Ledger::new(
        create_genesis(&acme_spec(), None).unwrap(),
        resolver(),
        (),
        None,
    )
    .unwrap();
    ledger
        .append_with(|chain| salary_draft("150000", "2026-01-02T00:00:00Z").seal_onto(chain, None))
        .unwrap();
    ledger
        .append_with(|chain| salary_draft("165000", "2026-07-02T00:00:00Z").seal_onto(chain, None))
        .unwrap();

    let guard = ledger.read();
    let nulls = guard
        .chain
        .iter()
        .filter(|c| c.header.prev_cell_hash.is_null())
        .count();
    assert_eq!(nulls, 1);
    assert!(guard.chain.genesis().header.prev_cell_hash.is_null());
}

// ── Graph binding ─────────────────────────────────────────────────────────────

#[test]
fn append_rejects_cross_graph_cell() {
    let ledger_a = Ledger::new(
        create_genesis(&acme_spec(), None).unwrap(),
        resolver(),
        (),
        None,
    )
    .unwrap();

    let spec_b = GenesisSpec::bootstrap(
        "OtherCorp",
        Namespace::parse("other").unwrap(),
        "founder:other",
    );
    let chain_b = Chain::new(create_genesis(&spec_b, None).unwrap()).unwrap();
    let foreign = salary_draft("150000", "2026-01-02T00:00:00Z")
        .seal_onto(&chain_b, None)
        .unwrap();

    let err = ledger_a.append(foreign).unwrap_err();
    assert!(matches!(err, DgError::GraphIdMismatch { .. }));
    assert_eq!(ledger_a.read().chain.len(), 1, "chain A must be unchanged");
}

#[test]
fn append_rejects_second_genesis() {
    let ledger = Ledger::new(
        create_genesis(&acme_spec(), None).unwrap(),
        resolver(),
        (),
        None,
    )
    .unwrap();
    let mut spec = acme_spec();
    spec.graph_id = Some(ledger.read().chain.graph_id().clone());
    let second = create_genesis(&spec, None).unwrap();
    assert!(matches!(
        ledger.append(second),
        Err(DgError::GenesisViolation(_))
    ));
}

// ── Hash link and time discipline ─────────────────────────────────────────────

#[test]
fn chain_break_and_temporal_violations() {
    let ledger = Ledger::new(
        create_genesis(&acme_spec(), None).unwrap(),
        resolver(),
        (),
        None,
    )
    .unwrap();
    ledger
        .append_with(|chain| salary_draft("150000", "2026-06-01T00:00:00Z").seal_onto(chain, None))
        .unwrap();

    // Build a cell linked to the genesis rather than the head.
    let stale = {
        let guard = ledger.read();
        let genesis_only = Chain::new(guard.chain.genesis().clone()).unwrap();
        salary_draft("160000", "2026-06-02T00:00:00Z")
            .seal_onto(&genesis_only, None)
            .unwrap()
    };
    assert!(matches!(ledger.append(stale), Err(DgError::ChainBreak { .. })));

    // Correct link, but system_time goes backwards.
    let err = ledger
        .append_with(|chain| salary_draft("170000", "2026-01-01T00:00:00Z").seal_onto(chain, None))
        .unwrap_err();
    assert!(matches!(err, DgError::TemporalViolation { .. }));

    assert_eq!(ledger.read().chain.len(), 2);
}

#[test]
fn tampered_cell_fails_integrity() {
    let ledger = Ledger::new(
        create_genesis(&acme_spec(), None).unwrap(),
        resolver(),
        (),
        None,
    )
    .unwrap();
    let mut cell = {
        let guard = ledger.read();
        salary_draft("150000", "2026-06-01T00:00:00Z")
            .seal_onto(&guard.chain, None)
            .unwrap()
    };
    cell.fact.object = FactObject::from("999999");
    assert!(matches!(
        ledger.append(cell),
        Err(DgError::IntegrityViolation(_))
    ));
}

#[test]
fn monotonicity_holds_across_the_chain() {
    let ledger = Ledger::new(
        create_genesis(&acme_spec(), None).unwrap(),
        resolver(),
        (),
        None,
    )
    .unwrap();
    for (amount, stamp) in [
        ("150000", "2026-01-02T00:00:00Z"),
        ("155000", "2026-03-02T00:00:00Z"),
        ("155000", "2026-03-02T00:00:00Z"),
        ("165000", "2026-07-02T00:00:00Z"),
    ] {
        ledger
            .append_with(|chain| salary_draft(amount, stamp).seal_onto(chain, None))
            .unwrap();
    }
    let guard = ledger.read();
    let cells: Vec<_> = guard.chain.iter().collect();
    for pair in cells.windows(2) {
        assert_eq!(pair[1].header.prev_cell_hash, pair[0].cell_id);
        assert!(pair[1].header.system_time >= pair[0].header.system_time);
    }
    assert!(guard.chain.validate(&StaticKeyResolver::new()).is_ok());
}

// ── Journal recovery ──────────────────────────────────────────────────────────

fn temp_wal(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("decisiongraph_ledger_tests");
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn recovery_replays_the_journal_through_the_gate() {
    let path = temp_wal("recovery.wal");
    let head_before = {
        let wal = Wal::open(&path).unwrap();
        let ledger = Ledger::new(
            create_genesis(&acme_spec(), None).unwrap(),
            resolver(),
            (),
            Some(Box::new(wal)),
        )
        .unwrap();
        ledger
            .append_with(|chain| {
                salary_draft("150000", "2026-01-02T00:00:00Z").seal_onto(chain, None)
            })
            .unwrap();
        ledger
            .append_with(|chain| {
                salary_draft("165000", "2026-07-02T00:00:00Z").seal_onto(chain, None)
            })
            .unwrap();
        ledger.head_id()
    };

    let wal = Wal::open(&path).unwrap();
    let outcome = wal.replay().unwrap();
    assert_eq!(outcome.records.len(), 3);
    let recovered = Ledger::recover(
        outcome.records,
        resolver(),
        (),
        Some(Box::new(wal)),
    )
    .unwrap();
    assert_eq!(recovered.head_id(), head_before);
    assert_eq!(recovered.read().chain.len(), 3);

    // The recovered ledger accepts further appends.
    recovered
        .append_with(|chain| salary_draft("170000", "2026-09-02T00:00:00Z").seal_onto(chain, None))
        .unwrap();
    let _ = std::fs::remove_file(&path);
}

#[test]
fn iter_range_is_forward_only() {
    let ledger = Ledger::new(
        create_genesis(&acme_spec(), None).unwrap(),
        resolver(),
        (),
        None,
    )
    .unwrap();
    let first = ledger
        .append_with(|chain| salary_draft("1", "2026-01-02T00:00:00Z").seal_onto(chain, None))
        .unwrap();
    let second = ledger
        .append_with(|chain| salary_draft("2", "2026-01-03T00:00:00Z").seal_onto(chain, None))
        .unwrap();

    let guard = ledger.read();
    let ids: Vec<_> = guard
        .chain
        .iter_range(&first, &second)
        .unwrap()
        .map(|c| c.cell_id.clone())
        .collect();
    assert_eq!(ids, vec![first.clone(), second.clone()]);
    assert!(guard.chain.iter_range(&second, &first).is_err());
}
