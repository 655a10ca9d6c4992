//! decisiongraph-genesis
//!
//! Mints the root cell of a graph and verifies it with the full 22-check
//! battery. Genesis is the only cell allowed to point at the null hash and
//! the only place a graph id is born; everything else in the chain descends
//! from it.

pub mod params;

pub use params::GenesisSpec;

use tracing::info;
use uuid::Uuid;

use decisiongraph_core::cell::{Cell, CellHeader, Fact, FactObject, LogicAnchor, Proof};
use decisiongraph_core::constants::{
    CELL_VERSION, GENESIS_INTERPRETER, GENESIS_PREDICATE, GENESIS_RULE_ID, GENESIS_SUBJECT,
};
use decisiongraph_core::error::DgError;
use decisiongraph_core::types::{CellId, CellType, Confidence, GraphId, Namespace, SourceQuality, UtcStamp};
use decisiongraph_crypto::{genesis_rule_logic_hash, seal, signed_proof, verify_integrity, KeyPair};

/// One failed genesis check, by stable code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisFailure {
    pub check: &'static str,
    pub detail: String,
}

impl GenesisFailure {
    fn new(check: &'static str, detail: impl Into<String>) -> Self {
        Self {
            check,
            detail: detail.into(),
        }
    }
}

/// Mint a graph's root cell.
///
/// The genesis fact reads `graph:root instance_of <graph_name>` in the root
/// namespace, at certainty, verified, valid from the mint instant with open
/// validity. Pass a keypair for signed (non-bootstrap) graphs.
pub fn create_genesis(spec: &GenesisSpec, signer: Option<&KeyPair>) -> Result<Cell, DgError> {
    if !spec.root_namespace.is_root() {
        return Err(DgError::InvalidNamespace(format!(
            "root namespace may not contain dots: {}",
            spec.root_namespace
        )));
    }
    if spec.graph_name.is_empty() {
        return Err(DgError::InvalidPayload {
            cell_type: "Genesis".to_string(),
            detail: "graph name must be non-empty".to_string(),
        });
    }

    let graph_id = match &spec.graph_id {
        Some(id) => id.clone(),
        None => GraphId::parse(&format!("graph:{}", Uuid::new_v4()))?,
    };
    let system_time = spec.at.clone().unwrap_or_else(UtcStamp::now);

    let header = CellHeader {
        version: CELL_VERSION.to_string(),
        graph_id,
        cell_type: CellType::Genesis,
        system_time: system_time.clone(),
        prev_cell_hash: CellId::null(),
        hash_scheme: spec.hash_scheme,
    };
    let fact = Fact {
        namespace: spec.root_namespace.clone(),
        subject: GENESIS_SUBJECT.to_string(),
        predicate: GENESIS_PREDICATE.to_string(),
        object: FactObject::Text(spec.graph_name.clone()),
        confidence: Confidence::CERTAIN,
        source_quality: SourceQuality::Verified,
        valid_from: system_time,
        valid_to: None,
    };
    let anchor = LogicAnchor {
        rule_id: GENESIS_RULE_ID.to_string(),
        rule_logic_hash: genesis_rule_logic_hash().to_string(),
        interpreter: GENESIS_INTERPRETER.to_string(),
    };

    let proof = match (spec.bootstrap, signer) {
        (true, _) => Proof::bootstrap(),
        (false, Some(kp)) => signed_proof(&header, &fact, &anchor, &spec.creator, kp)?,
        (false, None) => {
            return Err(DgError::SignatureInvalid);
        }
    };

    let cell = seal(header, fact, anchor, Vec::new(), proof)?;
    info!(
        graph_id = %cell.header.graph_id,
        root_namespace = %cell.fact.namespace,
        bootstrap = spec.bootstrap,
        "genesis cell minted"
    );
    Ok(cell)
}

/// Run the 22 genesis checks, collecting every failure rather than stopping
/// at the first. `strict_signature` additionally demands a required,
/// verifiable signature block (no bootstrap escape hatch).
pub fn verify_genesis(cell: &Cell, strict_signature: bool) -> (bool, Vec<GenesisFailure>) {
    let mut failures = Vec::new();
    let mut fail = |check: &'static str, detail: String| {
        failures.push(GenesisFailure::new(check, detail));
    };

    // ── Header (5) ───────────────────────────────────────────────────────────
    if cell.header.cell_type != CellType::Genesis {
        fail("header.cell_type", format!("expected Genesis, got {}", cell.header.cell_type));
    }
    if !cell.header.prev_cell_hash.is_null() {
        fail(
            "header.prev_cell_hash",
            format!("genesis must point at the null hash, got {}", cell.header.prev_cell_hash),
        );
    }
    if cell.header.version != CELL_VERSION {
        fail("header.version", format!("expected {CELL_VERSION}, got {}", cell.header.version));
    }
    if GraphId::parse(cell.header.graph_id.as_str()).is_err() {
        fail("header.graph_id", format!("malformed graph id {}", cell.header.graph_id));
    }
    if UtcStamp::parse(cell.header.system_time.as_str()).is_err() {
        fail("header.system_time", format!("not ISO-8601 UTC-Z: {}", cell.header.system_time));
    }

    // ── Fact (9) ─────────────────────────────────────────────────────────────
    if !cell.fact.namespace.is_root() || Namespace::parse_root(cell.fact.namespace.as_str()).is_err()
    {
        fail("fact.namespace_root", format!("{} is not a root namespace", cell.fact.namespace));
    }
    if cell.fact.subject != GENESIS_SUBJECT {
        fail("fact.subject", format!("expected {GENESIS_SUBJECT}, got {}", cell.fact.subject));
    }
    if cell.fact.predicate != GENESIS_PREDICATE {
        fail("fact.predicate", format!("expected {GENESIS_PREDICATE}, got {}", cell.fact.predicate));
    }
    if cell.fact.object.is_empty() {
        fail("fact.object", "graph name object must be non-empty".to_string());
    }
    if !cell.fact.confidence.is_certain() {
        fail(
            "fact.confidence",
            format!("genesis asserts at certainty, got {}bp", cell.fact.confidence.basis_points()),
        );
    }
    if cell.fact.source_quality != SourceQuality::Verified {
        fail("fact.source_quality", format!("expected verified, got {:?}", cell.fact.source_quality));
    }
    if UtcStamp::parse(cell.fact.valid_from.as_str()).is_err() {
        fail("fact.valid_from", format!("not ISO-8601 UTC-Z: {}", cell.fact.valid_from));
    }
    if cell.fact.valid_to.is_some() {
        fail("fact.valid_to", "genesis validity is open-ended".to_string());
    }
    if cell.fact.valid_from.as_str() != cell.header.system_time.as_str() {
        fail(
            "fact.valid_alignment",
            format!(
                "valid_from {} must equal system_time {}",
                cell.fact.valid_from, cell.header.system_time
            ),
        );
    }

    // ── Logic anchor (3) ─────────────────────────────────────────────────────
    if cell.logic_anchor.rule_id != GENESIS_RULE_ID {
        fail("anchor.rule_id", format!("expected {GENESIS_RULE_ID}, got {}", cell.logic_anchor.rule_id));
    }
    if cell.logic_anchor.rule_logic_hash != genesis_rule_logic_hash() {
        fail("anchor.rule_logic_hash", "rule logic hash does not match the genesis rule".to_string());
    }
    if cell.logic_anchor.interpreter != GENESIS_INTERPRETER {
        fail(
            "anchor.interpreter",
            format!("expected {GENESIS_INTERPRETER}, got {}", cell.logic_anchor.interpreter),
        );
    }

    // ── Evidence (1) ─────────────────────────────────────────────────────────
    if !cell.evidence.is_empty() {
        fail("evidence.empty", format!("genesis carries no evidence, found {}", cell.evidence.len()));
    }

    // ── Proof (3) ────────────────────────────────────────────────────────────
    if cell.proof.signature_required && cell.proof.signature.is_none() {
        fail("proof.signature_presence", "signature required but absent".to_string());
    }
    if strict_signature && !cell.proof.signature_required {
        fail("proof.strict_mode", "strict verification demands a required signature".to_string());
    }
    if cell.proof.signature.is_some() && cell.proof.signer_key_id.is_none() {
        fail("proof.key_id", "signature present without a signer key id".to_string());
    }

    // ── Integrity (1) ────────────────────────────────────────────────────────
    if !verify_integrity(cell) {
        fail("integrity.seal", "seal does not recompute from sealed fields".to_string());
    }

    (failures.is_empty(), failures)
}
