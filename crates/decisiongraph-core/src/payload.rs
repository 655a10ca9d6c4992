//! Typed payloads carried in `fact.object` by specific cell types.
//!
//! Cells are opaque to domain semantics; these structs are the agreed shapes
//! that structural validation and the read-side engines parse back out of
//! the object position. All of them are float-free by construction.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::cell::FactObject;
use crate::error::DgError;
use crate::types::{CellId, Namespace};

/// Parse a typed payload out of a fact object. Structured objects are taken
/// as-is; string objects are accepted if they contain JSON (legacy chains).
pub fn parse_object<T: serde::de::DeserializeOwned>(
    object: &FactObject,
    cell_type: &str,
) -> Result<T, DgError> {
    let value = match object {
        FactObject::Structured(v) => v.clone(),
        FactObject::Text(s) => {
            serde_json::from_str(s).map_err(|e| DgError::InvalidPayload {
                cell_type: cell_type.to_string(),
                detail: format!("object is not a JSON payload: {e}"),
            })?
        }
    };
    serde_json::from_value(value).map_err(|e| DgError::InvalidPayload {
        cell_type: cell_type.to_string(),
        detail: e.to_string(),
    })
}

// ── Authorization payloads ────────────────────────────────────────────────────

/// Cross-namespace read authorization. Must be accompanied by two distinct
/// `bridge_approval` evidence entries — one per namespace owner — and a
/// signer id naming both approvers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgePayload {
    pub source_namespace: Namespace,
    pub target_namespace: Namespace,
}

/// Grants `grantee` the named action on the cell's own namespace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessRulePayload {
    pub grantee: Namespace,
    pub action: String,
}

// ── Policy payloads ───────────────────────────────────────────────────────────

/// One witness's approval of a promotion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessSignature {
    pub witness_id: String,
    pub key_id: String,
    /// Hex-encoded Ed25519 signature over the canonical promotion payload.
    pub signature: String,
}

/// Immutable per-namespace snapshot of the promoted rule set. PolicyHead
/// cells form a linked sub-chain per namespace via `prev_policy_head`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyHeadPayload {
    pub namespace: Namespace,
    /// SHA-256 of the canonical JSON array of the sorted rule ids.
    pub policy_hash: String,
    pub promoted_rule_ids: Vec<String>,
    pub witness_signatures: Vec<WitnessSignature>,
    #[serde(default)]
    pub prev_policy_head: Option<CellId>,
    pub promotion_id: String,
}

/// One witness identity in a witness set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessEntry {
    pub witness_id: String,
    pub key_id: String,
}

/// The per-namespace witness roster and approval threshold, carried by a
/// Rule cell with predicate `witness_set`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessSetPayload {
    pub witnesses: Vec<WitnessEntry>,
    pub threshold: u32,
}

impl WitnessSetPayload {
    pub fn contains(&self, witness_id: &str) -> bool {
        self.witnesses.iter().any(|w| w.witness_id == witness_id)
    }

    pub fn key_id_of(&self, witness_id: &str) -> Option<&str> {
        self.witnesses
            .iter()
            .find(|w| w.witness_id == witness_id)
            .map(|w| w.key_id.as_str())
    }
}

// ── Judgment payloads ─────────────────────────────────────────────────────────

/// Terminal handling of a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Allow,
    Edd,
    Block,
    Unknown,
}

/// Whether the disposition was compelled or chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispositionBasis {
    Mandatory,
    Discretionary,
    Unknown,
}

/// Regulatory filing that accompanied the decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reporting {
    NoReport,
    FileStr,
    FileLctr,
    FileTpr,
    Unknown,
}

/// Outcome of an appeal against a sealed judgment, if one was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppealOutcome {
    Upheld,
    Overturned,
    Withdrawn,
}

/// A field value inside a judgment's anchor facts. Deliberately closed over
/// float-free primitives so anchor facts always canonicalize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Set(BTreeSet<String>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Text(_) => "text",
            FieldValue::Set(_) => "set",
        }
    }
}

/// The sealed decision record a Judgment cell carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgmentPayload {
    // Identity
    pub precedent_id: String,
    /// Salted hash of the institution's case id — linkable by the holder of
    /// the salt, opaque to everyone else.
    pub case_id_hash: String,
    pub jurisdiction: String,

    // Fingerprint
    pub fingerprint_hash: String,
    pub schema_id: String,
    pub anchor_facts: BTreeMap<String, FieldValue>,

    // Canonical outcome
    pub disposition: Disposition,
    pub disposition_basis: DispositionBasis,
    pub reporting: Reporting,

    // Driver metadata
    #[serde(default)]
    pub decision_drivers: BTreeSet<String>,
    #[serde(default)]
    pub driver_typology: Option<String>,
    #[serde(default)]
    pub exclusion_codes: BTreeSet<String>,

    // Provenance
    pub policy_regime: String,
    pub decision_authority: String,
    #[serde(default)]
    pub appeal_outcome: Option<AppealOutcome>,
    /// Set on amendment records that revisit an earlier precedent.
    #[serde(default)]
    pub amends_precedent_id: Option<String>,
}
