use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{self, assert_no_floats};
use crate::error::DgError;
use crate::types::{
    CellId, CellType, Confidence, GraphId, HashScheme, Namespace, SourceQuality, UtcStamp,
};

// ── FactObject ────────────────────────────────────────────────────────────────

/// The object position of a fact triple.
///
/// Legacy chains carry plain strings; canonical chains may carry structured
/// JSON. Floats are rejected in either case before a value can reach sealed
/// bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactObject {
    Text(String),
    Structured(Value),
}

impl FactObject {
    /// The string form required by the legacy concat scheme.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FactObject::Text(s) => Some(s),
            FactObject::Structured(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FactObject::Text(s) => s.is_empty(),
            FactObject::Structured(v) => v.is_null(),
        }
    }

    /// Reject IEEE-754 floats anywhere inside the value.
    pub fn validate(&self) -> Result<(), DgError> {
        match self {
            FactObject::Text(_) => Ok(()),
            FactObject::Structured(v) => assert_no_floats(v, "fact.object"),
        }
    }
}

impl From<&str> for FactObject {
    fn from(s: &str) -> Self {
        FactObject::Text(s.to_string())
    }
}

// ── Header / Fact / LogicAnchor / Evidence / Proof ────────────────────────────

/// Fixed header present on every cell. All fields are sealed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellHeader {
    pub version: String,
    pub graph_id: GraphId,
    pub cell_type: CellType,
    pub system_time: UtcStamp,
    pub prev_cell_hash: CellId,
    pub hash_scheme: HashScheme,
}

/// The fact triple with bitemporal validity. All fields are sealed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub namespace: Namespace,
    pub subject: String,
    pub predicate: String,
    pub object: FactObject,
    pub confidence: Confidence,
    pub source_quality: SourceQuality,
    pub valid_from: UtcStamp,
    /// None = open-ended validity.
    pub valid_to: Option<UtcStamp>,
}

/// Which rule produced this cell, under which interpreter. Sealed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogicAnchor {
    pub rule_id: String,
    pub rule_logic_hash: String,
    pub interpreter: String,
}

/// A reference to supporting material. Evidence is outside the seal; it is
/// bound through `Proof::merkle_root` instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub evidence_type: String,
    pub content_id: String,
    pub source: String,
    pub payload_hash: String,
    pub description: String,
}

/// Signature block. `signature` covers the canonical sealed bytes; the seal
/// itself never covers this block (a signature cannot sign itself).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(default)]
    pub signer_id: Option<String>,
    #[serde(default)]
    pub signer_key_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub merkle_root: Option<String>,
    pub signature_required: bool,
}

impl Proof {
    /// Bootstrap proof: explicitly unsigned.
    pub fn bootstrap() -> Self {
        Self {
            signer_id: None,
            signer_key_id: None,
            signature: None,
            merkle_root: None,
            signature_required: false,
        }
    }
}

// ── Cell ──────────────────────────────────────────────────────────────────────

/// An atomic, sealed ledger record. Immutable once sealed: `cell_id` is a
/// pure function of (header ⊕ fact ⊕ logic_anchor), so any mutation of a
/// sealed field, the graph id, or the namespace invalidates the seal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub header: CellHeader,
    pub fact: Fact,
    pub logic_anchor: LogicAnchor,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    pub proof: Proof,
    pub cell_id: CellId,
}

impl Cell {
    pub fn id(&self) -> &CellId {
        &self.cell_id
    }

    pub fn cell_type(&self) -> CellType {
        self.header.cell_type
    }

    pub fn namespace(&self) -> &Namespace {
        &self.fact.namespace
    }

    pub fn system_time(&self) -> &UtcStamp {
        &self.header.system_time
    }

    /// Assemble the bytes the seal (and any signature) covers, per the
    /// header's hash scheme.
    pub fn sealed_bytes(&self) -> Result<Vec<u8>, DgError> {
        sealed_bytes(&self.header, &self.fact, &self.logic_anchor)
    }

    /// Wire-format JSON for the WAL and external consumers.
    pub fn to_wire_json(&self) -> Result<Vec<u8>, DgError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_wire_json(bytes: &[u8]) -> Result<Self, DgError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Assemble sealed bytes for a prospective cell, before a `cell_id` exists.
///
/// `legacy:concat:v1` concatenates the documented field sequence as UTF-8 and
/// only supports string objects. `canon:rfc8785:v1` emits canonical JSON of
/// the sealed document `{fact, header, logic_anchor}`.
pub fn sealed_bytes(
    header: &CellHeader,
    fact: &Fact,
    anchor: &LogicAnchor,
) -> Result<Vec<u8>, DgError> {
    fact.object.validate()?;
    match header.hash_scheme {
        HashScheme::LegacyConcatV1 => {
            let object = fact.object.as_text().ok_or_else(|| {
                DgError::HashSchemeMismatch(
                    "legacy:concat:v1 seals string objects only".to_string(),
                )
            })?;
            let mut out = String::new();
            for part in [
                header.version.as_str(),
                header.graph_id.as_str(),
                header.cell_type.as_str(),
                header.system_time.as_str(),
                header.prev_cell_hash.as_str(),
                fact.namespace.as_str(),
                fact.subject.as_str(),
                fact.predicate.as_str(),
                object,
                anchor.rule_id.as_str(),
                anchor.rule_logic_hash.as_str(),
            ] {
                out.push_str(part);
            }
            Ok(out.into_bytes())
        }
        HashScheme::CanonRfc8785V1 => {
            let doc = serde_json::json!({
                "header": header,
                "fact": fact,
                "logic_anchor": anchor,
            });
            canonical::to_canonical_bytes(&doc)
        }
    }
}
