//! Fluent construction of cells destined for a particular chain.
//!
//! A draft carries everything except the header linkage; `seal_onto` reads
//! the chain's graph id, scheme, and head to finish the header and seal.
//! Use `Ledger::append_with` to build and commit under one writer lock so
//! the head cannot move between sealing and appending.

use decisiongraph_core::cell::{Cell, CellHeader, EvidenceItem, Fact, FactObject, LogicAnchor, Proof};
use decisiongraph_core::constants::CELL_VERSION;
use decisiongraph_core::error::DgError;
use decisiongraph_core::types::{CellType, Confidence, Namespace, SourceQuality, UtcStamp};
use decisiongraph_crypto::{seal, sha256_hex, signed_proof, KeyPair};

use crate::chain::Chain;

pub struct CellDraft {
    cell_type: CellType,
    namespace: Namespace,
    subject: String,
    predicate: String,
    object: FactObject,
    confidence: Confidence,
    source_quality: SourceQuality,
    valid_from: Option<UtcStamp>,
    valid_to: Option<UtcStamp>,
    rule_id: String,
    rule_logic_hash: Option<String>,
    interpreter: String,
    evidence: Vec<EvidenceItem>,
    system_time: Option<UtcStamp>,
    signer: Option<(String, String)>,
}

impl CellDraft {
    pub fn new(cell_type: CellType, namespace: Namespace) -> Self {
        Self {
            cell_type,
            namespace,
            subject: String::new(),
            predicate: String::new(),
            object: FactObject::Text(String::new()),
            confidence: Confidence::CERTAIN,
            source_quality: SourceQuality::Verified,
            valid_from: None,
            valid_to: None,
            rule_id: String::new(),
            rule_logic_hash: None,
            interpreter: decisiongraph_core::constants::GENESIS_INTERPRETER.to_string(),
            evidence: Vec::new(),
            system_time: None,
            signer: None,
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn predicate(mut self, predicate: &str) -> Self {
        self.predicate = predicate.to_string();
        self
    }

    pub fn object(mut self, object: FactObject) -> Self {
        self.object = object;
        self
    }

    pub fn text_object(self, text: &str) -> Self {
        self.object(FactObject::Text(text.to_string()))
    }

    pub fn structured_object(self, value: serde_json::Value) -> Self {
        self.object(FactObject::Structured(value))
    }

    pub fn confidence(mut self, confidence: Confidence, quality: SourceQuality) -> Self {
        self.confidence = confidence;
        self.source_quality = quality;
        self
    }

    pub fn valid_from(mut self, at: UtcStamp) -> Self {
        self.valid_from = Some(at);
        self
    }

    pub fn valid_to(mut self, until: UtcStamp) -> Self {
        self.valid_to = Some(until);
        self
    }

    /// Anchor the producing rule. The logic hash defaults to SHA-256 of the
    /// rule id unless set explicitly.
    pub fn rule(mut self, rule_id: &str) -> Self {
        self.rule_id = rule_id.to_string();
        self
    }

    pub fn rule_logic_hash(mut self, hash: &str) -> Self {
        self.rule_logic_hash = Some(hash.to_string());
        self
    }

    pub fn interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = interpreter.to_string();
        self
    }

    pub fn evidence(mut self, item: EvidenceItem) -> Self {
        self.evidence.push(item);
        self
    }

    pub fn system_time(mut self, at: UtcStamp) -> Self {
        self.system_time = Some(at);
        self
    }

    /// Record who will sign; the signature itself is produced at seal time.
    pub fn signer(mut self, signer_id: &str, key_id: &str) -> Self {
        self.signer = Some((signer_id.to_string(), key_id.to_string()));
        self
    }

    /// Finish the header against `chain`'s head and seal.
    ///
    /// Pass the signing keypair when the draft named a signer; bootstrap
    /// drafts seal unsigned with `signature_required = false`.
    pub fn seal_onto(self, chain: &Chain, keypair: Option<&KeyPair>) -> Result<Cell, DgError> {
        let system_time = match self.system_time {
            Some(t) => t,
            None => {
                let now = UtcStamp::now();
                // A burst of appends within one second must not go backwards.
                if now < *chain.head().system_time() {
                    chain.head().system_time().clone()
                } else {
                    now
                }
            }
        };
        let header = CellHeader {
            version: CELL_VERSION.to_string(),
            graph_id: chain.graph_id().clone(),
            cell_type: self.cell_type,
            system_time: system_time.clone(),
            prev_cell_hash: chain.head().cell_id.clone(),
            hash_scheme: chain.hash_scheme(),
        };
        let fact = Fact {
            namespace: self.namespace,
            subject: self.subject,
            predicate: self.predicate,
            object: self.object,
            confidence: self.confidence,
            source_quality: self.source_quality,
            valid_from: self.valid_from.unwrap_or(system_time),
            valid_to: self.valid_to,
        };
        let anchor = LogicAnchor {
            rule_logic_hash: self
                .rule_logic_hash
                .unwrap_or_else(|| sha256_hex(self.rule_id.as_bytes())),
            rule_id: self.rule_id,
            interpreter: self.interpreter,
        };
        let proof = match (&self.signer, keypair) {
            (Some((signer_id, _key_id)), Some(kp)) => {
                signed_proof(&header, &fact, &anchor, signer_id, kp)?
            }
            (Some(_), None) => return Err(DgError::SignatureInvalid),
            (None, _) => Proof::bootstrap(),
        };
        seal(header, fact, anchor, self.evidence, proof)
    }

    /// Like `seal_onto`, but with an explicit signer id in the proof while
    /// the signature itself comes from `keypair`. Used by bridges, where the
    /// proof names both approvers but one key signs the cell.
    pub fn seal_onto_as(
        self,
        chain: &Chain,
        proof_signer_id: &str,
        keypair: &KeyPair,
    ) -> Result<Cell, DgError> {
        let draft = Self {
            signer: Some((proof_signer_id.to_string(), keypair.key_id.clone())),
            ..self
        };
        draft.seal_onto(chain, Some(keypair))
    }
}
