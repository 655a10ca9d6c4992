//! The promotion state machine.
//!
//! A PromotionRequest lives in process memory only; the chain hears about a
//! promotion exactly once, when `finalize` appends the PolicyHead cell.
//! Witness signatures accumulate against the namespace's active witness set;
//! reaching the threshold arms the request, and finalization is always an
//! explicit second step.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use decisiongraph_chain::{CellDraft, CellSink, Chain, Ledger};
use decisiongraph_core::constants::PROMOTE_POLICY_ACTION;
use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{PolicyHeadPayload, WitnessSignature};
use decisiongraph_core::to_canonical_bytes;
use decisiongraph_core::types::{CellId, CellType, Namespace, UtcStamp};
use decisiongraph_crypto::{policy_hash, verify_detached, KeyResolver};

use crate::witness::{active_witness_set, latest_policy_head};

/// Where a request sits in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromotionState {
    Pending,
    ReadyToFinalize,
    Finalized,
    Archived,
}

impl PromotionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionState::Pending => "PENDING",
            PromotionState::ReadyToFinalize => "READY_TO_FINALIZE",
            PromotionState::Finalized => "FINALIZED",
            PromotionState::Archived => "ARCHIVED",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PromotionRequest {
    pub id: String,
    pub namespace: Namespace,
    /// Sorted and deduplicated at submission.
    pub rule_ids: Vec<String>,
    pub submitter: String,
    pub signatures: Vec<WitnessSignature>,
    pub state: PromotionState,
    pub submitted_at: Instant,
}

/// A snapshot of request state for callers; the live request stays private.
#[derive(Clone, Debug)]
pub struct PromotionStatus {
    pub id: String,
    pub namespace: Namespace,
    pub state: PromotionState,
    pub signature_count: usize,
    pub rule_ids: Vec<String>,
}

/// The canonical bytes a witness signs to approve a promotion.
pub fn promotion_signing_bytes(
    namespace: &Namespace,
    promotion_id: &str,
    rule_ids: &[String],
) -> Vec<u8> {
    let mut sorted: Vec<&String> = rule_ids.iter().collect();
    sorted.sort_unstable();
    sorted.dedup();
    let value = serde_json::json!({
        "action": PROMOTE_POLICY_ACTION,
        "namespace": namespace,
        "promotion_id": promotion_id,
        "promoted_rule_ids": sorted,
    });
    to_canonical_bytes(&value).expect("promotion payload has no floats")
}

/// Per-chain promotion coordinator. Thread-safe; all request state sits
/// behind one mutex, separate from the chain's writer lock.
pub struct PromotionManager {
    requests: Mutex<HashMap<String, PromotionRequest>>,
    resolver: Arc<dyn KeyResolver>,
    ttl: Duration,
}

impl PromotionManager {
    pub fn new(resolver: Arc<dyn KeyResolver>, ttl: Duration) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            resolver,
            ttl,
        }
    }

    /// Open a request; returns its promotion id.
    pub fn submit(
        &self,
        namespace: Namespace,
        rule_ids: &[String],
        submitter: &str,
    ) -> Result<String, DgError> {
        if rule_ids.is_empty() {
            return Err(DgError::InvalidPayload {
                cell_type: "PolicyHead".to_string(),
                detail: "a promotion names at least one rule".to_string(),
            });
        }
        let mut sorted: Vec<String> = rule_ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let id = Uuid::new_v4().to_string();
        let request = PromotionRequest {
            id: id.clone(),
            namespace: namespace.clone(),
            rule_ids: sorted,
            submitter: submitter.to_string(),
            signatures: Vec::new(),
            state: PromotionState::Pending,
            submitted_at: Instant::now(),
        };
        self.requests.lock().insert(id.clone(), request);
        info!(promotion_id = %id, namespace = %namespace, "promotion submitted");
        Ok(id)
    }

    /// Record one witness signature. An invalid signature is rejected but
    /// the request survives in its prior state; a valid one may arm the
    /// request when the threshold is met.
    pub fn add_signature(
        &self,
        chain: &Chain,
        promotion_id: &str,
        witness_id: &str,
        signature_hex: &str,
    ) -> Result<PromotionState, DgError> {
        let mut requests = self.requests.lock();
        let request = requests
            .get_mut(promotion_id)
            .ok_or_else(|| DgError::PromotionNotFound(promotion_id.to_string()))?;

        if request.submitted_at.elapsed() > self.ttl {
            return Err(DgError::PromotionExpired(promotion_id.to_string()));
        }
        if request.state == PromotionState::Finalized {
            return Err(DgError::PromotionNotReady {
                id: promotion_id.to_string(),
                state: request.state.as_str().to_string(),
            });
        }

        let (_, witness_set) = active_witness_set(chain, &request.namespace, &UtcStamp::now())?;
        if !witness_set.contains(witness_id) {
            return Err(DgError::UnknownWitness {
                witness: witness_id.to_string(),
                namespace: request.namespace.to_string(),
            });
        }

        // Each witness counts once; a repeat is a no-op, not an error.
        if request.signatures.iter().any(|s| s.witness_id == witness_id) {
            return Ok(request.state);
        }

        let key_id = witness_set
            .key_id_of(witness_id)
            .expect("membership checked above");
        let key = self
            .resolver
            .resolve(key_id)
            .ok_or_else(|| DgError::UnknownSignerKey(key_id.to_string()))?;
        let payload =
            promotion_signing_bytes(&request.namespace, &request.id, &request.rule_ids);
        if verify_detached(&key, &payload, signature_hex).is_err() {
            warn!(promotion_id, witness_id, "witness signature rejected");
            return Err(DgError::WitnessSignatureInvalid(witness_id.to_string()));
        }

        request.signatures.push(WitnessSignature {
            witness_id: witness_id.to_string(),
            key_id: key_id.to_string(),
            signature: signature_hex.to_string(),
        });
        if request.signatures.len() >= witness_set.threshold as usize {
            request.state = PromotionState::ReadyToFinalize;
        }
        info!(
            promotion_id,
            witness_id,
            signatures = request.signatures.len(),
            threshold = witness_set.threshold,
            state = request.state.as_str(),
            "witness signature accepted"
        );
        Ok(request.state)
    }

    /// Append the PolicyHead cell for an armed request. Explicit — reaching
    /// the threshold never finalizes by itself. This is the only transition
    /// that touches the chain.
    pub fn finalize<S: CellSink>(
        &self,
        ledger: &Ledger<S>,
        promotion_id: &str,
    ) -> Result<CellId, DgError> {
        let mut requests = self.requests.lock();
        let request = requests
            .get_mut(promotion_id)
            .ok_or_else(|| DgError::PromotionNotFound(promotion_id.to_string()))?;
        if request.submitted_at.elapsed() > self.ttl {
            return Err(DgError::PromotionExpired(promotion_id.to_string()));
        }
        if request.state != PromotionState::ReadyToFinalize {
            return Err(DgError::PromotionNotReady {
                id: promotion_id.to_string(),
                state: request.state.as_str().to_string(),
            });
        }

        let payload_request = request.clone();
        let head_id = ledger.append_with(move |chain| {
            let prev = latest_policy_head(chain, &payload_request.namespace, &UtcStamp::now())
                .map(|cell| cell.cell_id.clone());
            let payload = PolicyHeadPayload {
                namespace: payload_request.namespace.clone(),
                policy_hash: policy_hash(&payload_request.rule_ids),
                promoted_rule_ids: payload_request.rule_ids.clone(),
                witness_signatures: payload_request.signatures.clone(),
                prev_policy_head: prev,
                promotion_id: payload_request.id.clone(),
            };
            CellDraft::new(CellType::PolicyHead, payload_request.namespace.clone())
                .subject(&format!("policy:{}", payload_request.namespace))
                .predicate("promotes")
                .structured_object(serde_json::to_value(&payload)?)
                .rule("policy:promotion:v1")
                .seal_onto(chain, None)
        })?;

        request.state = PromotionState::Finalized;
        info!(promotion_id, head = %head_id, "promotion finalized");
        Ok(head_id)
    }

    pub fn status(&self, promotion_id: &str) -> Result<PromotionStatus, DgError> {
        let requests = self.requests.lock();
        let request = requests
            .get(promotion_id)
            .ok_or_else(|| DgError::PromotionNotFound(promotion_id.to_string()))?;
        Ok(PromotionStatus {
            id: request.id.clone(),
            namespace: request.namespace.clone(),
            state: request.state,
            signature_count: request.signatures.len(),
            rule_ids: request.rule_ids.clone(),
        })
    }

    /// Sweep requests past their TTL (finalized ones included — their record
    /// of interest is the PolicyHead cell). Returns how many were archived.
    pub fn archive_expired(&self) -> usize {
        let mut requests = self.requests.lock();
        let before = requests.len();
        requests.retain(|id, request| {
            let keep = request.submitted_at.elapsed() <= self.ttl;
            if !keep {
                request.state = PromotionState::Archived;
                info!(promotion_id = %id, "promotion archived without chain impact");
            }
            keep
        });
        before - requests.len()
    }
}
