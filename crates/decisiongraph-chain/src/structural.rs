//! Per-type structural validation (commit gate rule 8).
//!
//! Each cell type that carries a typed payload gets its shape checked here
//! before it can join the chain. These checks are stateless except where a
//! payload references earlier cells (PolicyHead linkage), for which the gate
//! passes a chain view.

use serde::Deserialize;

use decisiongraph_core::cell::Cell;
use decisiongraph_core::constants::{BRIDGE_APPROVAL_EVIDENCE, JUDGMENT_RULE_ID, WITNESS_SET_PREDICATE};
use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{
    parse_object, AccessRulePayload, BridgePayload, JudgmentPayload, PolicyHeadPayload,
    WitnessSetPayload,
};
use decisiongraph_core::types::{CellType, Namespace};
use decisiongraph_crypto::policy_hash;

use crate::chain::ChainView;

pub(crate) fn validate_structure(chain: &dyn ChainView, cell: &Cell) -> Result<(), DgError> {
    match cell.header.cell_type {
        CellType::BridgeRule => validate_bridge(cell),
        CellType::PolicyHead => validate_policy_head(chain, cell),
        CellType::AccessRule => validate_access_rule(cell),
        CellType::NamespaceDef => validate_namespace_def(cell),
        CellType::Judgment => validate_judgment(cell),
        CellType::Rule if cell.fact.predicate == WITNESS_SET_PREDICATE => {
            validate_witness_set(cell)
        }
        _ => Ok(()),
    }
}

fn invalid(cell_type: CellType, detail: impl Into<String>) -> DgError {
    DgError::InvalidPayload {
        cell_type: cell_type.as_str().to_string(),
        detail: detail.into(),
    }
}

/// A bridge is only as good as its two approvals: one evidence entry per
/// namespace owner, distinct sources, and a signer id naming both.
fn validate_bridge(cell: &Cell) -> Result<(), DgError> {
    let payload: BridgePayload = parse_object(&cell.fact.object, "BridgeRule")?;
    if payload.source_namespace == payload.target_namespace {
        return Err(invalid(CellType::BridgeRule, "bridge endpoints must differ"));
    }

    let mut approvers: Vec<&str> = cell
        .evidence
        .iter()
        .filter(|e| e.evidence_type == BRIDGE_APPROVAL_EVIDENCE)
        .map(|e| e.source.as_str())
        .collect();
    approvers.sort_unstable();
    approvers.dedup();
    if approvers.len() < 2 {
        return Err(invalid(
            CellType::BridgeRule,
            format!(
                "bridge requires two distinct {BRIDGE_APPROVAL_EVIDENCE} entries, found {}",
                approvers.len()
            ),
        ));
    }

    let expected_signer = approvers.join("+");
    match &cell.proof.signer_id {
        Some(signer) if *signer == expected_signer => {}
        Some(signer) => {
            return Err(invalid(
                CellType::BridgeRule,
                format!("signer id {signer:?} does not combine the approvers {expected_signer:?}"),
            ))
        }
        None => {
            return Err(invalid(
                CellType::BridgeRule,
                "bridge proof must name both approvers",
            ))
        }
    }
    if cell.proof.signature_required && cell.proof.signature.is_none() {
        return Err(invalid(CellType::BridgeRule, "bridge signature is required but absent"));
    }
    Ok(())
}

/// PolicyHead: the snapshot hash must recompute from its own rule ids, and
/// the back-link must point at an earlier head of the same namespace.
fn validate_policy_head(chain: &dyn ChainView, cell: &Cell) -> Result<(), DgError> {
    let payload: PolicyHeadPayload = parse_object(&cell.fact.object, "PolicyHead")?;
    if payload.namespace != cell.fact.namespace {
        return Err(invalid(
            CellType::PolicyHead,
            format!(
                "payload namespace {} disagrees with fact namespace {}",
                payload.namespace, cell.fact.namespace
            ),
        ));
    }
    if payload.promoted_rule_ids.is_empty() {
        return Err(invalid(CellType::PolicyHead, "a policy head promotes at least one rule"));
    }
    let expected = policy_hash(&payload.promoted_rule_ids);
    if payload.policy_hash != expected {
        return Err(invalid(
            CellType::PolicyHead,
            format!("policy_hash {} does not match promoted rule ids", payload.policy_hash),
        ));
    }
    if payload.witness_signatures.is_empty() {
        return Err(invalid(CellType::PolicyHead, "a policy head embeds its witness signatures"));
    }
    if let Some(prev) = &payload.prev_policy_head {
        match chain.lookup(prev) {
            Some(prev_cell)
                if prev_cell.header.cell_type == CellType::PolicyHead
                    && prev_cell.fact.namespace == payload.namespace => {}
            Some(_) => {
                return Err(invalid(
                    CellType::PolicyHead,
                    format!("prev_policy_head {prev} is not a policy head of {}", payload.namespace),
                ))
            }
            None => {
                return Err(invalid(
                    CellType::PolicyHead,
                    format!("prev_policy_head {prev} is not on this chain"),
                ))
            }
        }
    }
    Ok(())
}

fn validate_access_rule(cell: &Cell) -> Result<(), DgError> {
    let payload: AccessRulePayload = parse_object(&cell.fact.object, "AccessRule")?;
    if payload.action != "read" {
        return Err(invalid(
            CellType::AccessRule,
            format!("unsupported action {:?}; only read grants exist", payload.action),
        ));
    }
    if payload.grantee == cell.fact.namespace {
        return Err(invalid(
            CellType::AccessRule,
            "a namespace needs no grant to read itself",
        ));
    }
    Ok(())
}

fn validate_namespace_def(cell: &Cell) -> Result<(), DgError> {
    #[derive(Deserialize)]
    struct NamespaceDefPayload {
        namespace: Namespace,
    }
    let defined = match cell.fact.object.as_text() {
        Some(text) => Namespace::parse(text)?,
        None => parse_object::<NamespaceDefPayload>(&cell.fact.object, "NamespaceDef")?.namespace,
    };
    // A namespace is defined from within its own root's subtree.
    if defined.root() != cell.fact.namespace.root() {
        return Err(invalid(
            CellType::NamespaceDef,
            format!("{} is outside the {} tree", defined, cell.fact.namespace.root()),
        ));
    }
    Ok(())
}

fn validate_judgment(cell: &Cell) -> Result<(), DgError> {
    if cell.logic_anchor.rule_id != JUDGMENT_RULE_ID {
        return Err(invalid(
            CellType::Judgment,
            format!("judgments anchor {JUDGMENT_RULE_ID}, got {}", cell.logic_anchor.rule_id),
        ));
    }
    let payload: JudgmentPayload = parse_object(&cell.fact.object, "Judgment")?;
    if payload.precedent_id.is_empty() {
        return Err(invalid(CellType::Judgment, "precedent_id must be non-empty"));
    }
    if payload.fingerprint_hash.len() != 64
        || !payload
            .fingerprint_hash
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Err(invalid(CellType::Judgment, "fingerprint_hash must be 64 hex chars"));
    }
    // Drivers must reference anchored fields, or transferability checks
    // downstream would dereference nothing.
    for driver in &payload.decision_drivers {
        if !payload.anchor_facts.contains_key(driver) {
            return Err(invalid(
                CellType::Judgment,
                format!("decision driver {driver:?} has no anchor fact"),
            ));
        }
    }
    Ok(())
}

fn validate_witness_set(cell: &Cell) -> Result<(), DgError> {
    let payload: WitnessSetPayload = parse_object(&cell.fact.object, "Rule")?;
    if payload.witnesses.is_empty() {
        return Err(invalid(CellType::Rule, "witness set must name at least one witness"));
    }
    let mut ids: Vec<&str> = payload.witnesses.iter().map(|w| w.witness_id.as_str()).collect();
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    if ids.len() != before {
        return Err(invalid(CellType::Rule, "witness ids must be distinct"));
    }
    if payload.threshold == 0 || payload.threshold as usize > payload.witnesses.len() {
        return Err(invalid(
            CellType::Rule,
            format!(
                "threshold {} outside 1..={} witnesses",
                payload.threshold,
                payload.witnesses.len()
            ),
        ));
    }
    Ok(())
}
