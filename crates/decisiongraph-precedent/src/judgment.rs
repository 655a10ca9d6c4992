//! Sealing judgments onto the chain.
//!
//! A judgment is the terminal record of a decided case: identity, a
//! fingerprint over its anchor facts, the canonical three-field outcome, and
//! the drivers that made the decision go the way it did. Appeals never edit
//! a sealed judgment; they arrive as later Judgment cells referencing the
//! original `precedent_id`.

use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use decisiongraph_chain::{CellDraft, Chain};
use decisiongraph_core::cell::Cell;
use decisiongraph_core::constants::JUDGMENT_RULE_ID;
use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{
    AppealOutcome, Disposition, DispositionBasis, FieldValue, JudgmentPayload, Reporting,
};
use decisiongraph_core::types::{Namespace, UtcStamp};
use decisiongraph_crypto::{salted_case_id_hash, sha256_hex};

/// Everything a producer supplies to seal a judgment. The case id never
/// reaches the chain — only its salted hash does.
#[derive(Clone, Debug)]
pub struct JudgmentInput {
    pub case_id: String,
    pub jurisdiction: String,
    pub schema_id: String,
    pub anchor_facts: BTreeMap<String, FieldValue>,
    pub disposition: Disposition,
    pub disposition_basis: DispositionBasis,
    pub reporting: Reporting,
    pub decision_drivers: BTreeSet<String>,
    pub driver_typology: Option<String>,
    pub exclusion_codes: BTreeSet<String>,
    pub policy_regime: String,
    pub decision_authority: String,
    pub appeal_outcome: Option<AppealOutcome>,
    pub amends_precedent_id: Option<String>,
}

/// Deterministic fingerprint over the anchored case shape: canonical JSON of
/// `{schema_id, anchor_facts}`, hashed. Two cases with the same anchored
/// facts under the same schema collide on purpose.
pub fn fingerprint_hash(
    schema_id: &str,
    anchor_facts: &BTreeMap<String, FieldValue>,
) -> Result<String, DgError> {
    let value = serde_json::json!({
        "schema_id": schema_id,
        "anchor_facts": anchor_facts,
    });
    let bytes = decisiongraph_core::to_canonical_bytes(&value)?;
    Ok(sha256_hex(&bytes))
}

/// Build the sealed Judgment cell for `input`, linked onto `chain`'s head.
///
/// `salt` belongs to the institution; the chain carries only
/// `H(salt ∥ case_id)`. Anchor facts are float-free by the `FieldValue`
/// type, so the payload always canonicalizes.
pub fn create_judgment(
    chain: &Chain,
    namespace: Namespace,
    salt: &[u8],
    input: &JudgmentInput,
    at: Option<UtcStamp>,
) -> Result<Cell, DgError> {
    let payload = JudgmentPayload {
        precedent_id: Uuid::new_v4().to_string(),
        case_id_hash: salted_case_id_hash(salt, &input.case_id),
        jurisdiction: input.jurisdiction.clone(),
        fingerprint_hash: fingerprint_hash(&input.schema_id, &input.anchor_facts)?,
        schema_id: input.schema_id.clone(),
        anchor_facts: input.anchor_facts.clone(),
        disposition: input.disposition,
        disposition_basis: input.disposition_basis,
        reporting: input.reporting,
        decision_drivers: input.decision_drivers.clone(),
        driver_typology: input.driver_typology.clone(),
        exclusion_codes: input.exclusion_codes.clone(),
        policy_regime: input.policy_regime.clone(),
        decision_authority: input.decision_authority.clone(),
        appeal_outcome: input.appeal_outcome,
        amends_precedent_id: input.amends_precedent_id.clone(),
    };

    let mut draft = CellDraft::new(decisiongraph_core::types::CellType::Judgment, namespace)
        .subject(&format!("precedent:{}", payload.precedent_id))
        .predicate("decided_as")
        .structured_object(serde_json::to_value(&payload)?)
        .rule(JUDGMENT_RULE_ID);
    if let Some(at) = at {
        draft = draft.system_time(at);
    }
    draft.seal_onto(chain, None)
}
