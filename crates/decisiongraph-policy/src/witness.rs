//! Witness-set resolution.
//!
//! A witness set is a Rule cell (predicate `witness_set`) in the namespace
//! it governs. It becomes authoritative by being promoted — except during a
//! namespace's bootstrap window: while no PolicyHead exists yet, the most
//! recent witness-set rule stands in, which is how a fresh graph seeds the
//! root set without a promotion to approve the promoters.

use decisiongraph_chain::Chain;
use decisiongraph_core::cell::Cell;
use decisiongraph_core::constants::WITNESS_SET_PREDICATE;
use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{parse_object, PolicyHeadPayload, WitnessSetPayload};
use decisiongraph_core::types::{CellId, CellType, Namespace, UtcStamp};

/// The PolicyHead cell for `namespace` with maximal system time ≤ `as_of`.
pub fn latest_policy_head<'c>(
    chain: &'c Chain,
    namespace: &Namespace,
    as_of: &UtcStamp,
) -> Option<&'c Cell> {
    chain
        .iter()
        .filter(|cell| {
            cell.header.cell_type == CellType::PolicyHead
                && cell.fact.namespace == *namespace
                && *cell.system_time() <= *as_of
        })
        .last()
}

/// Resolve the effective witness set for `namespace` as of `as_of`.
///
/// Witness sets are strictly per-namespace; a set in a parent or sibling
/// namespace never applies.
pub fn active_witness_set(
    chain: &Chain,
    namespace: &Namespace,
    as_of: &UtcStamp,
) -> Result<(CellId, WitnessSetPayload), DgError> {
    let promoted: Option<Vec<String>> = latest_policy_head(chain, namespace, as_of)
        .and_then(|cell| {
            parse_object::<PolicyHeadPayload>(&cell.fact.object, "PolicyHead").ok()
        })
        .map(|payload| payload.promoted_rule_ids);

    let candidate = chain
        .iter()
        .filter(|cell| {
            cell.header.cell_type == CellType::Rule
                && cell.fact.predicate == WITNESS_SET_PREDICATE
                && cell.fact.namespace == *namespace
                && *cell.system_time() <= *as_of
        })
        .filter(|cell| match &promoted {
            // Once a head exists, only a promoted witness set governs.
            Some(rule_ids) => rule_ids.contains(&cell.logic_anchor.rule_id),
            // Bootstrap window: the latest set stands in.
            None => true,
        })
        .last();

    match candidate {
        Some(cell) => {
            let payload: WitnessSetPayload = parse_object(&cell.fact.object, "Rule")?;
            Ok((cell.cell_id.clone(), payload))
        }
        None => Err(DgError::WitnessSetNotFound(namespace.to_string())),
    }
}
