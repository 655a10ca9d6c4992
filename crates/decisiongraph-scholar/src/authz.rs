//! Namespace read authorization.
//!
//! A requester reads its own namespace and its descendants freely. Any other
//! cross-namespace read needs either an effective AccessRule grant or a
//! dual-approved Bridge. Effectivity is judged on the query's system-time
//! axis; the resolver records that choice in its events.

use decisiongraph_chain::Chain;
use decisiongraph_core::cell::Cell;
use decisiongraph_core::payload::{parse_object, AccessRulePayload, BridgePayload};
use decisiongraph_core::types::{CellId, Namespace, UtcStamp};

use crate::index::ScholarIndex;

/// How a cross-namespace read was admitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadGrant {
    SameNamespace,
    Ancestor,
    AccessRule(CellId),
    Bridge(CellId),
}

/// Decide whether `requester` may read `target` as of `as_of`.
pub fn authorize_read(
    chain: &Chain,
    index: &ScholarIndex,
    requester: &Namespace,
    target: &Namespace,
    as_of: &UtcStamp,
) -> Option<ReadGrant> {
    if requester == target {
        return Some(ReadGrant::SameNamespace);
    }
    if requester.is_ancestor_of(target) {
        return Some(ReadGrant::Ancestor);
    }

    // AccessRule grants attached to the target namespace.
    for id in index.access_rules_for(target) {
        let Some(cell) = chain.get(id) else { continue };
        if !effective_at(cell, as_of) {
            continue;
        }
        let Ok(payload) = parse_object::<AccessRulePayload>(&cell.fact.object, "AccessRule")
        else {
            continue;
        };
        if payload.grantee.contains(requester) {
            return Some(ReadGrant::AccessRule(id.clone()));
        }
    }

    // Bridges from the requester's scope into the target.
    for id in index.bridges() {
        let Some(cell) = chain.get(id) else { continue };
        if !effective_at(cell, as_of) {
            continue;
        }
        let Ok(payload) = parse_object::<BridgePayload>(&cell.fact.object, "BridgeRule") else {
            continue;
        };
        if payload.source_namespace.contains(requester) && payload.target_namespace == *target {
            return Some(ReadGrant::Bridge(id.clone()));
        }
    }

    None
}

/// An authorization cell is effective once known (`system_time ≤ as_of`) and
/// inside its own validity window on the same axis.
fn effective_at(cell: &Cell, as_of: &UtcStamp) -> bool {
    if *cell.system_time() > *as_of {
        return false;
    }
    if cell.fact.valid_from > *as_of {
        return false;
    }
    match &cell.fact.valid_to {
        Some(until) => *as_of < *until,
        None => true,
    }
}
