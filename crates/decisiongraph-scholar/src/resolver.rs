//! The bitemporal query resolver.
//!
//! Resolution runs in fixed stages — policy, enumeration, bitemporal filter,
//! policy filter, authorization, conflict resolution — and is deterministic:
//! identical inputs over identical chain state produce bit-identical
//! results, proof bundle included. Deadlines are honored at stage
//! boundaries only; an expired deadline fails the whole call with no
//! partial results.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::debug;

use decisiongraph_chain::Chain;
use decisiongraph_core::cell::Cell;
use decisiongraph_core::error::DgError;
use decisiongraph_core::payload::{parse_object, PolicyHeadPayload};
use decisiongraph_core::types::{CellId, Namespace, UtcStamp};

use crate::authz::{authorize_read, ReadGrant};
use crate::index::ScholarIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PolicyMode {
    /// Every fact is a candidate regardless of its producing rule.
    #[default]
    All,
    /// Only facts whose rule is in the active PolicyHead survive.
    PromotedOnly,
}

#[derive(Clone, Debug)]
pub struct QueryParams {
    pub requester_namespace: Namespace,
    pub target_namespace: Namespace,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    /// Validity clock: when the fact must be true. Defaults to now.
    pub at_valid_time: Option<UtcStamp>,
    /// Knowledge clock: what the ledger knew by then. Defaults to now.
    pub as_of_system_time: Option<UtcStamp>,
    pub policy_mode: PolicyMode,
    pub deadline: Option<Instant>,
}

impl QueryParams {
    pub fn new(requester: Namespace, target: Namespace) -> Self {
        Self {
            requester_namespace: requester,
            target_namespace: target,
            subject: None,
            predicate: None,
            at_valid_time: None,
            as_of_system_time: None,
            policy_mode: PolicyMode::All,
            deadline: None,
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn predicate(mut self, predicate: &str) -> Self {
        self.predicate = Some(predicate.to_string());
        self
    }

    pub fn at_valid_time(mut self, at: UtcStamp) -> Self {
        self.at_valid_time = Some(at);
        self
    }

    pub fn as_of_system_time(mut self, as_of: UtcStamp) -> Self {
        self.as_of_system_time = Some(as_of);
        self
    }

    pub fn policy_mode(mut self, mode: PolicyMode) -> Self {
        self.policy_mode = mode;
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Why a candidate left the result set, or how the resolver decided
/// something along the way. Observable, never fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionEvent {
    pub kind: ResolutionEventKind,
    pub cell_id: Option<CellId>,
    pub detail: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionEventKind {
    PolicyResolved,
    PolicyFiltered,
    AuthorizationDropped,
    BridgeEffectivityAxis,
    Superseded,
}

/// Which cells the answer rests on. Sorted and deduplicated, so two
/// identical queries produce identical bundles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProofBundle {
    pub consulted: Vec<CellId>,
    pub policy_head: Option<CellId>,
}

#[derive(Debug, Default)]
pub struct QueryResult {
    /// Winning facts after conflict resolution, ordered by (subject, predicate).
    pub facts: Vec<Cell>,
    /// Candidates that survived the bitemporal filter, before policy,
    /// authorization, and conflict resolution.
    pub candidates: Vec<CellId>,
    pub bridges_used: Vec<CellId>,
    pub resolution_events: Vec<ResolutionEvent>,
    pub proof_bundle: ProofBundle,
}

pub fn query_facts(
    chain: &Chain,
    index: &ScholarIndex,
    params: &QueryParams,
) -> Result<QueryResult, DgError> {
    let now = UtcStamp::now();
    let at_valid = params.at_valid_time.clone().unwrap_or_else(|| now.clone());
    let as_of = params.as_of_system_time.clone().unwrap_or(now);

    let mut result = QueryResult::default();
    let mut consulted: BTreeSet<CellId> = BTreeSet::new();

    // ── 1. Policy resolution ─────────────────────────────────────────────────
    check_deadline(params)?;
    let promoted: Option<BTreeSet<String>> = match params.policy_mode {
        PolicyMode::All => None,
        PolicyMode::PromotedOnly => {
            let head = active_policy_head(chain, index, &params.target_namespace, &as_of);
            match head {
                Some((head_id, payload)) => {
                    consulted.insert(head_id.clone());
                    result.proof_bundle.policy_head = Some(head_id.clone());
                    result.resolution_events.push(ResolutionEvent {
                        kind: ResolutionEventKind::PolicyResolved,
                        cell_id: Some(head_id),
                        detail: format!(
                            "{} rules promoted for {}",
                            payload.promoted_rule_ids.len(),
                            params.target_namespace
                        ),
                    });
                    Some(payload.promoted_rule_ids.into_iter().collect())
                }
                None => {
                    result.resolution_events.push(ResolutionEvent {
                        kind: ResolutionEventKind::PolicyResolved,
                        cell_id: None,
                        detail: format!(
                            "no policy head for {} as of {}; nothing is promoted",
                            params.target_namespace, as_of
                        ),
                    });
                    Some(BTreeSet::new())
                }
            }
        }
    };

    // ── 2–3. Candidate enumeration + bitemporal filter ───────────────────────
    check_deadline(params)?;
    let mut candidates: Vec<&Cell> = Vec::new();
    for id in index.facts_in(&params.target_namespace) {
        let Some(cell) = chain.get(id) else { continue };
        if let Some(subject) = &params.subject {
            if cell.fact.subject != *subject {
                continue;
            }
        }
        if let Some(predicate) = &params.predicate {
            if cell.fact.predicate != *predicate {
                continue;
            }
        }
        // Clock A: knowledge. Clock B: validity.
        if *cell.system_time() > as_of {
            continue;
        }
        if cell.fact.valid_from > at_valid {
            continue;
        }
        if let Some(until) = &cell.fact.valid_to {
            if at_valid >= *until {
                continue;
            }
        }
        consulted.insert(cell.cell_id.clone());
        result.candidates.push(cell.cell_id.clone());
        candidates.push(cell);
    }

    // ── 4. Policy filter ─────────────────────────────────────────────────────
    check_deadline(params)?;
    if let Some(promoted) = &promoted {
        candidates.retain(|cell| {
            if promoted.contains(&cell.logic_anchor.rule_id) {
                true
            } else {
                result.resolution_events.push(ResolutionEvent {
                    kind: ResolutionEventKind::PolicyFiltered,
                    cell_id: Some(cell.cell_id.clone()),
                    detail: format!("rule {} is not promoted", cell.logic_anchor.rule_id),
                });
                false
            }
        });
    }

    // ── 5. Authorization ─────────────────────────────────────────────────────
    check_deadline(params)?;
    let grant = authorize_read(
        chain,
        index,
        &params.requester_namespace,
        &params.target_namespace,
        &as_of,
    );
    match &grant {
        Some(ReadGrant::Bridge(bridge_id)) => {
            consulted.insert(bridge_id.clone());
            result.bridges_used.push(bridge_id.clone());
            result.resolution_events.push(ResolutionEvent {
                kind: ResolutionEventKind::BridgeEffectivityAxis,
                cell_id: Some(bridge_id.clone()),
                detail: "bridge effectivity judged on the system-time axis".to_string(),
            });
        }
        Some(ReadGrant::AccessRule(rule_id)) => {
            consulted.insert(rule_id.clone());
        }
        Some(_) => {}
        None => {
            for cell in candidates.drain(..) {
                result.resolution_events.push(ResolutionEvent {
                    kind: ResolutionEventKind::AuthorizationDropped,
                    cell_id: Some(cell.cell_id.clone()),
                    detail: format!(
                        "{} holds no grant or bridge into {}",
                        params.requester_namespace, params.target_namespace
                    ),
                });
            }
        }
    }

    // ── 6. Conflict resolution ───────────────────────────────────────────────
    check_deadline(params)?;
    let mut groups: BTreeMap<(String, String), Vec<&Cell>> = BTreeMap::new();
    for cell in candidates {
        groups
            .entry((cell.fact.subject.clone(), cell.fact.predicate.clone()))
            .or_default()
            .push(cell);
    }
    for (_key, mut group) in groups {
        group.sort_by(|a, b| conflict_order(a, b));
        let winner = group[0];
        for loser in &group[1..] {
            result.resolution_events.push(ResolutionEvent {
                kind: ResolutionEventKind::Superseded,
                cell_id: Some(loser.cell_id.clone()),
                detail: format!("superseded by {}", winner.cell_id),
            });
        }
        result.facts.push(winner.clone());
    }

    result.proof_bundle.consulted = consulted.into_iter().collect();
    debug!(
        requester = %params.requester_namespace,
        target = %params.target_namespace,
        facts = result.facts.len(),
        events = result.resolution_events.len(),
        "query resolved"
    );
    Ok(result)
}

/// Total order for conflict resolution: best candidate first. Source quality
/// rank, then confidence, then system time, then cell id — every tiebreak is
/// total, so resolution is deterministic.
fn conflict_order(a: &Cell, b: &Cell) -> std::cmp::Ordering {
    b.fact
        .source_quality
        .rank()
        .cmp(&a.fact.source_quality.rank())
        .then_with(|| b.fact.confidence.cmp(&a.fact.confidence))
        .then_with(|| b.header.system_time.cmp(&a.header.system_time))
        .then_with(|| b.cell_id.cmp(&a.cell_id))
}

/// The PolicyHead for `namespace` with maximal system time ≤ `as_of`.
pub fn active_policy_head(
    chain: &Chain,
    index: &ScholarIndex,
    namespace: &Namespace,
    as_of: &UtcStamp,
) -> Option<(CellId, PolicyHeadPayload)> {
    index
        .policy_heads_for(namespace)
        .iter()
        .rev()
        .filter_map(|id| chain.get(id))
        .find(|cell| *cell.system_time() <= *as_of)
        .and_then(|cell| {
            parse_object::<PolicyHeadPayload>(&cell.fact.object, "PolicyHead")
                .ok()
                .map(|payload| (cell.cell_id.clone(), payload))
        })
}

fn check_deadline(params: &QueryParams) -> Result<(), DgError> {
    match params.deadline {
        Some(deadline) if Instant::now() >= deadline => Err(DgError::DeadlineExceeded),
        _ => Ok(()),
    }
}
