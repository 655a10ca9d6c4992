use std::collections::BTreeMap;

use decisiongraph_chain::CellSink;
use decisiongraph_core::cell::Cell;
use decisiongraph_core::types::{CellId, CellType, Namespace};

/// Read-side index over the cell kinds the resolver consults.
///
/// Holds cell ids only — the chain owns the cells — in `BTreeMap`s so every
/// iteration order is deterministic. Maintained inside the ledger's writer
/// lock via `CellSink`, so readers always see it coherent with the chain.
#[derive(Debug, Default)]
pub struct ScholarIndex {
    /// Fact cells per namespace, in commit order.
    facts: BTreeMap<Namespace, Vec<CellId>>,
    /// AccessRule cells keyed by the namespace they guard (their own).
    access_rules: BTreeMap<Namespace, Vec<CellId>>,
    /// All BridgeRule cells, in commit order.
    bridges: Vec<CellId>,
    /// PolicyHead cells per namespace, in commit order (= system-time order).
    policy_heads: BTreeMap<Namespace, Vec<CellId>>,
}

impl ScholarIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn facts_in(&self, namespace: &Namespace) -> &[CellId] {
        self.facts.get(namespace).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn access_rules_for(&self, namespace: &Namespace) -> &[CellId] {
        self.access_rules
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn bridges(&self) -> &[CellId] {
        &self.bridges
    }

    pub fn policy_heads_for(&self, namespace: &Namespace) -> &[CellId] {
        self.policy_heads
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl CellSink for ScholarIndex {
    fn on_commit(&mut self, cell: &Cell) {
        let id = cell.cell_id.clone();
        match cell.header.cell_type {
            CellType::Fact => {
                self.facts
                    .entry(cell.fact.namespace.clone())
                    .or_default()
                    .push(id);
            }
            CellType::AccessRule => {
                self.access_rules
                    .entry(cell.fact.namespace.clone())
                    .or_default()
                    .push(id);
            }
            CellType::BridgeRule => self.bridges.push(id),
            CellType::PolicyHead => {
                self.policy_heads
                    .entry(cell.fact.namespace.clone())
                    .or_default()
                    .push(id);
            }
            _ => {}
        }
    }
}
