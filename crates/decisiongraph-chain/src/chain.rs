use std::collections::HashMap;

use decisiongraph_core::cell::Cell;
use decisiongraph_core::error::DgError;
use decisiongraph_core::types::{CellId, GraphId, HashScheme};
use decisiongraph_crypto::KeyResolver;
use decisiongraph_genesis::verify_genesis;

/// The append-only, hash-linked sequence of cells for one graph.
///
/// A chain exclusively owns its cells; indexes hold `CellId`s and look cells
/// up here. It is never empty — construction installs a fully verified
/// genesis at position 0 — and it only ever grows.
pub struct Chain {
    graph_id: GraphId,
    hash_scheme: HashScheme,
    cells: Vec<Cell>,
    by_id: HashMap<CellId, usize>,
}

impl Chain {
    /// Install `genesis` at position 0 after the full 22-check verification.
    pub fn new(genesis: Cell) -> Result<Self, DgError> {
        let (ok, failures) = verify_genesis(&genesis, false);
        if !ok {
            let summary = failures
                .iter()
                .map(|f| f.check)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DgError::GenesisViolation(summary));
        }
        let mut by_id = HashMap::new();
        by_id.insert(genesis.cell_id.clone(), 0);
        Ok(Self {
            graph_id: genesis.header.graph_id.clone(),
            hash_scheme: genesis.header.hash_scheme,
            cells: vec![genesis],
            by_id,
        })
    }

    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    pub fn hash_scheme(&self) -> HashScheme {
        self.hash_scheme
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// A chain always carries at least its genesis.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn genesis(&self) -> &Cell {
        &self.cells[0]
    }

    pub fn head(&self) -> &Cell {
        self.cells.last().expect("chain is never empty")
    }

    pub fn get(&self, id: &CellId) -> Option<&Cell> {
        self.by_id.get(id).map(|&i| &self.cells[i])
    }

    pub fn contains(&self, id: &CellId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn position(&self, id: &CellId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Forward-only iteration over `[from, to]` inclusive. Both ids must be
    /// present and ordered; the iterator is finite and restartable.
    pub fn iter_range(
        &self,
        from: &CellId,
        to: &CellId,
    ) -> Result<impl Iterator<Item = &Cell>, DgError> {
        let start = self
            .position(from)
            .ok_or_else(|| DgError::InvalidCellId(from.to_string()))?;
        let end = self
            .position(to)
            .ok_or_else(|| DgError::InvalidCellId(to.to_string()))?;
        if end < start {
            return Err(DgError::InvalidCellId(format!(
                "range end {to} precedes start {from}"
            )));
        }
        Ok(self.cells[start..=end].iter())
    }

    /// Install a cell the commit gate has already admitted.
    pub(crate) fn install(&mut self, cell: Cell) -> CellId {
        let id = cell.cell_id.clone();
        self.by_id.insert(id.clone(), self.cells.len());
        self.cells.push(cell);
        id
    }

    /// Re-verify the whole chain from genesis: every link, every seal, every
    /// structural rule, in order. Used after recovery and in audits.
    pub fn validate(&self, resolver: &dyn KeyResolver) -> Result<(), DgError> {
        let (ok, failures) = verify_genesis(self.genesis(), false);
        if !ok {
            let summary = failures
                .iter()
                .map(|f| f.check)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DgError::GenesisViolation(summary));
        }
        for i in 1..self.cells.len() {
            let prefix = PrefixView {
                chain: self,
                len: i,
            };
            crate::gate::validate_append(&prefix, &self.cells[i], resolver)?;
        }
        Ok(())
    }
}

/// A read view of the first `len` cells, so full-chain validation can replay
/// each append against exactly the state that preceded it.
pub(crate) struct PrefixView<'a> {
    chain: &'a Chain,
    len: usize,
}

/// What the commit gate needs to see of a chain.
pub(crate) trait ChainView {
    fn graph_id(&self) -> &GraphId;
    fn hash_scheme(&self) -> HashScheme;
    fn head(&self) -> &Cell;
    fn lookup(&self, id: &CellId) -> Option<&Cell>;
}

impl ChainView for Chain {
    fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }
    fn hash_scheme(&self) -> HashScheme {
        self.hash_scheme
    }
    fn head(&self) -> &Cell {
        self.head()
    }
    fn lookup(&self, id: &CellId) -> Option<&Cell> {
        self.get(id)
    }
}

impl ChainView for PrefixView<'_> {
    fn graph_id(&self) -> &GraphId {
        &self.chain.graph_id
    }
    fn hash_scheme(&self) -> HashScheme {
        self.chain.hash_scheme
    }
    fn head(&self) -> &Cell {
        &self.chain.cells[self.len - 1]
    }
    fn lookup(&self, id: &CellId) -> Option<&Cell> {
        self.chain
            .position(id)
            .filter(|&i| i < self.len)
            .map(|i| &self.chain.cells[i])
    }
}
