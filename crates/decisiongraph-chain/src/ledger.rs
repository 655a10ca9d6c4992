//! The ledger: the one mutator of a chain.
//!
//! A single writer lock covers the whole commit path — journal append, gate
//! validation, tail install, index fan-out — so commits are atomic with
//! respect to observers: a reader either sees a cell in the chain *and* in
//! every index, or in neither.

use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;
use tracing::{info, warn};

use decisiongraph_core::cell::Cell;
use decisiongraph_core::error::DgError;
use decisiongraph_core::types::CellId;
use decisiongraph_crypto::KeyResolver;
use decisiongraph_wal::{SegmentedWal, Wal};

use crate::chain::Chain;
use crate::gate;

/// Receives every committed cell, inside the writer lock, in commit order.
/// Indexes (Scholar, precedent) implement this to stay coherent with the
/// chain without the chain knowing them.
pub trait CellSink: Send + Sync {
    fn on_commit(&mut self, cell: &Cell);
}

impl CellSink for () {
    fn on_commit(&mut self, _cell: &Cell) {}
}

impl<A: CellSink, B: CellSink> CellSink for (A, B) {
    fn on_commit(&mut self, cell: &Cell) {
        self.0.on_commit(cell);
        self.1.on_commit(cell);
    }
}

/// Durable append target. Implemented by both journal flavors.
pub trait Journal: Send {
    fn append(&mut self, payload: &[u8]) -> Result<(), DgError>;
}

impl Journal for Wal {
    fn append(&mut self, payload: &[u8]) -> Result<(), DgError> {
        Wal::append(self, payload)
    }
}

impl Journal for SegmentedWal {
    fn append(&mut self, payload: &[u8]) -> Result<(), DgError> {
        SegmentedWal::append(self, payload)
    }
}

/// Chain + indexes under one lock, as readers see them.
pub struct LedgerState<S: CellSink> {
    pub chain: Chain,
    pub sinks: S,
    journal: Option<Box<dyn Journal>>,
}

/// The authoritative, durably journaled, index-coherent chain.
pub struct Ledger<S: CellSink> {
    state: RwLock<LedgerState<S>>,
    resolver: Arc<dyn KeyResolver>,
}

impl<S: CellSink> Ledger<S> {
    /// Start a ledger from a genesis cell. The genesis is journaled like any
    /// other cell and fanned out to the sinks.
    pub fn new(
        genesis: Cell,
        resolver: Arc<dyn KeyResolver>,
        mut sinks: S,
        mut journal: Option<Box<dyn Journal>>,
    ) -> Result<Self, DgError> {
        if genesis.proof.signature_required
            && !decisiongraph_crypto::verify_signature(&genesis, resolver.as_ref())?
        {
            return Err(DgError::SignatureInvalid);
        }
        let chain = Chain::new(genesis)?;
        if let Some(j) = journal.as_mut() {
            j.append(&chain.genesis().to_wire_json()?)?;
        }
        sinks.on_commit(chain.genesis());
        info!(graph_id = %chain.graph_id(), "ledger started");
        Ok(Self {
            state: RwLock::new(LedgerState {
                chain,
                sinks,
                journal,
            }),
            resolver,
        })
    }

    /// Rebuild a ledger from journal records, replaying each cell through
    /// the full gate. Records that fail the gate stop recovery — a journal
    /// that disagrees with the gate is corruption, not history. The journal
    /// handle is retained for subsequent appends without re-journaling the
    /// replayed cells.
    pub fn recover(
        records: Vec<Vec<u8>>,
        resolver: Arc<dyn KeyResolver>,
        mut sinks: S,
        journal: Option<Box<dyn Journal>>,
    ) -> Result<Self, DgError> {
        let mut iter = records.into_iter();
        let genesis_bytes = iter.next().ok_or_else(|| DgError::WalCorrupt {
            offset: 0,
            detail: "journal has no genesis record".to_string(),
        })?;
        let genesis = Cell::from_wire_json(&genesis_bytes)?;
        let mut chain = Chain::new(genesis)?;
        sinks.on_commit(chain.genesis());

        let mut recovered = 1usize;
        for bytes in iter {
            let cell = Cell::from_wire_json(&bytes)?;
            if chain.contains(&cell.cell_id) {
                // Rotation overlap; the cell is already committed.
                continue;
            }
            gate::validate_append(&chain, &cell, resolver.as_ref())?;
            let installed = chain.install(cell);
            sinks.on_commit(chain.get(&installed).expect("just installed"));
            recovered += 1;
        }
        info!(graph_id = %chain.graph_id(), cells = recovered, "ledger recovered from journal");
        Ok(Self {
            state: RwLock::new(LedgerState {
                chain,
                sinks,
                journal,
            }),
            resolver,
        })
    }

    /// Validate and commit one cell. On success the cell is durable, on the
    /// chain, and visible in every index before this returns. On failure the
    /// chain is unchanged; journal failures abort before install, so a
    /// retry with the same cell is idempotent (its seal is stable).
    pub fn append(&self, cell: Cell) -> Result<CellId, DgError> {
        let mut state = self.state.write();
        gate::validate_append(&state.chain, &cell, self.resolver.as_ref())?;

        let wire = cell.to_wire_json()?;
        if let Some(journal) = state.journal.as_mut() {
            if let Err(e) = journal.append(&wire) {
                warn!(cell_id = %cell.cell_id, error = %e, "journal append failed; cell not committed");
                return Err(e);
            }
        }

        let id = state.chain.install(cell);
        let LedgerState { chain, sinks, .. } = &mut *state;
        sinks.on_commit(chain.get(&id).expect("just installed"));
        Ok(id)
    }

    /// Build and commit under one writer lock, so the head observed by the
    /// builder is exactly the head the cell links to.
    pub fn append_with<F>(&self, build: F) -> Result<CellId, DgError>
    where
        F: FnOnce(&Chain) -> Result<Cell, DgError>,
    {
        let mut state = self.state.write();
        let cell = build(&state.chain)?;
        gate::validate_append(&state.chain, &cell, self.resolver.as_ref())?;

        let wire = cell.to_wire_json()?;
        if let Some(journal) = state.journal.as_mut() {
            journal.append(&wire)?;
        }

        let id = state.chain.install(cell);
        let LedgerState { chain, sinks, .. } = &mut *state;
        sinks.on_commit(chain.get(&id).expect("just installed"));
        Ok(id)
    }

    /// Shared read access to the chain and its indexes. Readers never block
    /// readers; a writer waits for in-flight readers to release.
    pub fn read(&self) -> RwLockReadGuard<'_, LedgerState<S>> {
        self.state.read()
    }

    /// The current tail cell id.
    pub fn head_id(&self) -> CellId {
        self.state.read().chain.head().cell_id.clone()
    }

    pub fn resolver(&self) -> &Arc<dyn KeyResolver> {
        &self.resolver
    }
}
