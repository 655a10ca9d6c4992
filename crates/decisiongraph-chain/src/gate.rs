//! The commit gate: every append is validated against the chain's current
//! state by these rules, in declared order, each failure fatal to that
//! append. Genesis admission (the empty-chain case) lives in `Chain::new`,
//! which runs the 22-check battery; everything after genesis comes through
//! here.

use decisiongraph_core::cell::Cell;
use decisiongraph_core::error::DgError;
use decisiongraph_core::types::CellType;
use decisiongraph_crypto::{verify_integrity, verify_signature, KeyResolver};

use crate::chain::ChainView;
use crate::structural::validate_structure;

pub(crate) fn validate_append(
    chain: &dyn ChainView,
    cell: &Cell,
    resolver: &dyn KeyResolver,
) -> Result<(), DgError> {
    // ── 1–2. Genesis exclusivity ─────────────────────────────────────────────
    if cell.header.cell_type == CellType::Genesis {
        return Err(DgError::GenesisViolation(
            "chain already has a genesis".to_string(),
        ));
    }

    // ── 3. Graph binding ─────────────────────────────────────────────────────
    if cell.header.graph_id != *chain.graph_id() {
        return Err(DgError::GraphIdMismatch {
            expected: chain.graph_id().to_string(),
            got: cell.header.graph_id.to_string(),
        });
    }

    // ── 4. Scheme binding ────────────────────────────────────────────────────
    if cell.header.hash_scheme != chain.hash_scheme() {
        return Err(DgError::HashSchemeMismatch(format!(
            "chain seals with {}, cell with {}",
            chain.hash_scheme(),
            cell.header.hash_scheme
        )));
    }

    // ── 5. Hash link ─────────────────────────────────────────────────────────
    let head = chain.head();
    if cell.header.prev_cell_hash != head.cell_id {
        return Err(DgError::ChainBreak {
            expected: head.cell_id.to_string(),
            got: cell.header.prev_cell_hash.to_string(),
        });
    }

    // ── 6. Integrity ─────────────────────────────────────────────────────────
    if !verify_integrity(cell) {
        return Err(DgError::IntegrityViolation(cell.cell_id.to_string()));
    }

    // ── 7. Temporal monotonicity ─────────────────────────────────────────────
    if cell.header.system_time < head.header.system_time {
        return Err(DgError::TemporalViolation {
            head: head.header.system_time.to_string(),
            got: cell.header.system_time.to_string(),
        });
    }

    // ── 8. Structural rules per cell type ────────────────────────────────────
    validate_structure(chain, cell)?;

    // ── 9. Signature ─────────────────────────────────────────────────────────
    if cell.proof.signature_required && !verify_signature(cell, resolver)? {
        return Err(DgError::SignatureInvalid);
    }

    Ok(())
}
