//! Cell sealing and verification.
//!
//! The seal (`cell_id`) is SHA-256 over the sealed bytes assembled by the
//! header's hash scheme. Signatures, when required, cover the same bytes.

use decisiongraph_core::cell::{sealed_bytes, Cell, CellHeader, EvidenceItem, Fact, LogicAnchor, Proof};
use decisiongraph_core::error::DgError;
use decisiongraph_core::types::{CellId, SourceQuality};

use crate::ed25519;
use crate::hash::{merkle_root, sha256_hex};
use crate::resolver::KeyResolver;

/// Seal a cell: validate the confidence/source pairing, compute the content
/// address, and bind evidence through the proof's Merkle root.
pub fn seal(
    header: CellHeader,
    fact: Fact,
    logic_anchor: LogicAnchor,
    evidence: Vec<EvidenceItem>,
    mut proof: Proof,
) -> Result<Cell, DgError> {
    if fact.confidence.is_certain() && fact.source_quality != SourceQuality::Verified {
        return Err(DgError::InvalidConfidence(
            "certainty requires source_quality = verified".to_string(),
        ));
    }

    let bytes = sealed_bytes(&header, &fact, &logic_anchor)?;
    let cell_id = CellId::parse(&sha256_hex(&bytes)).expect("sha256 hex is a valid cell id");

    let leaves: Vec<String> = evidence.iter().map(|e| e.payload_hash.clone()).collect();
    proof.merkle_root = merkle_root(&leaves);

    Ok(Cell {
        header,
        fact,
        logic_anchor,
        evidence,
        proof,
        cell_id,
    })
}

/// Recompute the seal and compare. Cheap; no signature work.
pub fn verify_integrity(cell: &Cell) -> bool {
    match cell.sealed_bytes() {
        Ok(bytes) => sha256_hex(&bytes) == cell.cell_id.as_str(),
        Err(_) => false,
    }
}

/// Verify the Ed25519 signature over the canonical sealed bytes.
///
/// Cells with `signature_required = false` (bootstrap mode) pass without
/// verification — the flag is explicit per cell. Returns `false` for a
/// missing or non-verifying signature; resolver misses surface as
/// `UnknownSignerKey` so the caller can distinguish key-distribution
/// problems from forgery.
pub fn verify_signature(cell: &Cell, resolver: &dyn KeyResolver) -> Result<bool, DgError> {
    if !cell.proof.signature_required {
        return Ok(true);
    }
    let (Some(key_id), Some(signature)) =
        (&cell.proof.signer_key_id, &cell.proof.signature)
    else {
        return Ok(false);
    };
    let key = resolver
        .resolve(key_id)
        .ok_or_else(|| DgError::UnknownSignerKey(key_id.clone()))?;
    let bytes = cell.sealed_bytes()?;
    Ok(ed25519::verify_signature(&key, &bytes, signature).is_ok())
}

/// Sign the sealed bytes of a prospective cell with `keypair`, producing a
/// proof with `signature_required = true`.
pub fn signed_proof(
    header: &CellHeader,
    fact: &Fact,
    anchor: &LogicAnchor,
    signer_id: &str,
    keypair: &crate::keypair::KeyPair,
) -> Result<Proof, DgError> {
    let bytes = sealed_bytes(header, fact, anchor)?;
    Ok(Proof {
        signer_id: Some(signer_id.to_string()),
        signer_key_id: Some(keypair.key_id.clone()),
        signature: Some(keypair.sign(&bytes)),
        merkle_root: None,
        signature_required: true,
    })
}
