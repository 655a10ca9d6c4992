use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use decisiongraph_core::constants::GENESIS_RULE_ID;
use decisiongraph_core::to_canonical_bytes;

/// SHA-256 of arbitrary bytes → lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// The fixed `rule_logic_hash` anchored by genesis cells.
pub fn genesis_rule_logic_hash() -> &'static str {
    static HASH: Lazy<String> = Lazy::new(|| sha256_hex(GENESIS_RULE_ID.as_bytes()));
    &HASH
}

/// Hash of a promoted rule set: SHA-256 over the canonical JSON array of the
/// sorted, deduplicated rule ids. Shared by PolicyHead validation and the
/// promotion signing payload so there is exactly one preimage convention.
pub fn policy_hash(rule_ids: &[String]) -> String {
    let mut sorted: Vec<&String> = rule_ids.iter().collect();
    sorted.sort_unstable();
    sorted.dedup();
    let value = serde_json::json!(sorted);
    let bytes = to_canonical_bytes(&value).expect("string array has no floats");
    sha256_hex(&bytes)
}

/// Salted hash linking a sealed judgment to an institution's case id.
/// Linkable only by the salt holder.
pub fn salted_case_id_hash(salt: &[u8], case_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(case_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Merkle root over evidence payload hashes (hex leaves).
///
/// Pairwise SHA-256 over the concatenated child hex strings; an odd leaf is
/// carried up unchanged. Empty input has no root.
pub fn merkle_root(leaves: &[String]) -> Option<String> {
    if leaves.is_empty() {
        return None;
    }
    let mut level: Vec<String> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => {
                    let mut joined = String::with_capacity(left.len() + right.len());
                    joined.push_str(left);
                    joined.push_str(right);
                    next.push(sha256_hex(joined.as_bytes()));
                }
                [lone] => next.push(lone.clone()),
                _ => unreachable!("chunks(2) yields 1 or 2 items"),
            }
        }
        level = next;
    }
    Some(level.remove(0))
}
