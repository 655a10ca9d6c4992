//! Sealing and signature primitives for DecisionGraph cells: SHA-256 content
//! addressing, Ed25519 signatures over canonical sealed bytes, and the key
//! resolution seam integrators plug into.

pub mod ed25519;
pub mod hash;
pub mod keypair;
pub mod resolver;
pub mod seal;

pub use ed25519::{verify_signature as verify_detached, SignatureError};
pub use hash::{genesis_rule_logic_hash, merkle_root, policy_hash, salted_case_id_hash, sha256_hex};
pub use keypair::KeyPair;
pub use resolver::{KeyResolver, MutexKeyResolver, StaticKeyResolver};
pub use seal::{seal, signed_proof, verify_integrity, verify_signature};
