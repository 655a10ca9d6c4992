use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// An Ed25519 keypair bound to a key id, e.g. `owner:acme.hr`.
///
/// The signing key's seed is wiped on drop; `Debug` never prints secret
/// material.
pub struct KeyPair {
    pub key_id: String,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a fresh keypair for `key_id`.
    pub fn generate(key_id: &str) -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            key_id: key_id.to_string(),
            signing_key,
        }
    }

    /// Restore a keypair from a 32-byte seed (e.g. loaded from a key store).
    pub fn from_seed(key_id: &str, seed: [u8; 32]) -> Self {
        let seed = Zeroizing::new(seed);
        Self {
            key_id: key_id.to_string(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Hex-encoded detached signature over `message`.
    pub fn sign(&self, message: &[u8]) -> String {
        crate::ed25519::sign(&self.signing_key, message)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Hex-encoded public key for wire use.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ key_id: {} }}", self.key_id)
    }
}
