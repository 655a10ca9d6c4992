use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key: expected 32 bytes, got {0}")]
    InvalidPublicKey(usize),
    #[error("signature is not valid hex")]
    InvalidEncoding,
}

/// Decode a hex-encoded Ed25519 public key.
pub fn verifying_key_from_hex(hex_key: &str) -> Result<VerifyingKey, SignatureError> {
    let bytes = hex::decode(hex_key).map_err(|_| SignatureError::InvalidEncoding)?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::InvalidPublicKey(bytes.len()))?;
    VerifyingKey::from_bytes(&arr).map_err(|_| SignatureError::InvalidSignature)
}

/// Sign `message`, returning the hex-encoded detached signature.
pub fn sign(key: &SigningKey, message: &[u8]) -> String {
    hex::encode(key.sign(message).to_bytes())
}

/// Verify a hex-encoded detached Ed25519 signature.
pub fn verify_signature(
    key: &VerifyingKey,
    message: &[u8],
    signature_hex: &str,
) -> Result<(), SignatureError> {
    let bytes = hex::decode(signature_hex).map_err(|_| SignatureError::InvalidEncoding)?;
    let arr: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::InvalidSignature)?;
    let sig = Signature::from_bytes(&arr);
    key.verify(message, &sig)
        .map_err(|_| SignatureError::InvalidSignature)
}
