use thiserror::Error;

#[derive(Debug, Error)]
pub enum DgError {
    // ── Structural (fatal to the append; never retried) ──────────────────────
    #[error("genesis violation: {0}")]
    GenesisViolation(String),

    #[error("graph id mismatch: chain is {expected}, cell carries {got}")]
    GraphIdMismatch { expected: String, got: String },

    #[error("hash scheme mismatch: {0}")]
    HashSchemeMismatch(String),

    #[error("chain break: expected prev {expected}, cell points at {got}")]
    ChainBreak { expected: String, got: String },

    #[error("integrity violation: seal does not match sealed fields for {0}")]
    IntegrityViolation(String),

    #[error("temporal violation: system_time {got} is before chain head {head}")]
    TemporalViolation { head: String, got: String },

    // ── Cryptographic ────────────────────────────────────────────────────────
    #[error("signature invalid")]
    SignatureInvalid,

    #[error("witness signature invalid for witness {0}")]
    WitnessSignatureInvalid(String),

    #[error("unknown signer key: {0}")]
    UnknownSignerKey(String),

    // ── Authorization ────────────────────────────────────────────────────────
    #[error("authorization denied: {requester} may not read {target}")]
    AuthorizationDenied { requester: String, target: String },

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("invalid graph id: {0}")]
    InvalidGraphId(String),

    #[error("invalid cell id: {0}")]
    InvalidCellId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid confidence: {0}")]
    InvalidConfidence(String),

    #[error("floating-point value rejected in hashed payload at {0}")]
    FloatRejected(String),

    #[error("invalid payload for {cell_type}: {detail}")]
    InvalidPayload { cell_type: String, detail: String },

    // ── Domain ───────────────────────────────────────────────────────────────
    #[error("unknown domain: {0}")]
    DomainNotFound(String),

    #[error("invalid field {field}: {detail}")]
    InvalidField { field: String, detail: String },

    // ── Promotion ────────────────────────────────────────────────────────────
    #[error("unknown witness: {witness} is not in the witness set for {namespace}")]
    UnknownWitness { witness: String, namespace: String },

    #[error("promotion not found: {0}")]
    PromotionNotFound(String),

    #[error("promotion {id} is not ready to finalize (state: {state})")]
    PromotionNotReady { id: String, state: String },

    #[error("promotion {0} has expired")]
    PromotionExpired(String),

    #[error("no witness set is effective for namespace {0}")]
    WitnessSetNotFound(String),

    // ── Query ────────────────────────────────────────────────────────────────
    #[error("deadline exceeded")]
    DeadlineExceeded,

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("write-ahead log corrupt at offset {offset}: {detail}")]
    WalCorrupt { offset: u64, detail: String },
}

impl From<serde_json::Error> for DgError {
    fn from(e: serde_json::Error) -> Self {
        DgError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for DgError {
    fn from(e: std::io::Error) -> Self {
        DgError::Storage(e.to_string())
    }
}
