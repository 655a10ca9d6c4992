use ed25519_dalek::VerifyingKey;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Maps a cell's `signer_key_id` to a verification key. Supplied by the
/// integrator; resolution is the only place signature checking may block.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, signer_key_id: &str) -> Option<VerifyingKey>;
}

/// In-memory resolver over a fixed key table.
#[derive(Default)]
pub struct StaticKeyResolver {
    keys: HashMap<String, VerifyingKey>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key_id: &str, key: VerifyingKey) {
        self.keys.insert(key_id.to_string(), key);
    }

    pub fn with_key(mut self, key_id: &str, key: VerifyingKey) -> Self {
        self.insert(key_id, key);
        self
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve(&self, signer_key_id: &str) -> Option<VerifyingKey> {
        self.keys.get(signer_key_id).copied()
    }
}

/// Adapts a resolver that is `Send` but not `Sync` (e.g. one holding a
/// connection handle) by serializing access behind a mutex.
pub struct MutexKeyResolver<R> {
    inner: Mutex<R>,
}

impl<R> MutexKeyResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<R: Send> KeyResolver for MutexKeyResolver<R>
where
    R: FnMut(&str) -> Option<VerifyingKey>,
{
    fn resolve(&self, signer_key_id: &str) -> Option<VerifyingKey> {
        let mut resolve = self.inner.lock();
        (*resolve)(signer_key_id)
    }
}
