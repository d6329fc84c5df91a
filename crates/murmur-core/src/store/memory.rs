use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;

use super::{SenderKeyStore, StoreError};
use crate::{identity::SenderKeyIdentity, record::SenderKeyRecord};

/// In-memory sender key store for tests and simulation
///
/// Records are kept serialized under their canonical identity string, so
/// every load decodes an independent copy and a caller's in-progress
/// mutation is never visible until stored. All state sits behind
/// `Arc<Mutex<>>`; clones share it.
#[derive(Clone, Default)]
pub struct MemorySenderKeyStore {
    records: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemorySenderKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities with a stored record.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw stored bytes for `identity`.
    ///
    /// Useful for asserting that a rejected operation left storage untouched.
    pub fn raw(&self, identity: &SenderKeyIdentity) -> Option<Vec<u8>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&identity.serialize())
            .cloned()
    }
}

impl std::fmt::Debug for MemorySenderKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySenderKeyStore").field("records", &self.len()).finish()
    }
}

#[async_trait]
impl SenderKeyStore for MemorySenderKeyStore {
    async fn load_sender_key(
        &self,
        identity: &SenderKeyIdentity,
    ) -> Result<Option<SenderKeyRecord>, StoreError> {
        self.raw(identity).map(|bytes| SenderKeyRecord::deserialize(&bytes)).transpose()
    }

    async fn store_sender_key(
        &self,
        identity: &SenderKeyIdentity,
        record: &SenderKeyRecord,
    ) -> Result<(), StoreError> {
        let bytes = record.serialize()?;
        self.records.lock().unwrap_or_else(PoisonError::into_inner).insert(identity.serialize(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use murmur_crypto::{CryptoProvider, RustCryptoProvider};

    use super::*;
    use crate::state::SenderKeyState;

    fn record(provider: &RustCryptoProvider) -> SenderKeyRecord {
        let mut record = SenderKeyRecord::new();
        record
            .add_state(
                SenderKeyState::builder()
                    .key_id(11)
                    .iteration(2)
                    .seed(&[5u8; 32])
                    .signing_key_pair(&provider.generate_key_pair())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        record
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store = MemorySenderKeyStore::new();
        let identity = SenderKeyIdentity::new("g", "alice", 1);

        assert!(store.load_sender_key(&identity).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_then_load() {
        let provider = RustCryptoProvider::seeded(1);
        let store = MemorySenderKeyStore::new();
        let identity = SenderKeyIdentity::new("g", "alice", 1);

        store.store_sender_key(&identity, &record(&provider)).await.unwrap();
        let loaded = store.load_sender_key(&identity).await.unwrap().unwrap();

        assert_eq!(loaded.current_state().unwrap().key_id(), 11);
        assert_eq!(loaded.current_state().unwrap().chain_key().iteration(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn loads_are_independent_copies() {
        let provider = RustCryptoProvider::seeded(2);
        let store = MemorySenderKeyStore::new();
        let identity = SenderKeyIdentity::new("g", "alice", 1);
        store.store_sender_key(&identity, &record(&provider)).await.unwrap();

        let mut loaded = store.load_sender_key(&identity).await.unwrap().unwrap();
        let state = loaded.current_state_mut().unwrap();
        let next = state.chain_key().next(&provider).unwrap();
        state.set_chain_key(next);

        let reloaded = store.load_sender_key(&identity).await.unwrap().unwrap();
        assert_eq!(reloaded.current_state().unwrap().chain_key().iteration(), 2);
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let provider = RustCryptoProvider::seeded(3);
        let store = MemorySenderKeyStore::new();
        let clone = store.clone();
        let identity = SenderKeyIdentity::new("g", "bob", 2);

        clone.store_sender_key(&identity, &record(&provider)).await.unwrap();

        assert!(store.raw(&identity).is_some());
    }
}
