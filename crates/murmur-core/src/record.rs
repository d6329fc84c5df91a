//! Sender key record: every state known for one identity
//!
//! States are kept in insertion order and the most recently added one is
//! current. Older states stay around so messages still in flight under a
//! rotated key can be decrypted.
//!
//! # Serialization
//!
//! Records are persisted as CBOR (via ciborium). The stored form mirrors the
//! state fields one to one and is zeroized on drop.

use murmur_crypto::{IV_SIZE, KEY_SIZE, MessageKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{error::GroupError, state::SenderKeyState, store::StoreError};

/// Ordered sender key states for one identity.
#[derive(Debug, Clone, Default)]
pub struct SenderKeyRecord {
    states: Vec<SenderKeyState>,
}

impl SenderKeyRecord {
    /// Record with no states.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no chain has been established.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Most recently added state.
    pub fn current_state(&self) -> Option<&SenderKeyState> {
        self.states.last()
    }

    /// Most recently added state, mutably.
    pub fn current_state_mut(&mut self) -> Option<&mut SenderKeyState> {
        self.states.last_mut()
    }

    /// State with the given key id.
    pub fn state_by_key_id(&self, key_id: i32) -> Option<&SenderKeyState> {
        self.states.iter().find(|state| state.key_id() == key_id)
    }

    /// State with the given key id, mutably.
    pub fn state_by_key_id_mut(&mut self, key_id: i32) -> Option<&mut SenderKeyState> {
        self.states.iter_mut().find(|state| state.key_id() == key_id)
    }

    /// All states, oldest first.
    pub fn states(&self) -> &[SenderKeyState] {
        &self.states
    }

    /// Append a state, making it current.
    ///
    /// # Errors
    ///
    /// - `DuplicateKeyId` if a state with the same key id exists
    pub fn add_state(&mut self, state: SenderKeyState) -> Result<(), GroupError> {
        if self.state_by_key_id(state.key_id()).is_some() {
            return Err(GroupError::DuplicateKeyId { key_id: state.key_id() });
        }
        self.states.push(state);
        Ok(())
    }

    /// Encode as CBOR.
    ///
    /// # Errors
    ///
    /// - `StoreError::Corrupted` if encoding fails
    pub fn serialize(&self) -> Result<Vec<u8>, StoreError> {
        let stored = StoredRecord { states: self.states.iter().map(StoredState::from).collect() };

        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&stored, &mut encoded)
            .map_err(|e| StoreError::Corrupted { reason: format!("CBOR encode failed: {e}") })?;
        Ok(encoded)
    }

    /// Decode from CBOR.
    ///
    /// # Errors
    ///
    /// - `StoreError::Corrupted` if the bytes do not decode to a valid record
    pub fn deserialize(bytes: &[u8]) -> Result<Self, StoreError> {
        let stored: StoredRecord = ciborium::de::from_reader(bytes)
            .map_err(|e| StoreError::Corrupted { reason: format!("CBOR decode failed: {e}") })?;

        let mut record = Self::new();
        for state in &stored.states {
            let state = state.to_state().map_err(|e| StoreError::Corrupted {
                reason: format!("invalid stored state: {e}"),
            })?;
            record.add_state(state).map_err(|e| StoreError::Corrupted {
                reason: format!("invalid stored record: {e}"),
            })?;
        }
        Ok(record)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredRecord {
    states: Vec<StoredState>,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredState {
    key_id: i32,
    iteration: u32,
    seed: [u8; KEY_SIZE],
    signing_public_key: [u8; KEY_SIZE],
    signing_private_key: Option<[u8; KEY_SIZE]>,
    message_keys: Vec<StoredMessageKey>,
    max_message_keys: usize,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredMessageKey {
    iteration: u32,
    iv: [u8; IV_SIZE],
    cipher_key: [u8; KEY_SIZE],
    seed: [u8; KEY_SIZE],
}

impl From<&SenderKeyState> for StoredState {
    fn from(state: &SenderKeyState) -> Self {
        Self {
            key_id: state.key_id(),
            iteration: state.chain_key().iteration(),
            seed: *state.chain_key().seed(),
            signing_public_key: *state.signing_public_key(),
            signing_private_key: state.signing_private_key().copied(),
            message_keys: state
                .message_keys()
                .map(|key| StoredMessageKey {
                    iteration: key.iteration(),
                    iv: *key.iv(),
                    cipher_key: *key.cipher_key(),
                    seed: *key.seed(),
                })
                .collect(),
            max_message_keys: state.max_message_keys(),
        }
    }
}

impl StoredState {
    fn to_state(&self) -> Result<SenderKeyState, GroupError> {
        let mut builder = SenderKeyState::builder()
            .key_id(self.key_id)
            .iteration(self.iteration)
            .seed(&self.seed)
            .signing_public_key(self.signing_public_key)
            .max_message_keys(self.max_message_keys)
            .message_keys(self.message_keys.iter().map(|key| {
                MessageKey::from_parts(key.iteration, key.iv, key.cipher_key, key.seed)
            }));

        if let Some(private) = self.signing_private_key {
            builder = builder.signing_private_key(private);
        }
        builder.build()
    }
}
