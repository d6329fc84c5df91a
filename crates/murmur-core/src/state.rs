//! Sender key state: one chain with its signing key and skipped-key cache
//!
//! # Invariants
//!
//! - Cached message keys have distinct iterations, kept in insertion order
//! - The cache never holds more than `max_message_keys` entries; the oldest
//!   are evicted first
//! - A state is never partially built: every required field is checked at
//!   construction

use std::collections::VecDeque;

use murmur_crypto::{ChainKey, KEY_SIZE, KeyPair, MessageKey};
use zeroize::Zeroizing;

use crate::{config::MAX_MESSAGE_KEYS, error::GroupError};

/// One sender chain, identified by its key id.
///
/// Send-capable states carry the signing private key; states seeded from a
/// peer's distribution message only carry the public half.
#[derive(Clone)]
pub struct SenderKeyState {
    key_id: i32,
    chain_key: ChainKey,
    signing_public_key: [u8; KEY_SIZE],
    signing_private_key: Option<Zeroizing<[u8; KEY_SIZE]>>,
    message_keys: VecDeque<MessageKey>,
    max_message_keys: usize,
}

impl SenderKeyState {
    /// Start building a state.
    pub fn builder() -> SenderKeyStateBuilder {
        SenderKeyStateBuilder::default()
    }

    /// Key id announced in distribution messages.
    pub fn key_id(&self) -> i32 {
        self.key_id
    }

    /// Current chain head.
    pub fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    /// Replace the chain head.
    pub fn set_chain_key(&mut self, chain_key: ChainKey) {
        self.chain_key = chain_key;
    }

    /// Public half of the signing key.
    pub fn signing_public_key(&self) -> &[u8; KEY_SIZE] {
        &self.signing_public_key
    }

    /// Private half of the signing key, absent for receive-only states.
    pub fn signing_private_key(&self) -> Option<&[u8; KEY_SIZE]> {
        self.signing_private_key.as_deref()
    }

    /// Whether a skipped key for `iteration` is cached.
    pub fn has_message_key(&self, iteration: u32) -> bool {
        self.message_keys.iter().any(|key| key.iteration() == iteration)
    }

    /// Cache a skipped message key, evicting the oldest entries past the cap.
    ///
    /// A cached key with the same iteration is replaced.
    pub fn add_message_key(&mut self, message_key: MessageKey) {
        if let Some(pos) =
            self.message_keys.iter().position(|key| key.iteration() == message_key.iteration())
        {
            self.message_keys.remove(pos);
        }
        self.message_keys.push_back(message_key);
        self.trim_message_keys();
    }

    /// Remove and return the cached key for `iteration`.
    pub fn remove_message_key(&mut self, iteration: u32) -> Option<MessageKey> {
        let pos = self.message_keys.iter().position(|key| key.iteration() == iteration)?;
        self.message_keys.remove(pos)
    }

    /// Number of cached skipped keys.
    pub fn message_key_count(&self) -> usize {
        self.message_keys.len()
    }

    /// Cached skipped keys, oldest first.
    pub fn message_keys(&self) -> impl Iterator<Item = &MessageKey> {
        self.message_keys.iter()
    }

    /// Cap on cached skipped keys.
    pub fn max_message_keys(&self) -> usize {
        self.max_message_keys
    }

    /// Change the cache cap and evict down to it.
    pub fn set_max_message_keys(&mut self, max_message_keys: usize) {
        self.max_message_keys = max_message_keys;
        self.trim_message_keys();
    }

    /// Evict the oldest cached keys until the cap holds. Returns how many were
    /// evicted.
    pub fn trim_message_keys(&mut self) -> usize {
        let excess = self.message_keys.len().saturating_sub(self.max_message_keys);
        if excess > 0 {
            self.message_keys.drain(..excess);
            tracing::debug!(
                key_id = self.key_id,
                evicted = excess,
                remaining = self.message_keys.len(),
                "evicted skipped message keys"
            );
        }
        excess
    }
}

impl std::fmt::Debug for SenderKeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderKeyState")
            .field("key_id", &self.key_id)
            .field("iteration", &self.chain_key.iteration())
            .field("can_sign", &self.signing_private_key.is_some())
            .field("message_keys", &self.message_keys.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`SenderKeyState`].
///
/// `key_id`, `iteration`, `seed` and the signing public key are required.
#[derive(Default)]
pub struct SenderKeyStateBuilder {
    key_id: Option<i32>,
    iteration: Option<u32>,
    seed: Option<Zeroizing<Vec<u8>>>,
    signing_public_key: Option<[u8; KEY_SIZE]>,
    signing_private_key: Option<Zeroizing<[u8; KEY_SIZE]>>,
    message_keys: Vec<MessageKey>,
    max_message_keys: Option<usize>,
}

impl SenderKeyStateBuilder {
    /// Key id of the chain.
    pub fn key_id(mut self, key_id: i32) -> Self {
        self.key_id = Some(key_id);
        self
    }

    /// Iteration of the initial chain key.
    pub fn iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Seed of the initial chain key.
    pub fn seed(mut self, seed: &[u8]) -> Self {
        self.seed = Some(Zeroizing::new(seed.to_vec()));
        self
    }

    /// Both halves of the signing key (send-capable state).
    pub fn signing_key_pair(mut self, pair: &KeyPair) -> Self {
        self.signing_public_key = Some(pair.public);
        self.signing_private_key = Some(pair.private.clone());
        self
    }

    /// Public signing key only (receive-only state).
    pub fn signing_public_key(mut self, public: [u8; KEY_SIZE]) -> Self {
        self.signing_public_key = Some(public);
        self
    }

    /// Private signing key, paired with [`signing_public_key`](Self::signing_public_key).
    pub fn signing_private_key(mut self, private: [u8; KEY_SIZE]) -> Self {
        self.signing_private_key = Some(Zeroizing::new(private));
        self
    }

    /// Previously cached skipped keys, oldest first.
    pub fn message_keys(mut self, message_keys: impl IntoIterator<Item = MessageKey>) -> Self {
        self.message_keys.extend(message_keys);
        self
    }

    /// Cap on cached skipped keys. Defaults to [`MAX_MESSAGE_KEYS`].
    pub fn max_message_keys(mut self, max_message_keys: usize) -> Self {
        self.max_message_keys = Some(max_message_keys);
        self
    }

    /// Build the state.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if a required field is missing or the seed is empty
    /// - `Crypto(InvalidKeyMaterial)` if the seed is not 32 bytes
    pub fn build(self) -> Result<SenderKeyState, GroupError> {
        let key_id = self.key_id.ok_or(GroupError::InvalidState { field: "key_id" })?;
        let iteration = self.iteration.ok_or(GroupError::InvalidState { field: "iteration" })?;
        let seed = self
            .seed
            .filter(|seed| !seed.is_empty())
            .ok_or(GroupError::InvalidState { field: "seed" })?;
        let signing_public_key = self
            .signing_public_key
            .ok_or(GroupError::InvalidState { field: "signing_public_key" })?;

        let chain_key = ChainKey::new(iteration, seed.as_slice())?;

        let mut state = SenderKeyState {
            key_id,
            chain_key,
            signing_public_key,
            signing_private_key: self.signing_private_key,
            message_keys: VecDeque::with_capacity(self.message_keys.len()),
            max_message_keys: self.max_message_keys.unwrap_or(MAX_MESSAGE_KEYS),
        };
        for key in self.message_keys {
            state.add_message_key(key);
        }

        Ok(state)
    }
}
