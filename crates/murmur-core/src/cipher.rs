//! Group cipher: encrypt and decrypt for one sender key identity
//!
//! # Encrypt
//!
//! ```text
//! load record -> current state -> message key at head
//!   -> encrypt payload -> sign message -> advance head -> store
//! ```
//!
//! # Decrypt
//!
//! ```text
//! load record -> decode message -> state by key id -> verify signature
//!   -> resolve message key (catch-up) -> decrypt payload -> store
//! ```
//!
//! Nothing is stored unless the whole operation succeeds, so a forged,
//! replayed or undecryptable message leaves the record untouched.

use murmur_crypto::{CryptoProvider, MessageKey};
use murmur_proto::SenderKeyMessage;

use crate::{
    config::GroupConfig,
    error::GroupError,
    identity::SenderKeyIdentity,
    queue::JobQueue,
    record::SenderKeyRecord,
    state::SenderKeyState,
    store::SenderKeyStore,
};

/// Encrypts and decrypts group messages for one identity.
///
/// Each call is one job on the shared [`JobQueue`], keyed by the identity, so
/// concurrent calls for the same identity behave as if run one at a time.
#[derive(Debug, Clone)]
pub struct GroupCipher<S, P> {
    store: S,
    provider: P,
    queue: JobQueue,
    identity: SenderKeyIdentity,
    config: GroupConfig,
}

impl<S: SenderKeyStore, P: CryptoProvider> GroupCipher<S, P> {
    /// Create a cipher for `identity` with the default configuration.
    pub fn new(store: S, provider: P, queue: JobQueue, identity: SenderKeyIdentity) -> Self {
        Self::with_config(store, provider, queue, identity, GroupConfig::default())
    }

    /// Create a cipher for `identity` with explicit limits.
    ///
    /// `max_message_keys` is applied to each state a message decrypts under,
    /// evicting its oldest skipped keys if the stored cap was larger.
    pub fn with_config(
        store: S,
        provider: P,
        queue: JobQueue,
        identity: SenderKeyIdentity,
        config: GroupConfig,
    ) -> Self {
        Self { store, provider, queue, identity, config }
    }

    /// Identity this cipher is bound to.
    pub fn identity(&self) -> &SenderKeyIdentity {
        &self.identity
    }

    /// Encrypt `plaintext` with the current chain and return the serialized
    /// [`SenderKeyMessage`].
    ///
    /// # Errors
    ///
    /// - `NoSenderKeyRecord` if nothing is stored for the identity
    /// - `NoSessionState` if the record has no states
    /// - `MissingSigningKey` if the current state is receive-only
    /// - `Crypto` if the chain is exhausted or the payload cipher fails
    /// - `Store` if loading or storing the record fails
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, GroupError> {
        let store = self.store.clone();
        let provider = self.provider.clone();
        let identity = self.identity.clone();
        let plaintext = plaintext.to_vec();

        self.queue
            .run(&self.identity.serialize(), async move {
                encrypt_job(&store, &provider, &identity, &plaintext).await
            })
            .await?
    }

    /// Verify and decrypt a serialized [`SenderKeyMessage`].
    ///
    /// # Errors
    ///
    /// - `NoSenderKeyRecord` / `EmptySenderKeyRecord` if no chain is known
    /// - `Protocol` if the message is malformed or its signature is invalid
    /// - `UnknownKeyId` if the message's key id is not in the record
    /// - `OldCounter` if the iteration is behind the chain and not cached
    /// - `FutureMessageLimitExceeded` if the iteration is too far ahead
    /// - `Crypto(DecryptionFailed)` if the payload does not authenticate
    /// - `Store` if loading or storing the record fails
    pub async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, GroupError> {
        let store = self.store.clone();
        let provider = self.provider.clone();
        let identity = self.identity.clone();
        let config = self.config;
        let ciphertext = ciphertext.to_vec();

        self.queue
            .run(&self.identity.serialize(), async move {
                decrypt_job(&store, &provider, config, &identity, &ciphertext).await
            })
            .await?
    }
}

async fn encrypt_job<S: SenderKeyStore, P: CryptoProvider>(
    store: &S,
    provider: &P,
    identity: &SenderKeyIdentity,
    plaintext: &[u8],
) -> Result<Vec<u8>, GroupError> {
    let mut record = load(store, identity).await?;

    let state = record
        .current_state_mut()
        .ok_or_else(|| GroupError::NoSessionState { identity: identity.serialize() })?;
    let key_id = state.key_id();
    let chain_key = state.chain_key().clone();
    let signing_key =
        state.signing_private_key().ok_or(GroupError::MissingSigningKey { key_id })?;
    let iteration = chain_key.iteration();
    let message_key = chain_key.message_key(provider)?;

    let ciphertext = provider.encrypt(message_key.cipher_key(), plaintext, message_key.iv())?;
    let message = SenderKeyMessage::new(key_id, iteration, &ciphertext, signing_key, provider)?;

    state.set_chain_key(chain_key.next(provider)?);
    persist(store, identity, &record).await?;

    tracing::info!(identity = %identity, key_id, iteration, "encrypted group message");
    Ok(message.serialize().to_vec())
}

async fn decrypt_job<S: SenderKeyStore, P: CryptoProvider>(
    store: &S,
    provider: &P,
    config: GroupConfig,
    identity: &SenderKeyIdentity,
    ciphertext: &[u8],
) -> Result<Vec<u8>, GroupError> {
    let mut record = load(store, identity).await?;
    if record.is_empty() {
        return Err(GroupError::EmptySenderKeyRecord { identity: identity.serialize() });
    }

    let message = SenderKeyMessage::deserialize(ciphertext)?;
    let key_id = message.key_id();
    let iteration = message.iteration();

    let state =
        record.state_by_key_id_mut(key_id).ok_or(GroupError::UnknownKeyId { key_id })?;
    state.set_max_message_keys(config.max_message_keys);

    message.verify_signature(state.signing_public_key(), provider).inspect_err(|_| {
        tracing::warn!(identity = %identity, key_id, iteration, "rejected message signature");
    })?;

    let message_key = resolve_message_key(state, iteration, config.max_future_messages, provider)
        .inspect_err(|e| match e {
            GroupError::OldCounter { current, .. } => {
                tracing::warn!(identity = %identity, key_id, iteration, current, "old counter");
            },
            GroupError::FutureMessageLimitExceeded { current, .. } => {
                tracing::error!(
                    identity = %identity,
                    key_id,
                    iteration,
                    current,
                    "message too far in the future"
                );
            },
            _ => {},
        })?;

    let plaintext =
        provider.decrypt(message_key.cipher_key(), message.ciphertext(), message_key.iv())?;

    persist(store, identity, &record).await?;

    tracing::info!(identity = %identity, key_id, iteration, "decrypted group message");
    Ok(plaintext)
}

/// Message key for `iteration`, catching the chain up as needed.
///
/// - Behind the head: the cached skipped key is removed and returned
/// - More than `max_future_messages` ahead: rejected
/// - Otherwise: keys for every iteration between the head and the target are
///   cached, and the head moves to `iteration + 1`
///
/// # Errors
///
/// - `OldCounter` if the iteration is behind the head and not cached
/// - `FutureMessageLimitExceeded` if the iteration is too far ahead
/// - `Crypto` if the chain cannot be advanced
pub fn resolve_message_key(
    state: &mut SenderKeyState,
    iteration: u32,
    max_future_messages: u32,
    provider: &impl CryptoProvider,
) -> Result<MessageKey, GroupError> {
    let current = state.chain_key().iteration();

    if iteration < current {
        return state
            .remove_message_key(iteration)
            .ok_or(GroupError::OldCounter { current, requested: iteration });
    }

    if iteration - current > max_future_messages {
        return Err(GroupError::FutureMessageLimitExceeded { current, requested: iteration });
    }

    // Derive everything first so a failure leaves the state untouched
    let mut chain_key = state.chain_key().clone();
    let mut skipped = Vec::new();
    while chain_key.iteration() < iteration {
        skipped.push(chain_key.message_key(provider)?);
        chain_key = chain_key.next(provider)?;
    }
    let message_key = chain_key.message_key(provider)?;
    let head = chain_key.next(provider)?;

    for key in skipped {
        state.add_message_key(key);
    }
    state.set_chain_key(head);

    if iteration > current {
        tracing::debug!(
            key_id = state.key_id(),
            skipped = iteration - current,
            cached = state.message_key_count(),
            "caught up sender chain"
        );
    }

    Ok(message_key)
}

async fn load<S: SenderKeyStore>(
    store: &S,
    identity: &SenderKeyIdentity,
) -> Result<SenderKeyRecord, GroupError> {
    store
        .load_sender_key(identity)
        .await
        .inspect_err(|e| {
            tracing::error!(identity = %identity, error = %e, "failed to load sender key");
        })?
        .ok_or_else(|| GroupError::NoSenderKeyRecord { identity: identity.serialize() })
}

async fn persist<S: SenderKeyStore>(
    store: &S,
    identity: &SenderKeyIdentity,
    record: &SenderKeyRecord,
) -> Result<(), GroupError> {
    store.store_sender_key(identity, record).await.inspect_err(|e| {
        tracing::error!(identity = %identity, error = %e, "failed to store sender key");
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use murmur_crypto::{ChainKey, CryptoError, RustCryptoProvider};

    use super::*;

    fn receive_state(iteration: u32) -> SenderKeyState {
        SenderKeyState::builder()
            .key_id(1)
            .iteration(iteration)
            .seed(&[7u8; 32])
            .signing_public_key([0; 32])
            .build()
            .unwrap()
    }

    fn expected_key(iteration: u32, provider: &RustCryptoProvider) -> MessageKey {
        let mut chain = ChainKey::new(0, &[7u8; 32]).unwrap();
        while chain.iteration() < iteration {
            chain = chain.next(provider).unwrap();
        }
        chain.message_key(provider).unwrap()
    }

    #[test]
    fn resolve_at_head_advances_by_one() {
        let provider = RustCryptoProvider::seeded(1);
        let mut state = receive_state(0);

        let key = resolve_message_key(&mut state, 0, 2000, &provider).unwrap();

        assert_eq!(key, expected_key(0, &provider));
        assert_eq!(state.chain_key().iteration(), 1);
        assert_eq!(state.message_key_count(), 0);
    }

    #[test]
    fn resolve_ahead_caches_skipped_keys() {
        let provider = RustCryptoProvider::seeded(2);
        let mut state = receive_state(0);

        let key = resolve_message_key(&mut state, 3, 2000, &provider).unwrap();

        assert_eq!(key, expected_key(3, &provider));
        assert_eq!(state.chain_key().iteration(), 4);
        assert_eq!(state.message_key_count(), 3);
        assert!((0..3).all(|i| state.has_message_key(i)));
    }

    #[test]
    fn resolve_behind_consumes_cached_key() {
        let provider = RustCryptoProvider::seeded(3);
        let mut state = receive_state(0);
        resolve_message_key(&mut state, 3, 2000, &provider).unwrap();

        let key = resolve_message_key(&mut state, 1, 2000, &provider).unwrap();
        assert_eq!(key, expected_key(1, &provider));
        assert!(!state.has_message_key(1));

        let replay = resolve_message_key(&mut state, 1, 2000, &provider);
        assert!(matches!(replay, Err(GroupError::OldCounter { current: 4, requested: 1 })));
    }

    #[test]
    fn resolve_rejects_far_future() {
        let provider = RustCryptoProvider::seeded(4);
        let mut state = receive_state(10);

        let result = resolve_message_key(&mut state, 21, 10, &provider);

        assert!(matches!(
            result,
            Err(GroupError::FutureMessageLimitExceeded { current: 10, requested: 21 })
        ));
        assert_eq!(state.chain_key().iteration(), 10);
        assert_eq!(state.message_key_count(), 0);
    }

    #[test]
    fn resolve_accepts_exact_limit() {
        let provider = RustCryptoProvider::seeded(5);
        let mut state = receive_state(10);

        resolve_message_key(&mut state, 20, 10, &provider).unwrap();

        assert_eq!(state.chain_key().iteration(), 21);
        assert_eq!(state.message_key_count(), 10);
    }

    #[test]
    fn exhausted_chain_leaves_state_untouched() {
        let provider = RustCryptoProvider::seeded(6);
        let mut state = receive_state(u32::MAX - 3);

        let result = resolve_message_key(&mut state, u32::MAX, 2000, &provider);

        assert!(matches!(
            result,
            Err(GroupError::Crypto(CryptoError::IterationOverflow { current: u32::MAX }))
        ));
        assert_eq!(state.chain_key().iteration(), u32::MAX - 3);
        assert_eq!(state.message_key_count(), 0);
    }
}
