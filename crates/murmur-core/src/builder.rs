//! Group session builder: announces local chains and seeds peer chains.

use murmur_crypto::CryptoProvider;
use murmur_proto::SenderKeyDistributionMessage;

use crate::{
    config::GroupConfig,
    error::GroupError,
    identity::SenderKeyIdentity,
    keys,
    queue::JobQueue,
    state::SenderKeyState,
    store::SenderKeyStore,
};

/// Creates and processes sender key distribution messages.
///
/// Every operation runs as a job on the shared [`JobQueue`] under the
/// identity's bucket, so it never interleaves with encrypt or decrypt calls
/// for the same identity.
#[derive(Debug, Clone)]
pub struct GroupSessionBuilder<S, P> {
    store: S,
    provider: P,
    queue: JobQueue,
    config: GroupConfig,
}

impl<S: SenderKeyStore, P: CryptoProvider> GroupSessionBuilder<S, P> {
    /// Create a builder with the default configuration.
    pub fn new(store: S, provider: P, queue: JobQueue) -> Self {
        Self::with_config(store, provider, queue, GroupConfig::default())
    }

    /// Create a builder with explicit limits.
    pub fn with_config(store: S, provider: P, queue: JobQueue, config: GroupConfig) -> Self {
        Self { store, provider, queue, config }
    }

    /// Distribution message for the local chain of `identity`.
    ///
    /// Generates a fresh chain (seed, key id and signing key pair at
    /// iteration 0) on first use; later calls announce the current state.
    ///
    /// # Errors
    ///
    /// - `NoSessionState` if no current state exists after creation
    /// - `Store` if loading or storing the record fails
    pub async fn create(
        &self,
        identity: &SenderKeyIdentity,
    ) -> Result<SenderKeyDistributionMessage, GroupError> {
        let store = self.store.clone();
        let provider = self.provider.clone();
        let config = self.config;
        let identity = identity.clone();
        let bucket = identity.serialize();

        self.queue
            .run(&bucket, async move { create_job(&store, &provider, config, &identity).await })
            .await?
    }

    /// Seed a receive-only state for `identity` from a peer's distribution
    /// message.
    ///
    /// Each distinct key id adds a state; older states are kept so messages
    /// under a rotated key still decrypt. A message for a key id already in
    /// the record is a resend and leaves the record untouched, so the chain
    /// never rewinds to an iteration whose keys were already consumed.
    ///
    /// # Errors
    ///
    /// - `Store` if loading or storing the record fails
    pub async fn process(
        &self,
        identity: &SenderKeyIdentity,
        message: &SenderKeyDistributionMessage,
    ) -> Result<(), GroupError> {
        let store = self.store.clone();
        let config = self.config;
        let identity = identity.clone();
        let message = message.clone();
        let bucket = identity.serialize();

        self.queue
            .run(&bucket, async move { process_job(&store, config, &identity, &message).await })
            .await?
    }
}

async fn create_job<S: SenderKeyStore, P: CryptoProvider>(
    store: &S,
    provider: &P,
    config: GroupConfig,
    identity: &SenderKeyIdentity,
) -> Result<SenderKeyDistributionMessage, GroupError> {
    let mut record = store.load_sender_key(identity).await?.unwrap_or_default();

    if record.is_empty() {
        let key_id = keys::generate_sender_key_id(provider);
        let seed = keys::generate_sender_key(provider);
        let signing_key = keys::generate_signing_key(provider);

        let state = SenderKeyState::builder()
            .key_id(key_id)
            .iteration(0)
            .seed(seed.as_slice())
            .signing_key_pair(&signing_key)
            .max_message_keys(config.max_message_keys)
            .build()?;
        record.add_state(state)?;

        store.store_sender_key(identity, &record).await.inspect_err(|e| {
            tracing::error!(identity = %identity, error = %e, "failed to store new sender key");
        })?;
        tracing::debug!(identity = %identity, key_id, "generated sender key");
    }

    let state = record
        .current_state()
        .ok_or_else(|| GroupError::NoSessionState { identity: identity.serialize() })?;
    let chain_key = state.chain_key();

    tracing::info!(
        identity = %identity,
        key_id = state.key_id(),
        iteration = chain_key.iteration(),
        "created sender key distribution message"
    );

    Ok(SenderKeyDistributionMessage::new(
        state.key_id(),
        chain_key.iteration(),
        chain_key.seed(),
        state.signing_public_key(),
    ))
}

async fn process_job<S: SenderKeyStore>(
    store: &S,
    config: GroupConfig,
    identity: &SenderKeyIdentity,
    message: &SenderKeyDistributionMessage,
) -> Result<(), GroupError> {
    let mut record = store.load_sender_key(identity).await?.unwrap_or_default();

    if record.state_by_key_id(message.id()).is_some() {
        tracing::debug!(
            identity = %identity,
            key_id = message.id(),
            "sender key already known, ignoring distribution message"
        );
        return Ok(());
    }

    let state = SenderKeyState::builder()
        .key_id(message.id())
        .iteration(message.iteration())
        .seed(message.chain_key())
        .signing_public_key(*message.signing_key())
        .max_message_keys(config.max_message_keys)
        .build()?;
    record.add_state(state)?;

    store.store_sender_key(identity, &record).await.inspect_err(|e| {
        tracing::error!(identity = %identity, error = %e, "failed to store sender key");
    })?;

    tracing::info!(
        identity = %identity,
        key_id = message.id(),
        iteration = message.iteration(),
        states = record.len(),
        "processed sender key distribution message"
    );
    Ok(())
}
