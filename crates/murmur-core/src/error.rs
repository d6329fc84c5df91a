//! Error types for group session operations

use murmur_crypto::CryptoError;
use murmur_proto::ProtocolError;
use thiserror::Error;

use crate::{queue::QueueError, store::StoreError};

/// Errors from the session builder, group cipher and sender key state
#[derive(Debug, Error)]
pub enum GroupError {
    /// A sender key state was built without a required field
    #[error("invalid sender key state: missing {field}")]
    InvalidState {
        /// Name of the missing field
        field: &'static str,
    },

    /// Canonical identity string does not parse
    #[error("invalid sender key identity: {input:?}")]
    InvalidIdentity {
        /// Input that failed to parse
        input: String,
    },

    /// Nothing is stored for this identity
    #[error("no sender key record for {identity}")]
    NoSenderKeyRecord {
        /// Canonical identity string
        identity: String,
    },

    /// The stored record holds no states
    #[error("empty sender key record for {identity}")]
    EmptySenderKeyRecord {
        /// Canonical identity string
        identity: String,
    },

    /// The record has no current state to encrypt with
    #[error("no session state for {identity}")]
    NoSessionState {
        /// Canonical identity string
        identity: String,
    },

    /// Message references a key id absent from the record
    #[error("unknown sender key id {key_id}")]
    UnknownKeyId {
        /// Key id carried by the message
        key_id: i32,
    },

    /// Iteration is behind the chain head and its key is not cached
    #[error("old counter: chain at {current}, message at {requested}")]
    OldCounter {
        /// Current chain head iteration
        current: u32,
        /// Iteration carried by the message
        requested: u32,
    },

    /// Iteration is too far ahead of the chain head
    #[error("message too far in the future: chain at {current}, message at {requested}")]
    FutureMessageLimitExceeded {
        /// Current chain head iteration
        current: u32,
        /// Iteration carried by the message
        requested: u32,
    },

    /// A state with this key id is already in the record
    #[error("duplicate sender key id {key_id}")]
    DuplicateKeyId {
        /// Key id already present
        key_id: i32,
    },

    /// State is receive-only and cannot sign
    #[error("sender key {key_id} has no signing private key")]
    MissingSigningKey {
        /// Key id of the receive-only state
        key_id: i32,
    },

    /// Wire message error (malformed input or bad signature)
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Ratchet or primitive error
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Storage collaborator error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Serializer error
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl GroupError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Fatal errors mean forged or garbled input, or a local bug.
    /// The rest may be recovered by re-requesting a distribution message.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidState { .. }
            | Self::InvalidIdentity { .. }
            | Self::MissingSigningKey { .. } => true,

            Self::NoSenderKeyRecord { .. }
            | Self::EmptySenderKeyRecord { .. }
            | Self::NoSessionState { .. }
            | Self::UnknownKeyId { .. }
            | Self::OldCounter { .. }
            | Self::FutureMessageLimitExceeded { .. }
            | Self::DuplicateKeyId { .. } => false,

            Self::Protocol(err) => err.is_fatal(),
            Self::Crypto(err) => err.is_fatal(),
            Self::Store(err) => err.is_fatal(),
            Self::Queue(_) => true,
        }
    }
}
