//! Sender key storage collaborator
//!
//! The group cipher and session builder borrow a record for the duration of
//! one serialized job: load, mutate, store. Stores only ever see whole
//! records.

mod memory;

use async_trait::async_trait;
pub use memory::MemorySenderKeyStore;
use thiserror::Error;

use crate::{identity::SenderKeyIdentity, record::SenderKeyRecord};

/// Errors from the storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Stored bytes do not decode to a valid record
    #[error("corrupted sender key record: {reason}")]
    Corrupted {
        /// What failed to decode
        reason: String,
    },

    /// Backend failure (I/O, connection, ...)
    #[error("storage backend error: {reason}")]
    Backend {
        /// Backend-specific description
        reason: String,
    },
}

impl StoreError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// A corrupted record will not heal on retry; backend errors may.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }
}

/// Persistent storage for sender key records, keyed by identity.
///
/// Must be Clone (shared between builder and cipher), Send + Sync, and
/// `'static` so calls can run inside queue jobs. Clones access the same
/// underlying storage.
///
/// Stores are always awaited before a job completes, so the next job for the
/// same identity observes the previous write.
#[async_trait]
pub trait SenderKeyStore: Clone + Send + Sync + 'static {
    /// Load the record for `identity`. `None` if nothing was ever stored.
    async fn load_sender_key(
        &self,
        identity: &SenderKeyIdentity,
    ) -> Result<Option<SenderKeyRecord>, StoreError>;

    /// Replace the record for `identity`.
    async fn store_sender_key(
        &self,
        identity: &SenderKeyIdentity,
        record: &SenderKeyRecord,
    ) -> Result<(), StoreError>;
}
