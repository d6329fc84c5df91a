//! Error types for ratchet and primitive operations

use thiserror::Error;

/// Errors from key derivation and the cryptographic primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key material has the wrong length
    #[error("invalid key material: expected {expected} bytes, got {actual}")]
    InvalidKeyMaterial {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Chain iteration would overflow
    #[error("chain iteration overflow at {current}")]
    IterationOverflow {
        /// Iteration at which the overflow was detected
        current: u32,
    },

    /// Secret expansion failed
    #[error("key derivation failed: {reason}")]
    KeyDerivation {
        /// Reason reported by the KDF
        reason: String,
    },

    /// Public signing key is not a valid curve point
    #[error("invalid signing key")]
    InvalidSigningKey,

    /// Payload cipher rejected the ciphertext (tampered or wrong key)
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// Payload cipher could not encrypt
    #[error("encryption failed: {reason}")]
    EncryptionFailed {
        /// Reason for encryption failure
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Every primitive failure is fatal except an overflowing chain, which is
    /// recovered by distributing a fresh sender key.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::IterationOverflow { .. })
    }
}
