//! Wire format error types

use murmur_crypto::CryptoError;
use thiserror::Error;

/// Result alias for wire format operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors from encoding, decoding and authenticating wire messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Distribution message bytes do not parse
    #[error("invalid sender key distribution message: {reason}")]
    InvalidDistributionMessage {
        /// What was wrong with the input
        reason: String,
    },

    /// Sender key message bytes do not parse
    #[error("invalid sender key message: {reason}")]
    InvalidSenderKeyMessage {
        /// What was wrong with the input
        reason: String,
    },

    /// Message version is older than this implementation speaks
    #[error("unsupported message version: {version}")]
    UnsupportedVersion {
        /// Version recovered from the high nibble of the version byte
        version: u8,
    },

    /// Signature does not verify under the sender's public key
    #[error("invalid signature for key id {key_id}")]
    InvalidSignature {
        /// Key id the message claims
        key_id: i32,
    },

    /// Signing failed in the primitive layer
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ProtocolError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Malformed or forged input is never retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidDistributionMessage { .. }
            | Self::InvalidSenderKeyMessage { .. }
            | Self::UnsupportedVersion { .. }
            | Self::InvalidSignature { .. } => true,
            Self::Crypto(err) => err.is_fatal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_is_fatal() {
        assert!(ProtocolError::InvalidSignature { key_id: 7 }.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::InvalidSenderKeyMessage { reason: "too short".to_string() };
        assert_eq!(err.to_string(), "invalid sender key message: too short");
    }
}
