//! Ciphertext message kinds and the shared version byte.

use crate::{
    distribution::SenderKeyDistributionMessage,
    errors::{ProtocolError, Result},
    sender_key_message::SenderKeyMessage,
};

/// Protocol version written in both nibbles of the version byte.
pub const CURRENT_VERSION: u8 = 3;

/// Type tag of a [`SenderKeyMessage`].
pub const SENDERKEY_TYPE: u8 = 4;

/// Type tag of a [`SenderKeyDistributionMessage`].
pub const SENDERKEY_DISTRIBUTION_TYPE: u8 = 5;

/// Pack two versions into one byte: `high` in the upper nibble, `low` in the
/// lower.
pub fn version_byte(high: u8, low: u8) -> u8 {
    (high << 4) | (low & 0x0F)
}

/// Version carried in the high nibble of a version byte.
pub fn message_version(byte: u8) -> u8 {
    byte >> 4
}

/// A sender key wire message of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiphertextMessage {
    /// Encrypted group payload
    SenderKey(SenderKeyMessage),
    /// Chain announcement
    Distribution(SenderKeyDistributionMessage),
}

impl CiphertextMessage {
    /// Decode wire bytes according to their type tag.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidSenderKeyMessage` for an unknown type tag
    /// - Any decoding error of the selected message kind
    pub fn deserialize(message_type: u8, serialized: &[u8]) -> Result<Self> {
        match message_type {
            SENDERKEY_TYPE => SenderKeyMessage::deserialize(serialized).map(Self::SenderKey),
            SENDERKEY_DISTRIBUTION_TYPE => {
                SenderKeyDistributionMessage::deserialize(serialized).map(Self::Distribution)
            },
            other => Err(ProtocolError::InvalidSenderKeyMessage {
                reason: format!("unknown message type {other}"),
            }),
        }
    }

    /// Type tag of this message.
    pub fn message_type(&self) -> u8 {
        match self {
            Self::SenderKey(message) => message.message_type(),
            Self::Distribution(message) => message.message_type(),
        }
    }

    /// Wire bytes.
    pub fn serialize(&self) -> &[u8] {
        match self {
            Self::SenderKey(message) => message.serialize(),
            Self::Distribution(message) => message.serialize(),
        }
    }
}

impl From<SenderKeyMessage> for CiphertextMessage {
    fn from(message: SenderKeyMessage) -> Self {
        Self::SenderKey(message)
    }
}

impl From<SenderKeyDistributionMessage> for CiphertextMessage {
    fn from(message: SenderKeyDistributionMessage) -> Self {
        Self::Distribution(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_byte_packs_both_nibbles() {
        assert_eq!(version_byte(CURRENT_VERSION, CURRENT_VERSION), 0x33);
        assert_eq!(version_byte(0x0F, 0x0F), 0xFF);
        assert_eq!(message_version(0x33), 3);
    }

    #[test]
    fn deserialize_dispatches_on_type() {
        let distribution = SenderKeyDistributionMessage::new(9, 0, &[1; 32], &[2; 32]);

        let decoded =
            CiphertextMessage::deserialize(SENDERKEY_DISTRIBUTION_TYPE, distribution.serialize())
                .unwrap();

        assert_eq!(decoded.message_type(), SENDERKEY_DISTRIBUTION_TYPE);
        assert_eq!(decoded.serialize(), distribution.serialize());
        assert_eq!(decoded, CiphertextMessage::from(distribution));
    }

    #[test]
    fn deserialize_rejects_unknown_type() {
        let result = CiphertextMessage::deserialize(2, &[0x33]);
        assert!(matches!(result, Err(ProtocolError::InvalidSenderKeyMessage { .. })));
    }
}
