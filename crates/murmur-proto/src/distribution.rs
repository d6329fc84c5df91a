//! Sender key distribution message.
//!
//! Announces a sender chain to the group: key id, current iteration, chain
//! seed and the public key that verifies the sender's messages.
//!
//! Layout on the wire:
//! `[version: 1 byte] + [protobuf payload]`

use bytes::{BufMut, Bytes, BytesMut};
use murmur_crypto::KEY_SIZE;
use prost::Message as _;

use crate::{
    errors::{ProtocolError, Result},
    message::{CURRENT_VERSION, SENDERKEY_DISTRIBUTION_TYPE, message_version, version_byte},
    wire::DistributionPayload,
};

/// Bootstrap message sharing a sender chain with the group.
///
/// # Invariants
///
/// - `chain_key` and `signing_key` are exactly 32 bytes
/// - `serialized` is always the encoding of the other fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderKeyDistributionMessage {
    id: i32,
    iteration: u32,
    chain_key: [u8; KEY_SIZE],
    signing_key: [u8; KEY_SIZE],
    serialized: Bytes,
}

impl SenderKeyDistributionMessage {
    /// Build a message from its fields and encode it.
    pub fn new(
        id: i32,
        iteration: u32,
        chain_key: &[u8; KEY_SIZE],
        signing_key: &[u8; KEY_SIZE],
    ) -> Self {
        let payload = DistributionPayload {
            id: Some(id),
            iteration: Some(iteration),
            chain_key: Some(chain_key.to_vec()),
            signing_key: Some(signing_key.to_vec()),
        };

        let mut buf = BytesMut::with_capacity(1 + payload.encoded_len());
        buf.put_u8(version_byte(CURRENT_VERSION, CURRENT_VERSION));
        buf.extend_from_slice(&payload.encode_to_vec());

        Self {
            id,
            iteration,
            chain_key: *chain_key,
            signing_key: *signing_key,
            serialized: buf.freeze(),
        }
    }

    /// Decode a message from its wire bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidDistributionMessage` if the payload does not
    ///   parse, a field is missing or a key has the wrong length
    /// - `ProtocolError::UnsupportedVersion` if the version is too old
    pub fn deserialize(serialized: &[u8]) -> Result<Self> {
        let Some((&version, payload)) = serialized.split_first() else {
            return Err(invalid("empty message"));
        };

        let version = message_version(version);
        if version < CURRENT_VERSION {
            return Err(ProtocolError::UnsupportedVersion { version });
        }

        let payload = DistributionPayload::decode(payload).map_err(|e| invalid(e.to_string()))?;

        let id = payload.id.ok_or_else(|| invalid("missing id"))?;
        let iteration = payload.iteration.ok_or_else(|| invalid("missing iteration"))?;
        let chain_key = payload.chain_key.ok_or_else(|| invalid("missing chain key"))?;
        let signing_key = payload.signing_key.ok_or_else(|| invalid("missing signing key"))?;

        let chain_key: [u8; KEY_SIZE] = chain_key
            .as_slice()
            .try_into()
            .map_err(|_| invalid(format!("chain key is {} bytes", chain_key.len())))?;
        let signing_key: [u8; KEY_SIZE] = signing_key
            .as_slice()
            .try_into()
            .map_err(|_| invalid(format!("signing key is {} bytes", signing_key.len())))?;

        Ok(Self {
            id,
            iteration,
            chain_key,
            signing_key,
            serialized: Bytes::copy_from_slice(serialized),
        })
    }

    /// Sender key id.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Chain iteration the seed belongs to.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Chain seed at [`iteration()`](Self::iteration).
    pub fn chain_key(&self) -> &[u8; KEY_SIZE] {
        &self.chain_key
    }

    /// Public key that verifies the sender's messages.
    pub fn signing_key(&self) -> &[u8; KEY_SIZE] {
        &self.signing_key
    }

    /// Wire bytes.
    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }

    /// Ciphertext message type tag.
    pub fn message_type(&self) -> u8 {
        SENDERKEY_DISTRIBUTION_TYPE
    }
}

fn invalid(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidDistributionMessage { reason: reason.into() }
}
