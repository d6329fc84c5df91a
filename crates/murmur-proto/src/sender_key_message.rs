//! Signed, encrypted group message.
//!
//! Layout on the wire:
//! `[version: 1 byte] + [protobuf payload] + [signature: 64 bytes]`
//!
//! The signature covers `version || payload` and is checked with the
//! sender's public key from the matching sender key state.

use bytes::{BufMut, Bytes, BytesMut};
use murmur_crypto::{CryptoProvider, KEY_SIZE, SIGNATURE_SIZE};
use prost::Message as _;

use crate::{
    errors::{ProtocolError, Result},
    message::{CURRENT_VERSION, SENDERKEY_TYPE, message_version, version_byte},
    wire::SenderKeyPayload,
};

/// One encrypted payload from a sender chain.
///
/// # Security
///
/// Decoding only checks structure. [`key_id`](Self::key_id),
/// [`iteration`](Self::iteration) and [`ciphertext`](Self::ciphertext) are
/// attacker-controlled until [`verify_signature`](Self::verify_signature)
/// succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderKeyMessage {
    message_version: u8,
    key_id: i32,
    iteration: u32,
    ciphertext: Bytes,
    signature: [u8; SIGNATURE_SIZE],
    serialized: Bytes,
}

impl SenderKeyMessage {
    /// Build, sign and encode a message.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Crypto` if the provider cannot sign
    pub fn new(
        key_id: i32,
        iteration: u32,
        ciphertext: &[u8],
        signing_key: &[u8; KEY_SIZE],
        provider: &impl CryptoProvider,
    ) -> Result<Self> {
        let payload = SenderKeyPayload {
            id: Some(key_id),
            iteration: Some(iteration),
            ciphertext: Some(ciphertext.to_vec()),
        };

        let mut buf = BytesMut::with_capacity(1 + payload.encoded_len() + SIGNATURE_SIZE);
        buf.put_u8(version_byte(CURRENT_VERSION, CURRENT_VERSION));
        buf.extend_from_slice(&payload.encode_to_vec());

        let signature = provider.sign(signing_key, &buf)?;
        buf.extend_from_slice(&signature);

        Ok(Self {
            message_version: CURRENT_VERSION,
            key_id,
            iteration,
            ciphertext: Bytes::copy_from_slice(ciphertext),
            signature,
            serialized: buf.freeze(),
        })
    }

    /// Decode a message from its wire bytes. Does not verify the signature.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidSenderKeyMessage` if the input is shorter than
    ///   a version byte plus signature, or the payload does not parse
    /// - `ProtocolError::UnsupportedVersion` if the version is too old
    pub fn deserialize(serialized: &[u8]) -> Result<Self> {
        if serialized.len() < 1 + SIGNATURE_SIZE {
            return Err(invalid(format!("{} bytes is too short", serialized.len())));
        }

        let message_version = message_version(serialized[0]);
        if message_version < CURRENT_VERSION {
            return Err(ProtocolError::UnsupportedVersion { version: message_version });
        }

        let (signed, signature) = serialized.split_at(serialized.len() - SIGNATURE_SIZE);
        let payload = SenderKeyPayload::decode(&signed[1..]).map_err(|e| invalid(e.to_string()))?;

        let key_id = payload.id.ok_or_else(|| invalid("missing id"))?;
        let iteration = payload.iteration.ok_or_else(|| invalid("missing iteration"))?;
        let ciphertext = payload.ciphertext.ok_or_else(|| invalid("missing ciphertext"))?;

        let mut sig = [0u8; SIGNATURE_SIZE];
        sig.copy_from_slice(signature);

        Ok(Self {
            message_version,
            key_id,
            iteration,
            ciphertext: Bytes::from(ciphertext),
            signature: sig,
            serialized: Bytes::copy_from_slice(serialized),
        })
    }

    /// Check the signature over `version || payload`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidSignature` if it does not verify
    pub fn verify_signature(
        &self,
        public_key: &[u8; KEY_SIZE],
        provider: &impl CryptoProvider,
    ) -> Result<()> {
        let signed = &self.serialized[..self.serialized.len() - SIGNATURE_SIZE];
        if provider.verify(public_key, signed, &self.signature) {
            Ok(())
        } else {
            Err(ProtocolError::InvalidSignature { key_id: self.key_id })
        }
    }

    /// Version from the high nibble of the version byte.
    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    /// Sender key id the message was encrypted under.
    pub fn key_id(&self) -> i32 {
        self.key_id
    }

    /// Chain iteration of the message key.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Encrypted payload.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Detached signature.
    pub fn signature(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.signature
    }

    /// Wire bytes.
    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }

    /// Ciphertext message type tag.
    pub fn message_type(&self) -> u8 {
        SENDERKEY_TYPE
    }
}

fn invalid(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidSenderKeyMessage { reason: reason.into() }
}
