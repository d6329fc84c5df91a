//! Murmur wire formats
//!
//! Both sender key messages share the same framing: one version byte whose
//! nibbles both carry [`CURRENT_VERSION`], followed by a protobuf payload.
//!
//! ```text
//! Distribution: [version] [protobuf{id, iteration, chainKey, signingKey}]
//! SenderKey:    [version] [protobuf{id, iteration, ciphertext}] [signature: 64]
//! ```
//!
//! Messages are immutable values with two constructors each: `new` from
//! fields (encodes eagerly) and `deserialize` from bytes (decodes eagerly and
//! fails fast on malformed input).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod distribution;
pub mod errors;
pub mod message;
pub mod sender_key_message;
mod wire;

pub use distribution::SenderKeyDistributionMessage;
pub use errors::{ProtocolError, Result};
pub use message::{
    CURRENT_VERSION, CiphertextMessage, SENDERKEY_DISTRIBUTION_TYPE, SENDERKEY_TYPE,
    message_version, version_byte,
};
pub use sender_key_message::SenderKeyMessage;
