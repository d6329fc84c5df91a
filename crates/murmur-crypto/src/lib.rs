//! Murmur Cryptographic Primitives
//!
//! Building blocks for sender key group messaging. Derivations are pure
//! functions of their inputs; every primitive call goes through a
//! [`CryptoProvider`] so callers control randomness in tests.
//!
//! # Key Lifecycle
//!
//! A sender generates one random 32-byte chain seed per sender key and shares
//! it with the group in a distribution message. Each chain step derives the
//! material for exactly one message, and the chain only moves forward.
//!
//! ```text
//! Chain Seed (iteration n)
//!        │
//!        ├─ HMAC(seed, 0x01) → Message Key Material
//!        │                          │
//!        │                          ▼
//!        │                   HKDF → IV ‖ Cipher Key
//!        │
//!        ▼ HMAC(seed, 0x02)
//! Chain Seed (iteration n+1)
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - The next chain seed is a one-way function of the current one
//! - Once a holder advances past an iteration, its key cannot be recomputed
//!
//! Authenticity:
//! - AES-256-GCM rejects tampered payloads
//! - Ed25519 signatures bind the whole wire message to the sender

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chain_key;
pub mod error;
pub mod message_key;
pub mod provider;

pub use chain_key::ChainKey;
pub use error::CryptoError;
pub use message_key::MessageKey;
pub use provider::{
    CryptoProvider, IV_SIZE, KEY_SIZE, KeyPair, RustCryptoProvider, SIGNATURE_SIZE,
};
