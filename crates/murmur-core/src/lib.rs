//! Murmur Group Sessions
//!
//! Sender key ratchet state, the session builder and the group cipher for
//! encrypting messages to a group without per-recipient key exchange.
//!
//! # Architecture
//!
//! ```text
//! GroupSessionBuilder ──create──► SenderKeyDistributionMessage ──process──┐
//!         │                                                              │
//!         ▼                                                              ▼
//!   SenderKeyStore ◄── load / store ──► SenderKeyRecord [SenderKeyState, ...]
//!         ▲
//!         │
//!   GroupCipher ── encrypt / decrypt ──► SenderKeyMessage
//! ```
//!
//! Every load-mutate-store cycle runs as one job on the [`JobQueue`], keyed by
//! the canonical [`SenderKeyIdentity`] string. Jobs for one identity run
//! strictly one after another; different identities run concurrently.
//!
//! # Invariants
//!
//! - A forged, replayed or undecryptable message never changes stored state
//! - Each message key is handed out at most once
//! - Skipped-key caches and forward catch-up are bounded by [`GroupConfig`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
pub mod cipher;
pub mod config;
pub mod error;
pub mod identity;
pub mod keys;
pub mod queue;
pub mod record;
pub mod state;
pub mod store;

pub use builder::GroupSessionBuilder;
pub use cipher::{GroupCipher, resolve_message_key};
pub use config::{GroupConfig, MAX_FUTURE_MESSAGES, MAX_MESSAGE_KEYS};
pub use error::GroupError;
pub use identity::SenderKeyIdentity;
pub use keys::{generate_sender_key, generate_sender_key_id, generate_signing_key};
pub use queue::{DEFAULT_GC_LIMIT, JobQueue, QueueError};
pub use record::SenderKeyRecord;
pub use state::{SenderKeyState, SenderKeyStateBuilder};
pub use store::{MemorySenderKeyStore, SenderKeyStore, StoreError};
