//! Sender chain key: one step of the forward-secure ratchet
//!
//! # Security Properties
//!
//! - Forward Secrecy: the next seed is a one-way function of the current one
//! - Key Uniqueness: each iteration yields distinct message key material
//! - Determinism: the same seed always produces the same chain

use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    message_key::MessageKey,
    provider::{CryptoProvider, KEY_SIZE},
};

/// Domain separation constant for message key material.
const MESSAGE_KEY_SEED: &[u8] = &[0x01];

/// Domain separation constant for the next chain key.
const CHAIN_KEY_SEED: &[u8] = &[0x02];

/// Immutable chain key at a given iteration.
///
/// [`next()`](Self::next) returns a new value; the current one is never
/// modified. The seed is zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainKey {
    iteration: u32,
    seed: Zeroizing<[u8; KEY_SIZE]>,
}

impl ChainKey {
    /// Chain key from an iteration and a 32-byte seed.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial` if `seed` is not exactly 32 bytes
    pub fn new(iteration: u32, seed: &[u8]) -> Result<Self, CryptoError> {
        let seed: [u8; KEY_SIZE] = seed.try_into().map_err(|_| {
            CryptoError::InvalidKeyMaterial { expected: KEY_SIZE, actual: seed.len() }
        })?;
        Ok(Self { iteration, seed: Zeroizing::new(seed) })
    }

    /// Position of this key in the chain.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Raw 32-byte seed.
    pub fn seed(&self) -> &[u8; KEY_SIZE] {
        &self.seed
    }

    /// Chain key one step further along.
    ///
    /// # Errors
    ///
    /// - `IterationOverflow` if the chain is already at `u32::MAX`
    pub fn next(&self, provider: &impl CryptoProvider) -> Result<Self, CryptoError> {
        let iteration = self
            .iteration
            .checked_add(1)
            .ok_or(CryptoError::IterationOverflow { current: self.iteration })?;
        let seed = provider.mac(self.seed.as_slice(), CHAIN_KEY_SEED);

        Ok(Self { iteration, seed: Zeroizing::new(seed) })
    }

    /// Message key material for this iteration, before expansion.
    pub fn message_key_material(
        &self,
        provider: &impl CryptoProvider,
    ) -> Zeroizing<[u8; KEY_SIZE]> {
        Zeroizing::new(provider.mac(self.seed.as_slice(), MESSAGE_KEY_SEED))
    }

    /// Expanded message key for this iteration.
    pub fn message_key(&self, provider: &impl CryptoProvider) -> Result<MessageKey, CryptoError> {
        let material = self.message_key_material(provider);
        MessageKey::derive(self.iteration, material.as_slice(), provider)
    }
}

impl std::fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainKey").field("iteration", &self.iteration).finish_non_exhaustive()
    }
}
