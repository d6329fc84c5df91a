//! Message keys expanded from chain key material

use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    provider::{CryptoProvider, IV_SIZE, KEY_SIZE},
};

/// Info string for message key expansion.
const MESSAGE_KEY_INFO: &[u8] = b"WhisperGroup";

/// Salt for message key expansion.
const MESSAGE_KEY_SALT: [u8; KEY_SIZE] = [0u8; KEY_SIZE];

/// A one-time key for a single message.
///
/// Holds the IV and cipher key for the payload cipher, plus the seed it was
/// expanded from. All key material is zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageKey {
    iteration: u32,
    iv: [u8; IV_SIZE],
    cipher_key: Zeroizing<[u8; KEY_SIZE]>,
    seed: Zeroizing<[u8; KEY_SIZE]>,
}

impl MessageKey {
    /// Expand message key material into an IV and cipher key.
    ///
    /// The two 32-byte expansion blocks are split as:
    /// - IV: `block0[0..16]`
    /// - cipher key: `block0[16..32] || block1[0..16]`
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial` if `seed` is not exactly 32 bytes
    pub fn derive(
        iteration: u32,
        seed: &[u8],
        provider: &impl CryptoProvider,
    ) -> Result<Self, CryptoError> {
        let seed: [u8; KEY_SIZE] = seed.try_into().map_err(|_| {
            CryptoError::InvalidKeyMaterial { expected: KEY_SIZE, actual: seed.len() }
        })?;
        let seed = Zeroizing::new(seed);

        let blocks = Zeroizing::new(provider.expand_secrets(
            seed.as_slice(),
            &MESSAGE_KEY_SALT,
            MESSAGE_KEY_INFO,
        )?);

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&blocks[0][..IV_SIZE]);

        let mut cipher_key = Zeroizing::new([0u8; KEY_SIZE]);
        cipher_key[..16].copy_from_slice(&blocks[0][16..]);
        cipher_key[16..].copy_from_slice(&blocks[1][..16]);

        Ok(Self { iteration, iv, cipher_key, seed })
    }

    /// Rebuild a message key from previously derived parts.
    ///
    /// Used when loading cached keys from storage, where re-running the
    /// expansion would need a provider.
    pub fn from_parts(
        iteration: u32,
        iv: [u8; IV_SIZE],
        cipher_key: [u8; KEY_SIZE],
        seed: [u8; KEY_SIZE],
    ) -> Self {
        Self { iteration, iv, cipher_key: Zeroizing::new(cipher_key), seed: Zeroizing::new(seed) }
    }

    /// Chain iteration this key belongs to.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// 16-byte IV for the payload cipher.
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// 32-byte payload cipher key.
    pub fn cipher_key(&self) -> &[u8; KEY_SIZE] {
        &self.cipher_key
    }

    /// Material this key was expanded from.
    pub fn seed(&self) -> &[u8; KEY_SIZE] {
        &self.seed
    }
}

impl std::fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageKey").field("iteration", &self.iteration).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RustCryptoProvider;

    #[test]
    fn derive_splits_expansion_blocks() {
        let provider = RustCryptoProvider::new();
        let seed = [0x42u8; 32];

        let key = MessageKey::derive(3, &seed, &provider).unwrap();
        let blocks = provider.expand_secrets(&seed, &[0u8; 32], b"WhisperGroup").unwrap();

        assert_eq!(key.iv(), &blocks[0][..16]);
        assert_eq!(&key.cipher_key()[..16], &blocks[0][16..]);
        assert_eq!(&key.cipher_key()[16..], &blocks[1][..16]);
        assert_eq!(key.seed(), &seed);
        assert_eq!(key.iteration(), 3);
    }

    #[test]
    fn derive_is_deterministic() {
        let provider = RustCryptoProvider::new();
        let a = MessageKey::derive(0, &[1u8; 32], &provider).unwrap();
        let b = MessageKey::derive(0, &[1u8; 32], &provider).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derive_rejects_wrong_length() {
        let provider = RustCryptoProvider::new();
        assert_eq!(
            MessageKey::derive(0, &[1u8; 16], &provider),
            Err(CryptoError::InvalidKeyMaterial { expected: 32, actual: 16 })
        );
    }

    #[test]
    fn from_parts_matches_derived() {
        let provider = RustCryptoProvider::new();
        let derived = MessageKey::derive(9, &[5u8; 32], &provider).unwrap();

        let rebuilt =
            MessageKey::from_parts(9, *derived.iv(), *derived.cipher_key(), *derived.seed());

        assert_eq!(derived, rebuilt);
    }

    #[test]
    fn debug_hides_key_material() {
        let provider = RustCryptoProvider::new();
        let key = MessageKey::derive(0, &[0xAAu8; 32], &provider).unwrap();
        let rendered = format!("{key:?}");

        assert!(rendered.contains("iteration"));
        assert!(!rendered.contains("170"));
    }
}
