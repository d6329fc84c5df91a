//! Cryptographic primitives behind a provider trait.
//!
//! The ratchet, the wire formats and the group cipher never call a primitive
//! directly. They go through [`CryptoProvider`], so tests can swap in a
//! seeded random source and callers can bring their own implementation.

use std::sync::{Arc, Mutex, PoisonError};

use aes_gcm::{
    AesGcm, Nonce,
    aead::{Aead, KeyInit, consts::U16},
    aes::Aes256,
};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng, rngs::OsRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// AES-256-GCM with the 16-byte IV carried by a message key.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Length of a symmetric key, chain seed or public/private signing key.
pub const KEY_SIZE: usize = 32;

/// Length of a payload cipher IV.
pub const IV_SIZE: usize = 16;

/// Length of a detached signature.
pub const SIGNATURE_SIZE: usize = 64;

/// A signing key pair.
///
/// The private half is zeroized when the pair is dropped.
#[derive(Clone)]
pub struct KeyPair {
    /// Public verification key
    pub public: [u8; KEY_SIZE],
    /// Private signing key
    pub private: Zeroizing<[u8; KEY_SIZE]>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// Primitive operations consumed by the sender key protocol.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `mac`, `sign` and `verify` are constant-time in their secret inputs
/// - `random_bytes` and `random_int` use cryptographically secure entropy in
///   production
/// - `decrypt` authenticates before releasing any plaintext
pub trait CryptoProvider: Clone + Send + Sync + 'static {
    /// HMAC-SHA256 of `data` under `key`.
    fn mac(&self, key: &[u8], data: &[u8]) -> [u8; KEY_SIZE];

    /// Expand `seed` into two 32-byte blocks.
    fn expand_secrets(
        &self,
        seed: &[u8],
        salt: &[u8; KEY_SIZE],
        info: &[u8],
    ) -> Result<[[u8; KEY_SIZE]; 2], CryptoError>;

    /// Encrypt `plaintext` under `key` and `iv`.
    fn encrypt(
        &self,
        key: &[u8; KEY_SIZE],
        plaintext: &[u8],
        iv: &[u8; IV_SIZE],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt and authenticate `ciphertext` under `key` and `iv`.
    fn decrypt(
        &self,
        key: &[u8; KEY_SIZE],
        ciphertext: &[u8],
        iv: &[u8; IV_SIZE],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Detached signature over `message`.
    fn sign(
        &self,
        private_key: &[u8; KEY_SIZE],
        message: &[u8],
    ) -> Result<[u8; SIGNATURE_SIZE], CryptoError>;

    /// Check a detached signature. Malformed keys verify as `false`.
    fn verify(
        &self,
        public_key: &[u8; KEY_SIZE],
        message: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> bool;

    /// Fresh signing key pair.
    fn generate_key_pair(&self) -> KeyPair;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Uniform random integer in `[0, max)`. Returns 0 when `max` is 0.
    fn random_int(&self, max: u32) -> u32;
}

/// [`CryptoProvider`] backed by the RustCrypto crates.
///
/// HMAC-SHA256 for the ratchet, HKDF-SHA256 for message keys, AES-256-GCM
/// for payloads and Ed25519 for signatures. Randomness comes from the OS
/// unless the provider was built with [`RustCryptoProvider::seeded`].
///
/// # Interoperability
///
/// Payloads are AES-256-GCM under the message key's 16-byte IV, not the
/// AES-256-CBC with PKCS#7 padding used by libsignal group sessions, and
/// signatures are Ed25519 rather than XEd25519 over Curve25519 keys. Ciphertexts and
/// signatures produced here cannot be read by libsignal peers, nor the
/// reverse. Key derivation and both wire formats are unchanged, so a
/// provider implementing those two primitives restores compatibility.
#[derive(Clone, Default)]
pub struct RustCryptoProvider {
    /// Deterministic RNG shared between clones. `None` means `OsRng`.
    seeded: Option<Arc<Mutex<ChaCha20Rng>>>,
}

impl RustCryptoProvider {
    /// Provider drawing randomness from the operating system.
    pub fn new() -> Self {
        Self { seeded: None }
    }

    /// Provider with a deterministic ChaCha20 random source.
    ///
    /// Only for tests and simulations: the same seed produces the same keys.
    pub fn seeded(seed: u64) -> Self {
        Self { seeded: Some(Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed)))) }
    }

    fn cipher(key: &[u8; KEY_SIZE]) -> Result<Aes256Gcm16, CryptoError> {
        Aes256Gcm16::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyMaterial {
            expected: KEY_SIZE,
            actual: key.len(),
        })
    }
}

impl std::fmt::Debug for RustCryptoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustCryptoProvider").field("seeded", &self.seeded.is_some()).finish()
    }
}

impl CryptoProvider for RustCryptoProvider {
    fn mac(&self, key: &[u8], data: &[u8]) -> [u8; KEY_SIZE] {
        let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(key) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(data);
        let result = mac.finalize().into_bytes();

        let mut tag = [0u8; KEY_SIZE];
        tag.copy_from_slice(&result);
        tag
    }

    fn expand_secrets(
        &self,
        seed: &[u8],
        salt: &[u8; KEY_SIZE],
        info: &[u8],
    ) -> Result<[[u8; KEY_SIZE]; 2], CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), seed);

        let mut okm = Zeroizing::new([0u8; 2 * KEY_SIZE]);
        hkdf.expand(info, &mut okm[..])
            .map_err(|e| CryptoError::KeyDerivation { reason: e.to_string() })?;

        let mut blocks = [[0u8; KEY_SIZE]; 2];
        blocks[0].copy_from_slice(&okm[..KEY_SIZE]);
        blocks[1].copy_from_slice(&okm[KEY_SIZE..]);
        Ok(blocks)
    }

    fn encrypt(
        &self,
        key: &[u8; KEY_SIZE],
        plaintext: &[u8],
        iv: &[u8; IV_SIZE],
    ) -> Result<Vec<u8>, CryptoError> {
        Self::cipher(key)?
            .encrypt(Nonce::<U16>::from_slice(iv), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed { reason: "plaintext too long".to_string() })
    }

    fn decrypt(
        &self,
        key: &[u8; KEY_SIZE],
        ciphertext: &[u8],
        iv: &[u8; IV_SIZE],
    ) -> Result<Vec<u8>, CryptoError> {
        Self::cipher(key)?
            .decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed {
                reason: "authentication failed".to_string(),
            })
    }

    fn sign(
        &self,
        private_key: &[u8; KEY_SIZE],
        message: &[u8],
    ) -> Result<[u8; SIGNATURE_SIZE], CryptoError> {
        let signing_key = SigningKey::from_bytes(private_key);
        Ok(signing_key.sign(message).to_bytes())
    }

    fn verify(
        &self,
        public_key: &[u8; KEY_SIZE],
        message: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let signature = Signature::from_bytes(signature);
        verifying_key.verify_strict(message, &signature).is_ok()
    }

    fn generate_key_pair(&self) -> KeyPair {
        let mut secret = Zeroizing::new([0u8; KEY_SIZE]);
        self.random_bytes(&mut secret[..]);

        let signing_key = SigningKey::from_bytes(&secret);
        KeyPair { public: signing_key.verifying_key().to_bytes(), private: secret }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        match &self.seeded {
            Some(rng) => rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer),
            None => OsRng.fill_bytes(buffer),
        }
    }

    fn random_int(&self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        match &self.seeded {
            Some(rng) => rng.lock().unwrap_or_else(PoisonError::into_inner).gen_range(0..max),
            None => OsRng.gen_range(0..max),
        }
    }
}
