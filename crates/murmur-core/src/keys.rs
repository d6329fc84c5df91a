//! Fresh sender key material.

use murmur_crypto::{CryptoProvider, KEY_SIZE, KeyPair};
use zeroize::Zeroizing;

/// Upper bound (exclusive) of generated key ids: keys are 31-bit positive.
pub const MAX_SENDER_KEY_ID: u32 = i32::MAX as u32;

/// Random 32-byte chain seed.
pub fn generate_sender_key(provider: &impl CryptoProvider) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut seed = Zeroizing::new([0u8; KEY_SIZE]);
    provider.random_bytes(&mut seed[..]);
    seed
}

/// Random key id in `[0, 2^31 - 1)`.
pub fn generate_sender_key_id(provider: &impl CryptoProvider) -> i32 {
    // Always below i32::MAX, so the conversion cannot fail
    i32::try_from(provider.random_int(MAX_SENDER_KEY_ID)).unwrap_or(0)
}

/// Fresh signing key pair.
pub fn generate_signing_key(provider: &impl CryptoProvider) -> KeyPair {
    provider.generate_key_pair()
}
