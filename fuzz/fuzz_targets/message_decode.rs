//! Fuzz target for sender key wire decoding
//!
//! Feeds arbitrary bytes to both message decoders under every type tag.
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - Anything that decodes re-serializes to the exact input bytes
//! - A decoded sender key message never verifies under an unrelated key

#![no_main]

use libfuzzer_sys::fuzz_target;
use murmur_crypto::{CryptoProvider, RustCryptoProvider};
use murmur_proto::{
    CiphertextMessage, SenderKeyDistributionMessage, SenderKeyMessage, SENDERKEY_DISTRIBUTION_TYPE,
    SENDERKEY_TYPE,
};

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = SenderKeyMessage::deserialize(data) {
        assert_eq!(message.serialize(), data, "decoded bytes must be preserved");

        let provider = RustCryptoProvider::seeded(0);
        let stranger = provider.generate_key_pair();
        assert!(
            message.verify_signature(&stranger.public, &provider).is_err(),
            "random bytes must not verify"
        );
    }

    if let Ok(message) = SenderKeyDistributionMessage::deserialize(data) {
        assert_eq!(message.serialize(), data, "decoded bytes must be preserved");
    }

    for message_type in [SENDERKEY_TYPE, SENDERKEY_DISTRIBUTION_TYPE, 0, u8::MAX] {
        if let Ok(message) = CiphertextMessage::deserialize(message_type, data) {
            assert_eq!(message.message_type(), message_type);
        }
    }
});
