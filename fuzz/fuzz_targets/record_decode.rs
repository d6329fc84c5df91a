//! Fuzz target for stored sender key records
//!
//! Stored records are CBOR and may be corrupted on disk or by another
//! process.
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - A decoded record has distinct key ids and caches within their caps
//! - A decoded record re-encodes and decodes to the same states

#![no_main]

use std::collections::HashSet;

use libfuzzer_sys::fuzz_target;
use murmur_core::SenderKeyRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(record) = SenderKeyRecord::deserialize(data) else {
        return;
    };

    let mut key_ids = HashSet::new();
    for state in record.states() {
        assert!(key_ids.insert(state.key_id()), "duplicate key id survived decoding");
        assert!(state.message_key_count() <= state.max_message_keys());
    }

    let encoded = record.serialize().unwrap();
    let decoded = SenderKeyRecord::deserialize(&encoded).unwrap();
    assert_eq!(decoded.len(), record.len());
    for (a, b) in decoded.states().iter().zip(record.states()) {
        assert_eq!(a.key_id(), b.key_id());
        assert_eq!(a.chain_key(), b.chain_key());
        assert_eq!(a.message_key_count(), b.message_key_count());
    }
});
