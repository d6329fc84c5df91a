//! Fuzz target for skipped-key catch-up
//!
//! Resolves arbitrary iteration sequences against one receive state.
//!
//! # Strategy
//!
//! - Arbitrary starting iteration (including near u32::MAX)
//! - Arbitrary requested iterations, behind and ahead of the head
//! - Small and default cache caps
//!
//! # Invariants
//!
//! - Resolution never panics
//! - The cache never exceeds its cap
//! - The head only moves forward
//! - A resolved key matches a straight walk of the chain
//! - A resolved iteration never resolves again
//! - A failed resolution leaves the state unchanged

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_core::{resolve_message_key, SenderKeyState};
use murmur_crypto::{ChainKey, RustCryptoProvider};

#[derive(Debug, Clone, Arbitrary)]
struct CatchUpScenario {
    seed: [u8; 32],
    start: u32,
    small_cache: bool,
    /// Offsets from the starting iteration
    requests: Vec<u16>,
}

fuzz_target!(|scenario: CatchUpScenario| {
    let provider = RustCryptoProvider::seeded(0);
    let cap = if scenario.small_cache { 16 } else { 2000 };

    let Ok(mut state) = SenderKeyState::builder()
        .key_id(1)
        .iteration(scenario.start)
        .seed(&scenario.seed)
        .signing_public_key([0; 32])
        .max_message_keys(cap)
        .build()
    else {
        return;
    };

    let mut consumed = HashSet::new();

    for offset in scenario.requests.into_iter().take(32) {
        let Some(iteration) = scenario.start.checked_add(u32::from(offset % 2500)) else {
            continue;
        };
        let head = state.chain_key().iteration();
        let cached = state.message_key_count();

        match resolve_message_key(&mut state, iteration, 2000, &provider) {
            Ok(key) => {
                assert!(consumed.insert(iteration), "iteration resolved twice");
                assert_eq!(key.iteration(), iteration);

                let mut chain = ChainKey::new(scenario.start, &scenario.seed).unwrap();
                while chain.iteration() < iteration {
                    chain = chain.next(&provider).unwrap();
                }
                assert_eq!(key, chain.message_key(&provider).unwrap());
            },
            Err(_) => {
                assert_eq!(state.chain_key().iteration(), head, "failed resolve moved the head");
                assert_eq!(state.message_key_count(), cached, "failed resolve touched the cache");
            },
        }

        assert!(state.chain_key().iteration() >= head, "head moved backwards");
        assert!(state.message_key_count() <= cap, "cache exceeded its cap");
    }
});
