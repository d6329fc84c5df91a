//! Property-based tests for the group cipher
//!
//! These tests verify:
//!
//! 1. **Round-trip**: decrypt(encrypt(m)) == m for all plaintexts
//! 2. **Delivery order independence**: any permutation of a batch decrypts
//! 3. **Single use**: every message key is consumed exactly once

use murmur_core::{
    GroupCipher, GroupError, GroupSessionBuilder, JobQueue, MemorySenderKeyStore,
    SenderKeyIdentity,
};
use murmur_crypto::RustCryptoProvider;
use proptest::prelude::*;

type Cipher = GroupCipher<MemorySenderKeyStore, RustCryptoProvider>;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(future)
}

/// Sender and receiver ciphers linked by a distribution message.
async fn linked_pair(seed: u64) -> (Cipher, Cipher) {
    let provider = RustCryptoProvider::seeded(seed);
    let queue = JobQueue::new();
    let identity = SenderKeyIdentity::new("group", "sender", 7);
    let sender_store = MemorySenderKeyStore::new();
    let receiver_store = MemorySenderKeyStore::new();

    let distribution = GroupSessionBuilder::new(sender_store.clone(), provider.clone(), queue.clone())
        .create(&identity)
        .await
        .unwrap();
    GroupSessionBuilder::new(receiver_store.clone(), provider.clone(), queue.clone())
        .process(&identity, &distribution)
        .await
        .unwrap();

    (
        GroupCipher::new(sender_store, provider.clone(), queue.clone(), identity.clone()),
        GroupCipher::new(receiver_store, provider, queue, identity),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_roundtrip(
        plaintexts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 1..8),
        seed in any::<u64>(),
    ) {
        block_on(async {
            let (sender, receiver) = linked_pair(seed).await;

            for plaintext in &plaintexts {
                let message = sender.encrypt(plaintext).await.unwrap();
                let decrypted = receiver.decrypt(&message).await.unwrap();
                assert_eq!(&decrypted, plaintext);
            }
        });
    }

    #[test]
    fn prop_any_delivery_order_decrypts_once(
        order in (1usize..24).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle()),
        seed in any::<u64>(),
    ) {
        block_on(async {
            let (sender, receiver) = linked_pair(seed).await;

            let mut messages = Vec::with_capacity(order.len());
            for i in 0..order.len() {
                messages.push(sender.encrypt(&(i as u32).to_be_bytes()).await.unwrap());
            }

            for &i in &order {
                let plaintext = receiver.decrypt(&messages[i]).await.unwrap();
                assert_eq!(plaintext, (i as u32).to_be_bytes());
            }

            // Every key has been consumed
            for message in &messages {
                let replay = receiver.decrypt(message).await;
                assert!(matches!(replay, Err(GroupError::OldCounter { .. })));
            }
        });
    }
}
