//! Group cipher configuration.

/// Default cap on cached skipped message keys per state.
pub const MAX_MESSAGE_KEYS: usize = 2000;

/// Default limit on how far ahead of the chain head a message may be.
pub const MAX_FUTURE_MESSAGES: u32 = 2000;

/// Limits applied by [`GroupCipher`](crate::GroupCipher) and
/// [`GroupSessionBuilder`](crate::GroupSessionBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupConfig {
    /// Skipped message keys kept per state before the oldest are evicted
    pub max_message_keys: usize,
    /// Largest accepted gap between the chain head and a message iteration
    pub max_future_messages: u32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self { max_message_keys: MAX_MESSAGE_KEYS, max_future_messages: MAX_FUTURE_MESSAGES }
    }
}
