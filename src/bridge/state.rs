//! Per-pair forwarding state.

use std::fmt;

use serde::Serialize;

use crate::transport::MessageId;

/// Position of a pair forwarder in its state machine.
///
/// ```text
/// Disconnected → Connecting → Idle ⇄ Forwarding
///                    │          │        │
///                    └──────────┴────────┴──→ ErrorBackoff → Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwarderState {
    Disconnected,
    Connecting,
    Idle,
    Forwarding,
    ErrorBackoff,
}

impl fmt::Display for ForwarderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForwarderState::Disconnected => "disconnected",
            ForwarderState::Connecting => "connecting",
            ForwarderState::Idle => "idle",
            ForwarderState::Forwarding => "forwarding",
            ForwarderState::ErrorBackoff => "error-backoff",
        };
        f.write_str(name)
    }
}

/// Identifier of the last message committed outbound by this pair.
///
/// In memory only: a restarted process starts empty, so a crash between
/// the outbound and inbound commits leads to one redelivery after restart.
#[derive(Debug, Clone, Default)]
pub struct DedupState {
    last_forwarded: Option<MessageId>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `id` is the message this pair already committed outbound.
    /// An empty identifier never matches.
    pub fn is_duplicate(&self, id: &MessageId) -> bool {
        !id.is_empty() && self.last_forwarded.as_ref() == Some(id)
    }

    /// Record a message as committed outbound. An empty identifier clears
    /// the state, since it cannot recognize a redelivery.
    pub fn remember(&mut self, id: MessageId) {
        self.last_forwarded = (!id.is_empty()).then_some(id);
    }

    pub fn last_forwarded(&self) -> Option<&MessageId> {
        self.last_forwarded.as_ref()
    }
}

/// Counters kept by one pair forwarder over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PairStats {
    pub forwarded: u64,
    pub duplicates_skipped: u64,
    pub empty_polls: u64,
    pub failures: u64,
    pub connects: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dedup_matches_nothing() {
        let dedup = DedupState::new();
        assert!(!dedup.is_duplicate(&MessageId::default()));
        assert!(!dedup.is_duplicate(&MessageId::new(b"x".to_vec())));
    }

    #[test]
    fn test_dedup_compares_bytes() {
        let mut dedup = DedupState::new();
        dedup.remember(MessageId::new(vec![1, 2, 3]));

        assert!(dedup.is_duplicate(&MessageId::new(vec![1, 2, 3])));
        assert!(!dedup.is_duplicate(&MessageId::new(vec![1, 2])));
        assert!(!dedup.is_duplicate(&MessageId::new(vec![1, 2, 3, 0])));

        dedup.remember(MessageId::new(vec![9]));
        assert!(!dedup.is_duplicate(&MessageId::new(vec![1, 2, 3])));
        assert_eq!(dedup.last_forwarded(), Some(&MessageId::new(vec![9])));
    }

    #[test]
    fn test_empty_identifier_never_deduplicated() {
        let mut dedup = DedupState::new();
        dedup.remember(MessageId::new(vec![7]));
        dedup.remember(MessageId::default());

        assert_eq!(dedup.last_forwarded(), None);
        assert!(!dedup.is_duplicate(&MessageId::default()));
        assert!(!dedup.is_duplicate(&MessageId::new(vec![7])));
    }
}
