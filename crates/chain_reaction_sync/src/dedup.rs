//! # Event Deduplicator
//!
//! Pollers may hand the same event over more than once (overlapping pages,
//! a retried cycle). A `Deduplicator` admits each `(tx_id, event_index)`
//! once per session. Sessions never evict; a reset starts a new one.

use std::collections::HashSet;

use chain_reaction_core::EventIdentity;

/// Set of identities seen in the current session.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<EventIdentity>,
    session: u64,
}

impl Deduplicator {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `identity` is offered in this session.
    pub fn admit(&mut self, identity: EventIdentity) -> bool {
        self.seen.insert(identity)
    }

    /// Forgets every identity and starts a new session.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.session += 1;
    }

    /// Identities admitted in this session.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing has been admitted in this session.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Number of resets so far.
    #[inline]
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }
}
