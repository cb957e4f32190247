//! Remote participant roster.
//!
//! Join order is preserved and every id appears at most once. Membership
//! operations are idempotent: adding a present id or removing an absent one
//! does nothing and reports `false`.

use common::types::ParticipantId;
use std::collections::HashSet;

/// Ordered, deduplicated set of connected remote participants.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    order: Vec<ParticipantId>,
    members: HashSet<ParticipantId>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless already present. Returns whether it was added.
    pub fn add(&mut self, id: ParticipantId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Remove `id` if present. Returns whether it was removed.
    pub fn remove(&mut self, id: ParticipantId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        self.order.retain(|member| *member != id);
        true
    }

    /// Remove everyone. Returns whether the roster was non-empty.
    pub fn clear(&mut self) -> bool {
        let had_members = !self.order.is_empty();
        self.order.clear();
        self.members.clear();
        had_members
    }

    /// Current membership in join order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ParticipantId> {
        self.order.clone()
    }

    #[must_use]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.members.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
