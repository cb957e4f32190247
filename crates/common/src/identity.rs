//! Local participant identifier allocation.
//!
//! Identifiers are fixed-length digit strings drawn uniformly at random and
//! read as integers (leading zeros shorten the value, as with any integer
//! parse). Collision resistance is probabilistic; on top of that the
//! allocator never hands out `0` (the engine-assigns sentinel) or any id
//! still in its recent history.

use crate::error::CommonError;
use crate::types::ParticipantId;
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Default identifier length in digits.
pub const DEFAULT_ID_DIGITS: u32 = 10;

/// Longest digit string that still fits in a `u64`.
pub const MAX_ID_DIGITS: u32 = 19;

/// Number of recently issued or observed ids that will not be reissued.
const DEFAULT_HISTORY: usize = 1024;

/// Allocator for locally generated participant ids.
#[derive(Debug)]
pub struct IdentityAllocator {
    digits: u32,
    history_limit: usize,
    recent: VecDeque<ParticipantId>,
    recent_set: HashSet<ParticipantId>,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::build(DEFAULT_ID_DIGITS)
    }
}

impl IdentityAllocator {
    /// Create an allocator producing `digits`-digit ids.
    ///
    /// # Errors
    ///
    /// Returns `CommonError::InvalidValue` unless `1 <= digits <= 19`.
    pub fn with_digits(digits: u32) -> Result<Self, CommonError> {
        if !(1..=MAX_ID_DIGITS).contains(&digits) {
            return Err(CommonError::InvalidValue(format!(
                "participant id length must be between 1 and {MAX_ID_DIGITS} digits, got {digits}"
            )));
        }
        Ok(Self::build(digits))
    }

    fn build(digits: u32) -> Self {
        // Keep at least half of the id space available so allocation terminates.
        let space = 10u64.saturating_pow(digits);
        let half_space = usize::try_from(space / 2).unwrap_or(usize::MAX);
        Self {
            digits,
            history_limit: DEFAULT_HISTORY.min(half_space),
            recent: VecDeque::new(),
            recent_set: HashSet::new(),
        }
    }

    /// Configured id length.
    #[must_use]
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Allocate a fresh id using the thread-local RNG.
    pub fn allocate(&mut self) -> ParticipantId {
        self.allocate_with(&mut rand::thread_rng())
    }

    /// Allocate a fresh id from the given RNG.
    pub fn allocate_with<R: Rng>(&mut self, rng: &mut R) -> ParticipantId {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let candidate = ParticipantId(self.draw(rng));
            if candidate.is_unassigned() || self.recent_set.contains(&candidate) {
                continue;
            }

            debug!(
                target: "common.identity",
                digits = self.digits,
                attempts,
                "Allocated local participant id"
            );
            self.mark_seen(candidate);
            return candidate;
        }
    }

    /// Record an id seen elsewhere (e.g. reported by the engine) so it is
    /// not allocated locally while it stays in the history.
    pub fn mark_seen(&mut self, id: ParticipantId) {
        if self.history_limit == 0 || !self.recent_set.insert(id) {
            return;
        }
        self.recent.push_back(id);
        while self.recent.len() > self.history_limit {
            if let Some(evicted) = self.recent.pop_front() {
                self.recent_set.remove(&evicted);
            }
        }
    }

    /// Whether `id` is in the recent history.
    #[must_use]
    pub fn was_seen(&self, id: ParticipantId) -> bool {
        self.recent_set.contains(&id)
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> u64 {
        (0..self.digits).fold(0u64, |acc, _| acc * 10 + rng.gen_range(0..10u64))
    }
}
