//! Interfaces to the services the session consumes but does not implement:
//! the set-combinatorics oracle and the countdown/score display.
//!
//! Human input has no trait of its own; external input devices funnel slot
//! selections into [`crate::session::GameSession::key_pressed`], the same
//! entry point the autonomous generation threads use.

use std::time::Duration;

/// Card-combinatorics oracle.
///
/// Pure queries over card ids; implementations must be safe to call from
/// the dealer thread while players mutate their own state.
pub trait SetOracle: Send + Sync {
    /// Whether `cards` (exactly one claim queue's worth) form a valid set.
    fn is_valid(&self, cards: &[usize]) -> bool;

    /// Whether any valid set can be assembled from `pool`.
    fn any_valid_set_exists(&self, pool: &[usize]) -> bool;
}

/// Countdown, score, and freeze display.
///
/// Called from the dealer thread and from player threads; implementations
/// must tolerate concurrent calls.
pub trait GameDisplay: Send + Sync {
    /// Update the reshuffle countdown. `urgent` marks the warning window.
    fn set_countdown(&self, remaining: Duration, urgent: bool);

    /// Publish `player`'s score.
    fn set_score(&self, player: usize, score: u32);

    /// Update `player`'s freeze countdown. A zero duration clears it.
    fn set_freeze(&self, player: usize, remaining: Duration);

    /// Publish the final winner set (ties allowed).
    fn announce_winners(&self, players: &[usize]);
}

/// Display that drops every update, for headless sessions and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl GameDisplay for NullDisplay {
    fn set_countdown(&self, _remaining: Duration, _urgent: bool) {}
    fn set_score(&self, _player: usize, _score: u32) {}
    fn set_freeze(&self, _player: usize, _remaining: Duration) {}
    fn announce_winners(&self, _players: &[usize]) {}
}
