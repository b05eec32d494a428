//! Error types for the game session.
//!
//! Operational errors only. Board invariant violations (placing onto an
//! occupied slot, claiming an empty slot) are programmer errors and are
//! handled with `debug_assert!` at the call site rather than surfaced here.

use thiserror::Error;

/// Errors surfaced by session construction and input routing.
#[derive(Debug, Error)]
pub enum GameError {
    /// The configuration describes a game that cannot be played.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// `start` was called on a session whose dealer thread is already running.
    #[error("session already started")]
    AlreadyStarted,

    /// An input event was routed to a player id outside the session.
    #[error("unknown player id: {player}")]
    UnknownPlayer { player: usize },

    /// Installing the Ctrl-C handler failed.
    #[error("failed to install signal handler: {message}")]
    SignalHandler { message: String },
}
