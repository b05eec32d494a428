//! # setgame
//!
//! Concurrent dealer/player session core for the card game Set.
//!
//! One dealer thread deals cards onto a shared board, runs the reshuffle
//! countdown, and judges completed claims strictly first-come-first-served;
//! N player threads (human-driven or autonomous) claim slots, block while
//! their claim is judged, and serve point or penalty freezes. The
//! set-combinatorics oracle and the countdown/score display are consumed
//! through traits; see [`interfaces`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use setgame::{GameConfig, GameSession, NullDisplay, SetOracle};
//!
//! struct Oracle;
//! impl SetOracle for Oracle {
//!     fn is_valid(&self, _cards: &[usize]) -> bool { true }
//!     fn any_valid_set_exists(&self, _pool: &[usize]) -> bool { true }
//! }
//!
//! # fn main() -> Result<(), setgame::GameError> {
//! let config = GameConfig::default();
//! let mut session = GameSession::new(config, Arc::new(Oracle), Arc::new(NullDisplay))?;
//! session.install_ctrlc_handler()?;
//! session.start()?;
//! session.join();
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod config;
pub(crate) mod dealer;
pub mod errors;
pub mod interfaces;
pub mod player;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use board::Board;
pub use config::GameConfig;
pub use errors::GameError;
pub use interfaces::{GameDisplay, NullDisplay, SetOracle};
pub use player::Player;
pub use session::GameSession;
