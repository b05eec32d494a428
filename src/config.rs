//! Session configuration.
//!
//! A `GameConfig` is fixed for the lifetime of a session: board geometry,
//! player counts, and the timer durations the dealer and players consume.
//! Loading (files, CLI flags) belongs to the embedding process; the crate
//! accepts a ready value or JSON via serde.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::GameError;

/// Read-only configuration for one game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // ---- Geometry ----
    /// Number of slots on the board.
    pub table_size: usize,
    /// Number of cards that form a set (the claim-queue capacity).
    pub feature_size: usize,
    /// Total number of distinct cards in the deck.
    pub deck_size: usize,

    // ---- Players ----
    /// Number of human players (input arrives via `GameSession::key_pressed`).
    pub human_players: usize,
    /// Number of autonomous players (each gets a selection-generation thread).
    pub computer_players: usize,

    // ---- Timers ----
    /// Time between forced reshuffles, in milliseconds.
    pub turn_timeout_millis: u64,
    /// Remaining time under which the countdown turns urgent, in milliseconds.
    pub turn_timeout_warning_millis: u64,
    /// Freeze served after a confirmed set, in milliseconds.
    pub point_freeze_millis: u64,
    /// Freeze served after a rejected set, in milliseconds.
    pub penalty_freeze_millis: u64,

    // ---- Determinism ----
    /// Seed for the dealer's RNG. `None` draws a seed from the OS; set it to
    /// make dealing order reproducible.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            table_size: 12,
            feature_size: 3,
            deck_size: 81,
            human_players: 0,
            computer_players: 2,
            turn_timeout_millis: 60_000,
            turn_timeout_warning_millis: 5_000,
            point_freeze_millis: 1_000,
            penalty_freeze_millis: 3_000,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Parse a configuration from a JSON document and validate it.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidConfig`] if the document does not parse or
    /// describes an unplayable game.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let config: Self = serde_json::from_str(json).map_err(|e| GameError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a playable game.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidConfig`] on degenerate geometry or an
    /// empty player roster.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.feature_size == 0 {
            return Err(GameError::InvalidConfig {
                message: "feature_size must be at least 1".to_string(),
            });
        }
        if self.table_size < self.feature_size {
            return Err(GameError::InvalidConfig {
                message: format!(
                    "table_size {} cannot hold a set of {} cards",
                    self.table_size, self.feature_size
                ),
            });
        }
        if self.player_count() == 0 {
            return Err(GameError::InvalidConfig {
                message: "at least one player is required".to_string(),
            });
        }
        Ok(())
    }

    /// Total number of players in the session.
    pub fn player_count(&self) -> usize {
        self.human_players + self.computer_players
    }

    /// Time between forced reshuffles.
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_millis)
    }

    /// Remaining time under which the countdown turns urgent.
    pub fn turn_timeout_warning(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_warning_millis)
    }

    /// Freeze served after a confirmed set.
    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_millis)
    }

    /// Freeze served after a rejected set.
    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.table_size, 12);
        assert_eq!(config.feature_size, 3);
        assert_eq!(config.deck_size, 81);
        assert_eq!(config.player_count(), 2);
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = GameConfig::from_json(r#"{"computer_players": 4, "rng_seed": 7}"#).unwrap();
        assert_eq!(config.computer_players, 4);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.table_size, 12);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(GameConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_feature_size() {
        let config = GameConfig {
            feature_size: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GameError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_table_smaller_than_set() {
        let config = GameConfig {
            table_size: 2,
            feature_size: 3,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_no_players() {
        let config = GameConfig {
            human_players: 0,
            computer_players: 0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_accessors() {
        let config = GameConfig::default();
        assert_eq!(config.turn_timeout(), Duration::from_secs(60));
        assert_eq!(config.penalty_freeze(), Duration::from_secs(3));
    }
}
