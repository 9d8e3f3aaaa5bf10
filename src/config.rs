//! Game configuration models.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cards;

/// How the round timer behaves. Selected by the sign of
/// `turn_timeout_millis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Negative timeout: nothing is published and rounds never expire.
    Hidden,
    /// Zero timeout: elapsed time is published; the table is refreshed
    /// whenever no legal set remains on it.
    Elapsed,
    /// Positive timeout: a countdown is published and the table is
    /// reshuffled when it reaches zero.
    Countdown,
}

/// Errors produced by [`GameConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one player is required")]
    NoPlayers,
    #[error("human players ({humans}) exceed total players ({players})")]
    TooManyHumans { humans: usize, players: usize },
    #[error("set size must be {}", cards::SET_SIZE)]
    UnsupportedSetSize,
    #[error("table size ({table_size}) must hold at least one set ({set_size})")]
    TableTooSmall { table_size: usize, set_size: usize },
    #[error("deck size ({deck_size}) must cover the table ({table_size})")]
    DeckTooSmall { deck_size: usize, table_size: usize },
    #[error("deck size ({deck_size}) exceeds the {max} cards the feature encoding covers")]
    DeckTooLarge { deck_size: usize, max: usize },
}

/// Static game configuration.
///
/// Human participants occupy the low ids `0..human_players`; the rest are
/// driven by synthetic-input workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Total number of participants.
    pub players: usize,

    /// How many of them receive external key events.
    pub human_players: usize,

    /// Number of cards in the deck.
    pub deck_size: usize,

    /// Number of grid slots on the table.
    pub table_size: usize,

    /// Number of cards forming a legal set.
    pub set_size: usize,

    /// Round timeout. Negative hides the timer, zero shows elapsed time,
    /// positive counts down to a reshuffle.
    pub turn_timeout_millis: i64,

    /// Countdown remainder below which the display is warned.
    pub turn_timeout_warning_millis: u64,

    /// Freeze imposed on a participant after scoring a point.
    pub point_freeze_millis: u64,

    /// Freeze imposed on a participant after an invalid claim.
    pub penalty_freeze_millis: u64,

    /// Dealing animation delay applied inside card placement and removal.
    pub table_delay_millis: u64,

    /// Enables hint logging and the smart synthetic-input mode.
    pub hints: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: 4,
            human_players: 2,
            deck_size: cards::DECK_LIMIT,
            table_size: 12,
            set_size: cards::SET_SIZE,
            turn_timeout_millis: 60_000,
            turn_timeout_warning_millis: 5_000,
            point_freeze_millis: 1_000,
            penalty_freeze_millis: 3_000,
            table_delay_millis: 100,
            hints: false,
        }
    }
}

impl GameConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        if self.human_players > self.players {
            return Err(ConfigError::TooManyHumans {
                humans: self.human_players,
                players: self.players,
            });
        }
        if self.set_size != cards::SET_SIZE {
            return Err(ConfigError::UnsupportedSetSize);
        }
        if self.table_size < self.set_size {
            return Err(ConfigError::TableTooSmall {
                table_size: self.table_size,
                set_size: self.set_size,
            });
        }
        if self.deck_size < self.table_size {
            return Err(ConfigError::DeckTooSmall {
                deck_size: self.deck_size,
                table_size: self.table_size,
            });
        }
        if self.deck_size > cards::DECK_LIMIT {
            return Err(ConfigError::DeckTooLarge {
                deck_size: self.deck_size,
                max: cards::DECK_LIMIT,
            });
        }
        Ok(())
    }

    /// Timer mode derived from the timeout sign.
    pub fn timer_mode(&self) -> TimerMode {
        match self.turn_timeout_millis {
            t if t < 0 => TimerMode::Hidden,
            0 => TimerMode::Elapsed,
            _ => TimerMode::Countdown,
        }
    }

    /// The countdown length. Only meaningful in [`TimerMode::Countdown`].
    pub fn countdown_millis(&self) -> u64 {
        self.turn_timeout_millis.max(0) as u64
    }

    /// Whether the participant with the given id is human.
    pub fn is_human(&self, player: usize) -> bool {
        player < self.human_players
    }
}
