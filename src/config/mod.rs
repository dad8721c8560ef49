//! Configuration module - environment variable parsing

pub mod arenas;

use std::env;
use std::path::PathBuf;

use crate::util::time::DEFAULT_TICK_MILLIS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Interval between lifecycle ticks in milliseconds
    pub tick_interval_ms: u64,
    /// Path to the arenas instance document
    pub arenas_file: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Operator-tunable stage durations
    pub timing: TimingConfig,
}

/// Stage durations in seconds, all defaulted when absent.
/// Read-only to the lifecycle core.
#[derive(Clone, Debug)]
pub struct TimingConfig {
    /// Lobby countdown before a game starts
    pub starting_wait_secs: i32,
    /// Hold time while below the player minimum
    pub waiting_secs: i32,
    /// Active play duration
    pub in_game_secs: i32,
    /// Wind-down after a game stops
    pub ending_secs: i32,
    /// Reset window before the arena reopens
    pub restarting_secs: i32,
    /// Countdown cap applied once the lobby is full
    pub shorten_waiting_full_secs: i32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            starting_wait_secs: 60,
            waiting_secs: 20,
            in_game_secs: 270,
            ending_secs: 10,
            restarting_secs: 5,
            shorten_waiting_full_secs: 15,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            tick_interval_ms: parse_var("TICK_INTERVAL_MS", DEFAULT_TICK_MILLIS)?,
            arenas_file: env::var("ARENAS_FILE")
                .unwrap_or_else(|_| "arenas.json".to_string())
                .into(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            timing: TimingConfig::from_env()?,
        })
    }
}

impl TimingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            starting_wait_secs: parse_var("TIME_STARTING_WAIT", defaults.starting_wait_secs)?,
            waiting_secs: parse_var("TIME_WAITING", defaults.waiting_secs)?,
            in_game_secs: parse_var("TIME_IN_GAME", defaults.in_game_secs)?,
            ending_secs: parse_var("TIME_ENDING", defaults.ending_secs)?,
            restarting_secs: parse_var("TIME_RESTARTING", defaults.restarting_secs)?,
            shorten_waiting_full_secs: parse_var(
                "TIME_SHORTEN_WAITING_FULL",
                defaults.shorten_waiting_full_secs,
            )?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Failed to read arenas document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed arenas document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults_match_operator_documentation() {
        let timing = TimingConfig::default();
        assert_eq!(timing.starting_wait_secs, 60);
        assert_eq!(timing.waiting_secs, 20);
        assert_eq!(timing.in_game_secs, 270);
        assert_eq!(timing.restarting_secs, 5);
        assert_eq!(timing.shorten_waiting_full_secs, 15);
    }
}
