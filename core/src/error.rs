//! Error types for the timeline engine
//!
//! Inconsistent log data never produces an error: unmatched removes, unknown
//! ids and empty inputs degrade to empty or placeholder results. Only request
//! shapes the caller got wrong end up here.

use std::path::PathBuf;
use thiserror::Error;

use tempo_types::TimeBounds;

/// Malformed requests (programming errors on the caller's side)
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid bounds: end {end} is before start {start}")]
    InvalidBounds { start: i64, end: i64 },

    #[error("invalid {name}: {value}ms (must be positive)")]
    InvalidStep { name: &'static str, value: i64 },

    #[error("invalid {name}: {value}ms (must not be negative)")]
    InvalidWindow { name: &'static str, value: i64 },

    #[error("stack family needs a positive stack cap")]
    InvalidStackCap,

    #[error("refresh stack family needs a positive duration, got {duration_ms}ms")]
    InvalidStackDuration { duration_ms: i64 },

    #[error("refresh stack family needs exactly one target, got {count}")]
    MissingStackTarget { count: usize },

    #[error("unknown stack family '{name}'")]
    UnknownStackFamily { name: String },

    #[error("unknown metric '{name}'")]
    UnknownMetric { name: String },
}

impl EngineError {
    /// Reject inverted bounds; equal start/end is allowed and yields empty results.
    pub fn check_bounds(bounds: &TimeBounds) -> Result<(), Self> {
        if bounds.is_inverted() {
            return Err(Self::InvalidBounds {
                start: bounds.start,
                end: bounds.end,
            });
        }
        Ok(())
    }

    pub fn check_step(name: &'static str, value: i64) -> Result<(), Self> {
        if value <= 0 {
            return Err(Self::InvalidStep { name, value });
        }
        Ok(())
    }

    pub fn check_window(name: &'static str, value: i64) -> Result<(), Self> {
        if value < 0 {
            return Err(Self::InvalidWindow { name, value });
        }
        Ok(())
    }
}

/// Errors while loading a definitions file
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read definitions file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse definitions TOML in {path}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid definition in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),
}
