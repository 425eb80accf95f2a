//! Engine configuration
//!
//! Thresholds and sampling widths used across the engine. Persisted with confy
//! (TOML) under the `tempo` app name. A request may override single values
//! without touching the stored file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempo_types::EngineOverrides;

use crate::error::{ConfigError, EngineError};
use crate::serde_defaults::{
    default_attribution_window_ms, default_co_occurrence_step_ms, default_dot_recency_window_ms,
    default_idle_threshold_ms, default_sample_step_ms,
};

const APP_NAME: &str = "tempo";
const CONFIG_NAME: &str = "engine";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest gap between damage events that still counts as one active interval
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: i64,

    /// Voxel width for the sampled metric engine
    #[serde(default = "default_sample_step_ms")]
    pub sample_step_ms: i64,

    // ─── Co-occurrence stacking ─────────────────────────────────────────────
    /// Source lookup window on each side of a marker debuff's start
    #[serde(default = "default_attribution_window_ms")]
    pub attribution_window_ms: i64,

    #[serde(default = "default_co_occurrence_step_ms")]
    pub co_occurrence_step_ms: i64,

    #[serde(default = "default_dot_recency_window_ms")]
    pub dot_recency_window_ms: i64,

    /// Optional TOML file with named stack families and metrics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_threshold_ms: default_idle_threshold_ms(),
            sample_step_ms: default_sample_step_ms(),
            attribution_window_ms: default_attribution_window_ms(),
            co_occurrence_step_ms: default_co_occurrence_step_ms(),
            dot_recency_window_ms: default_dot_recency_window_ms(),
            definitions_path: None,
        }
    }
}

impl EngineConfig {
    /// Load the stored config, falling back to defaults when it can't be read.
    pub fn load() -> Self {
        match confy::load(APP_NAME, CONFIG_NAME) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load engine config, using defaults");
                Self::default()
            }
        }
    }

    /// Load from an explicit path. confy writes the defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(confy::load_path(path)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    /// Copy of this config with the request's overrides applied.
    pub fn with_overrides(&self, overrides: &EngineOverrides) -> Self {
        Self {
            idle_threshold_ms: overrides.idle_threshold_ms.unwrap_or(self.idle_threshold_ms),
            sample_step_ms: overrides.sample_step_ms.unwrap_or(self.sample_step_ms),
            attribution_window_ms: overrides
                .attribution_window_ms
                .unwrap_or(self.attribution_window_ms),
            co_occurrence_step_ms: overrides
                .co_occurrence_step_ms
                .unwrap_or(self.co_occurrence_step_ms),
            dot_recency_window_ms: overrides
                .dot_recency_window_ms
                .unwrap_or(self.dot_recency_window_ms),
            definitions_path: self.definitions_path.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        EngineError::check_window("idle_threshold_ms", self.idle_threshold_ms)?;
        EngineError::check_step("sample_step_ms", self.sample_step_ms)?;
        EngineError::check_window("attribution_window_ms", self.attribution_window_ms)?;
        EngineError::check_step("co_occurrence_step_ms", self.co_occurrence_step_ms)?;
        EngineError::check_step("dot_recency_window_ms", self.dot_recency_window_ms)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("idle_threshold_ms = 2500").unwrap();
        assert_eq!(config.idle_threshold_ms, 2500);
        assert_eq!(config.sample_step_ms, 1000);
        assert_eq!(config.co_occurrence_step_ms, 250);
        assert!(config.definitions_path.is_none());
    }

    #[test]
    fn overrides_replace_only_set_values() {
        let config = EngineConfig::default();
        let overrides = EngineOverrides {
            sample_step_ms: Some(500),
            ..Default::default()
        };
        let merged = config.with_overrides(&overrides);
        assert_eq!(merged.sample_step_ms, 500);
        assert_eq!(merged.idle_threshold_ms, config.idle_threshold_ms);
    }

    #[test]
    fn zero_step_is_rejected() {
        let config = EngineConfig {
            sample_step_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidStep { name: "sample_step_ms", value: 0 })
        ));
    }

    #[test]
    fn negative_idle_threshold_is_rejected() {
        let config = EngineConfig {
            idle_threshold_ms: -1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidWindow { .. })));
    }
}
