//! Common serde default value functions
//!
//! Used by `EngineConfig` so a partially written TOML file still loads.

use crate::activity::DEFAULT_IDLE_THRESHOLD_MS;

/// Gap between damage events that ends an active-combat interval
pub fn default_idle_threshold_ms() -> i64 {
    DEFAULT_IDLE_THRESHOLD_MS
}

/// Width of one sampling voxel
pub fn default_sample_step_ms() -> i64 {
    1000
}

/// How far around a marker debuff's start to look for its applier
pub fn default_attribution_window_ms() -> i64 {
    1000
}

pub fn default_co_occurrence_step_ms() -> i64 {
    250
}

/// A DoT counts as ticking if it ticked within this long before the sample
pub fn default_dot_recency_window_ms() -> i64 {
    2000
}
