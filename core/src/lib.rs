pub mod activity;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod intervals;
pub mod progress;
pub mod sampling;
pub mod serde_defaults;
pub mod stacks;
pub mod uptime;

// Re-exports for convenience
pub use activity::{
    DEFAULT_IDLE_THRESHOLD_MS, active_duration_ms, find_active_intervals, is_active_at,
};
pub use config::EngineConfig;
pub use definitions::{DefinitionConfig, DefinitionSet, StackDefinition};
pub use engine::run_request;
pub use error::{ConfigError, DefinitionError, EngineError};
pub use intervals::{IntervalIndex, build_intervals, targets_of};
pub use progress::Progress;
pub use sampling::{sample_metric, summarize};
pub use stacks::{
    CoOccurrenceParams, CoOccurrenceStackModel, DecayStackModel, RefreshStackModel, StackModel,
    StackTimeline, StackUptimeOptions, compute_stack_uptime, derive_stack_levels,
    stack_level_uptime, triggers_from_damage, triggers_from_effects,
};
pub use uptime::compute_uptime;
pub use tempo_types::*;
