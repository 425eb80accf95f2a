//! Shared record types for the tempo timeline engine
//!
//! This crate contains the serializable records exchanged between the engine
//! (tempo-core) and whatever hosts it (the worker process, a frontend).
//! Everything here is plain data: no live references, no cycles, safe to ship
//! across a process boundary as JSON.
//!
//! All time fields are encounter-relative milliseconds unless the field name
//! says otherwise (`uptime_seconds`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type ActorId = i64;
pub type EffectId = i64;
pub type AbilityId = i64;

/// Effect id -> intervals, each list sorted by start.
pub type IntervalMap = BTreeMap<EffectId, Vec<EffectInterval>>;

// ─────────────────────────────────────────────────────────────────────────────
// Time
// ─────────────────────────────────────────────────────────────────────────────

/// Closed-open time range `[start, end)` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub start: i64,
    pub end: i64,
}

impl TimeBounds {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Length of the range, zero when inverted.
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    #[inline]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Clip `[start, end)` to these bounds. Returns `None` when nothing positive is left.
    pub fn clip(&self, start: i64, end: i64) -> Option<(i64, i64)> {
        let start = start.max(self.start);
        let end = end.min(self.end);
        (end > start).then_some((start, end))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw Events
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectEventKind {
    Apply,
    ApplyStack,
    Remove,
    RemoveStack,
}

impl EffectEventKind {
    /// Apply and apply-stack both prove the effect is present.
    pub fn opens(&self) -> bool {
        matches!(self, Self::Apply | Self::ApplyStack)
    }

    /// Only a full remove ends an instance; losing a stack does not.
    pub fn closes(&self) -> bool {
        matches!(self, Self::Remove)
    }
}

/// A buff/debuff event from the combat log.
///
/// Events arrive unordered; `timestamp` is the only ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectEvent {
    pub timestamp: i64,
    pub kind: EffectEventKind,
    pub effect_id: EffectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<ActorId>,
    pub target_id: ActorId,
}

/// Outcome of a damage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitType {
    #[default]
    Normal,
    Critical,
    Blocked,
    Absorbed,
    Missed,
    Immune,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub timestamp: i64,
    pub source_id: ActorId,
    pub target_id: ActorId,
    pub ability_id: AbilityId,
    #[serde(default)]
    pub amount: i64,
    /// Damage-over-time tick rather than a direct hit
    #[serde(default)]
    pub is_tick: bool,
    #[serde(default)]
    pub hit_type: HitType,
}

/// One closed, already-fetched encounter worth of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub effect_events: Vec<EffectEvent>,
    #[serde(default)]
    pub damage_events: Vec<DamageEvent>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Intervals & Timelines
// ─────────────────────────────────────────────────────────────────────────────

/// A continuous `[start, end)` range during which an effect was on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectInterval {
    pub start: i64,
    pub end: i64,
    pub target_id: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<ActorId>,
}

impl EffectInterval {
    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }

    #[inline]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

/// A stack count that holds from `timestamp` until the next point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackPoint {
    pub timestamp: i64,
    pub count: u32,
}

/// A range during which at least `level` stacks were active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveledInterval {
    pub level: u32,
    pub start: i64,
    pub end: i64,
}

/// One piece of the encounter partition produced by the active-combat filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSegment {
    pub start: i64,
    pub end: i64,
    /// True while damage kept landing; false for idle gaps
    pub active: bool,
}

impl CombatSegment {
    #[inline]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Effect Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Who an effect is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hostility {
    #[default]
    Friendly,
    Hostile,
}

/// Static display data for an effect or ability id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectMetadata {
    pub name: String,
    /// Icon reference (file name without path or extension)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_debuff: bool,
    #[serde(default)]
    pub hostility: Hostility,
}

impl EffectMetadata {
    /// Stand-in for ids the metadata table does not know.
    pub fn placeholder(effect_id: EffectId) -> Self {
        Self {
            name: format!("Unknown ({effect_id})"),
            icon: None,
            is_debuff: false,
            hostility: Hostility::Friendly,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Uptime Results
// ─────────────────────────────────────────────────────────────────────────────

/// Averaged uptime of one effect. Recomputed per query, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeResult {
    pub effect_id: EffectId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Averaged per-target clipped duration
    pub total_duration_ms: f64,
    pub uptime_seconds: f64,
    pub uptime_percentage: f64,
    pub application_count: u32,
    pub is_debuff: bool,
    pub hostility: Hostility,
}

/// Uptime of one stack level of a stack family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackUptimeResult {
    #[serde(flatten)]
    pub uptime: UptimeResult,
    pub stack_level: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stack Families
// ─────────────────────────────────────────────────────────────────────────────

/// Which events feed a refresh-model counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Damage events whose ability id is a trigger id
    #[default]
    Damage,
    /// Apply/apply-stack events whose effect id is a trigger id
    Effect,
}

/// Parameters of a stack family, independent of which targets are queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum StackModelSpec {
    /// Stacks = number of distinct sub-effect types active on a target;
    /// the level at an instant is the best target's count.
    Decay { effect_ids: Vec<EffectId> },
    /// A capped counter bumped by each trigger, expiring `duration_ms` after the last one.
    Refresh {
        #[serde(alias = "trigger_ability_ids", alias = "trigger_effect_ids")]
        trigger_ids: Vec<i64>,
        #[serde(default)]
        trigger_kind: TriggerKind,
        duration_ms: i64,
        max_stacks: u32,
    },
    /// While a marker debuff is up, stacks = distinct DoTs from the marker's
    /// applier recently ticking on the target.
    CoOccurrence {
        marker_effect_id: EffectId,
        max_stacks: u32,
        /// Restrict counted DoTs; discovered from ticking damage when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dot_ability_ids: Option<Vec<AbilityId>>,
    },
}

/// A stack family referenced by definition name or spelled out inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StackSelector {
    Named(String),
    Inline(StackModelSpec),
}

// ─────────────────────────────────────────────────────────────────────────────
// Sampled Metrics
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearItem {
    pub name: String,
    pub value: f64,
}

/// Per-actor static build data (gear and passive flags).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorBuild {
    pub actor_id: ActorId,
    #[serde(default)]
    pub gear: Vec<GearItem>,
    #[serde(default)]
    pub passives: Vec<String>,
}

/// Value granted while an effect is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectContribution {
    pub effect_id: EffectId,
    pub value: f64,
    /// Only counts when the sampled actor is the effect's source
    #[serde(default)]
    pub only_own: bool,
}

/// A sampled scalar (penetration, critical damage, mitigation, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    #[serde(default)]
    pub base: f64,
    pub cap: f64,
    /// Contributions from effects on the actor itself
    #[serde(default)]
    pub buffs: Vec<EffectContribution>,
    /// Contributions from effects on the actor's target
    #[serde(default)]
    pub debuffs: Vec<EffectContribution>,
    /// Passive flag -> value granted when the actor has it
    #[serde(default)]
    pub passives: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSelector {
    Named(String),
    Inline(MetricDefinition),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: i64,
    pub value: f64,
    /// Sample fell inside active combat
    pub active: bool,
}

/// Sampled series for one actor plus its reductions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorMetricSeries {
    pub actor_id: ActorId,
    pub static_value: f64,
    pub samples: Vec<MetricSample>,
    pub max_value: f64,
    /// Mean over every sample
    pub average: f64,
    /// Mean over active-combat samples, or `average` when there are none
    pub effective_average: f64,
    pub percent_at_cap: f64,
    pub active_samples: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Filter and averaging options for effect uptime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeOptions {
    /// Effects to report, in reporting order for equal uptimes
    pub effect_ids: Vec<EffectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<ActorId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ids: Option<Vec<ActorId>>,
    pub bounds: TimeBounds,
    /// Average across this many targets instead of the targets that have data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_count: Option<usize>,
    #[serde(default)]
    pub metadata: BTreeMap<EffectId, EffectMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackUptimeRequest {
    pub bounds: TimeBounds,
    pub stack: StackSelector,
    /// Id reported on each result row
    pub effect_id: EffectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EffectMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<ActorId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ids: Option<Vec<ActorId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRequest {
    pub bounds: TimeBounds,
    pub metric: MetricSelector,
    pub actors: Vec<ActorBuild>,
    /// Targets whose debuffs feed the dynamic component
    #[serde(default)]
    pub debuff_target_ids: Vec<ActorId>,
    /// Targets whose incoming damage defines active combat (all when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_target_ids: Option<Vec<ActorId>>,
}

/// Per-request overrides of engine configuration values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_threshold_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_step_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_window_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_occurrence_step_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dot_recency_window_ms: Option<i64>,
}

/// The work a single request asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisJob {
    Intervals {
        encounter_end: i64,
    },
    Uptime {
        options: UptimeOptions,
    },
    StackUptime {
        request: StackUptimeRequest,
    },
    ActiveCombat {
        bounds: TimeBounds,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_ids: Option<Vec<ActorId>>,
    },
    Metric {
        request: MetricRequest,
    },
}

/// One request/response call: an event batch plus the job to run on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub batch: EventBatch,
    #[serde(default)]
    pub overrides: EngineOverrides,
    pub job: AnalysisJob,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResponse {
    Intervals { intervals: IntervalMap },
    Uptime { results: Vec<UptimeResult> },
    StackUptime { results: Vec<StackUptimeResult> },
    ActiveCombat { segments: Vec<CombatSegment> },
    Metric { series: Vec<ActorMetricSeries> },
}
