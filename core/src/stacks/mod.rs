//! Stack state machines
//!
//! Three families of stacking behaviour, each reduced to the same shape: a
//! [`StackTimeline`] of `(timestamp, count)` transitions per subject. Level
//! intervals and per-level uptime are derived from timelines the same way no
//! matter which model built them.
//!
//! # Models
//!
//! ```text
//! DecayStackModel        distinct sub-effect types active per target, best target wins
//! RefreshStackModel      capped counter bumped per trigger, expires after a fixed duration
//! CoOccurrenceStackModel distinct DoTs ticking while a marker debuff is up, per target
//!            │
//!            ▼
//!   Vec<StackTimeline> ──► derive_stack_levels ──► StackUptimeResult per level
//! ```

mod co_occurrence;
mod decay;
mod refresh;


use tempo_types::{
    EffectId, EffectMetadata, LeveledInterval, StackPoint, StackUptimeResult, TimeBounds,
};

use crate::error::EngineError;
use crate::uptime::{TargetTotals, averaged_result};

pub use co_occurrence::{CoOccurrenceParams, CoOccurrenceStackModel};
pub use decay::DecayStackModel;
pub use refresh::{RefreshStackModel, triggers_from_damage, triggers_from_effects};

// ═══════════════════════════════════════════════════════════════════════════
// Timeline
// ═══════════════════════════════════════════════════════════════════════════

/// Ordered stack-count transitions. A count holds from its timestamp until the
/// next point; before the first point the count is zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTimeline {
    points: Vec<StackPoint>,
}

impl StackTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the count is `count` from `timestamp` on.
    ///
    /// Timestamps must not go backwards. A second push at the same timestamp
    /// replaces the first; pushes that don't change the count are dropped.
    pub fn push(&mut self, timestamp: i64, count: u32) {
        debug_assert!(
            self.points.last().is_none_or(|p| p.timestamp <= timestamp),
            "stack timeline must be pushed in order"
        );
        if self.points.last().is_some_and(|p| p.timestamp == timestamp) {
            self.points.pop();
        }
        let previous = self.points.last().map_or(0, |p| p.count);
        if previous != count {
            self.points.push(StackPoint { timestamp, count });
        }
    }

    pub fn points(&self) -> &[StackPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_count(&self) -> u32 {
        self.points.iter().map(|p| p.count).max().unwrap_or(0)
    }

    /// Count in effect at `timestamp`.
    pub fn count_at(&self, timestamp: i64) -> u32 {
        let idx = self.points.partition_point(|p| p.timestamp <= timestamp);
        idx.checked_sub(1).map_or(0, |i| self.points[i].count)
    }
}

/// For every level in `1..=max_level`, the contiguous ranges where the count
/// is at least that level, clipped to `bounds`. A level still held at the end
/// of the timeline runs to `bounds.end`.
///
/// Levels above the highest count on the timeline are never reached, so the
/// work is bounded by the data rather than by `max_level`.
pub fn derive_stack_levels(
    timeline: &StackTimeline,
    bounds: TimeBounds,
    max_level: u32,
) -> Vec<LeveledInterval> {
    let mut leveled = Vec::new();
    let mut push = |level: u32, start: i64, end: i64| {
        if let Some((start, end)) = bounds.clip(start, end) {
            leveled.push(LeveledInterval { level, start, end });
        }
    };

    for level in 1..=max_level.min(timeline.max_count()) {
        let mut open: Option<i64> = None;
        for point in timeline.points() {
            match (open, point.count >= level) {
                (None, true) => open = Some(point.timestamp),
                (Some(start), false) => {
                    push(level, start, point.timestamp);
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(start) = open {
            push(level, start, bounds.end);
        }
    }

    leveled
}

// ═══════════════════════════════════════════════════════════════════════════
// Model Interface
// ═══════════════════════════════════════════════════════════════════════════

/// A strategy for building stack timelines.
///
/// Each returned timeline is one subject the per-level durations are averaged
/// over; models with nothing to report return no timelines.
pub trait StackModel {
    /// Highest level worth reporting.
    fn max_level(&self) -> u32;

    fn timelines(&self, bounds: TimeBounds) -> Vec<StackTimeline>;
}

/// What a stack uptime query reports on.
#[derive(Debug, Clone, Copy)]
pub struct StackUptimeOptions<'a> {
    pub bounds: TimeBounds,
    /// Id reported on each result row
    pub effect_id: EffectId,
    pub metadata: Option<&'a EffectMetadata>,
}

/// Per-level uptime for a stack family, one row per level with positive uptime.
///
/// Each level's duration and interval count are averaged across the model's
/// timelines.
pub fn compute_stack_uptime<M: StackModel + ?Sized>(
    model: &M,
    options: &StackUptimeOptions<'_>,
) -> Result<Vec<StackUptimeResult>, EngineError> {
    let bounds = options.bounds;
    EngineError::check_bounds(&bounds)?;
    let total_ms = bounds.duration_ms();
    if total_ms == 0 {
        return Ok(Vec::new());
    }

    let timelines = model.timelines(bounds);
    if timelines.is_empty() {
        return Ok(Vec::new());
    }

    let reached = timelines
        .iter()
        .map(StackTimeline::max_count)
        .max()
        .unwrap_or(0)
        .min(model.max_level());
    let mut per_level = vec![TargetTotals::default(); reached as usize];
    for timeline in &timelines {
        for interval in derive_stack_levels(timeline, bounds, reached) {
            let totals = &mut per_level[(interval.level - 1) as usize];
            totals.duration_ms += interval.end - interval.start;
            totals.applications += 1;
        }
    }

    let metadata = options
        .metadata
        .cloned()
        .unwrap_or_else(|| EffectMetadata::placeholder(options.effect_id));

    let results = per_level
        .iter()
        .zip(1..)
        .map(|(totals, level)| StackUptimeResult {
            uptime: averaged_result(
                options.effect_id,
                &metadata,
                std::iter::once(totals),
                timelines.len(),
                total_ms,
            ),
            stack_level: level,
        })
        .filter(|result| result.uptime.uptime_percentage > 0.0)
        .collect();

    Ok(results)
}

/// Uptime of a single stack level, if it was ever reached.
pub fn stack_level_uptime<M: StackModel + ?Sized>(
    model: &M,
    options: &StackUptimeOptions<'_>,
    level: u32,
) -> Result<Option<StackUptimeResult>, EngineError> {
    Ok(compute_stack_uptime(model, options)?
        .into_iter()
        .find(|result| result.stack_level == level))
}
