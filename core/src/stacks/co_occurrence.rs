//! Counted co-occurrence stacking
//!
//! While a marker debuff is up on a target, the stack count is the number of
//! distinct damage-over-time abilities from the marker's applier that ticked
//! on that target within a trailing recency window. The combat log doesn't
//! record who applied the marker, so the applier is inferred from damage that
//! landed on the target around the marker's start.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use tempo_types::{
    AbilityId, ActorId, DamageEvent, EffectId, EffectInterval, IntervalMap, TimeBounds,
};

use super::{StackModel, StackTimeline};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Timing knobs for the co-occurrence model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoOccurrenceParams {
    /// How far on either side of the marker start to look for its applier
    pub attribution_window_ms: i64,
    /// Sampling step inside each marker interval
    pub step_ms: i64,
    /// A DoT counts while it ticked within this long before the sample
    pub recency_window_ms: i64,
}

impl CoOccurrenceParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            attribution_window_ms: config.attribution_window_ms,
            step_ms: config.co_occurrence_step_ms,
            recency_window_ms: config.dot_recency_window_ms,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        EngineError::check_window("attribution_window_ms", self.attribution_window_ms)?;
        EngineError::check_step("co_occurrence_step_ms", self.step_ms)?;
        EngineError::check_step("dot_recency_window_ms", self.recency_window_ms)
    }
}

impl Default for CoOccurrenceParams {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct Tick {
    timestamp: i64,
    ability_id: AbilityId,
}

#[derive(Debug)]
pub struct CoOccurrenceStackModel<'a> {
    /// Marker intervals per target, sorted by start
    markers: BTreeMap<ActorId, Vec<&'a EffectInterval>>,
    /// Damage sorted by timestamp, used for applier attribution
    damage: Vec<&'a DamageEvent>,
    /// Qualifying DoT ticks per (source, target), sorted by timestamp
    ticks: HashMap<(ActorId, ActorId), Vec<Tick>>,
    source_ids: Option<HashSet<ActorId>>,
    max_stacks: u32,
    params: CoOccurrenceParams,
}

impl<'a> CoOccurrenceStackModel<'a> {
    /// `dot_ability_ids` restricts which abilities count. When absent, any
    /// ability that produced a tick qualifies.
    pub fn new(
        intervals: &'a IntervalMap,
        damage_events: &'a [DamageEvent],
        marker_effect_id: EffectId,
        max_stacks: u32,
        dot_ability_ids: Option<&[AbilityId]>,
        params: CoOccurrenceParams,
    ) -> Result<Self, EngineError> {
        if max_stacks == 0 {
            return Err(EngineError::InvalidStackCap);
        }
        params.validate()?;

        let mut markers: BTreeMap<ActorId, Vec<&EffectInterval>> = BTreeMap::new();
        for interval in intervals.get(&marker_effect_id).into_iter().flatten() {
            if interval.end > interval.start {
                markers.entry(interval.target_id).or_default().push(interval);
            }
        }
        for list in markers.values_mut() {
            list.sort_by_key(|interval| interval.start);
        }

        let mut damage: Vec<&DamageEvent> = damage_events.iter().collect();
        damage.sort_by_key(|event| event.timestamp);

        let allowed: Option<HashSet<AbilityId>> =
            dot_ability_ids.map(|ids| ids.iter().copied().collect());
        let mut ticks: HashMap<(ActorId, ActorId), Vec<Tick>> = HashMap::new();
        for event in damage.iter().filter(|event| event.is_tick) {
            if allowed
                .as_ref()
                .is_some_and(|allowed| !allowed.contains(&event.ability_id))
            {
                continue;
            }
            ticks
                .entry((event.source_id, event.target_id))
                .or_default()
                .push(Tick {
                    timestamp: event.timestamp,
                    ability_id: event.ability_id,
                });
        }

        Ok(Self {
            markers,
            damage,
            ticks,
            source_ids: None,
            max_stacks,
            params,
        })
    }

    /// Only report targets in this set.
    pub fn with_targets(mut self, target_ids: Option<&[ActorId]>) -> Self {
        if let Some(ids) = target_ids {
            let keep: HashSet<ActorId> = ids.iter().copied().collect();
            self.markers.retain(|target, _| keep.contains(target));
        }
        self
    }

    /// Only count markers attributed to these actors.
    pub fn with_sources(mut self, source_ids: Option<&[ActorId]>) -> Self {
        self.source_ids = source_ids.map(|ids| ids.iter().copied().collect());
        self
    }

    /// Best guess at who applied a marker starting at `start` on `target_id`:
    /// the actor whose damage on the target landed closest to `start` within
    /// the attribution window. Ties go to the earliest event.
    pub fn attribute_source(&self, target_id: ActorId, start: i64) -> Option<ActorId> {
        let window = self.params.attribution_window_ms;
        let from = self
            .damage
            .partition_point(|event| event.timestamp < start - window);

        self.damage[from..]
            .iter()
            .take_while(|event| event.timestamp <= start + window)
            .filter(|event| event.target_id == target_id)
            .min_by_key(|event| (event.timestamp - start).abs())
            .map(|event| event.source_id)
    }

    /// Distinct qualifying abilities that ticked in `(timestamp - recency, timestamp]`.
    fn count_at(&self, ticks: &[Tick], timestamp: i64) -> u32 {
        let window_start = timestamp - self.params.recency_window_ms;
        let from = ticks.partition_point(|tick| tick.timestamp <= window_start);
        let to = ticks.partition_point(|tick| tick.timestamp <= timestamp);
        let distinct: HashSet<AbilityId> =
            ticks[from..to].iter().map(|tick| tick.ability_id).collect();
        (distinct.len() as u32).min(self.max_stacks)
    }

    fn target_timeline(
        &self,
        target_id: ActorId,
        markers: &[&EffectInterval],
        bounds: TimeBounds,
    ) -> Option<StackTimeline> {
        let mut timeline = StackTimeline::new();
        let mut cursor = bounds.start;
        let mut active = false;

        for marker in markers {
            let Some((start, end)) = bounds.clip(marker.start.max(cursor), marker.end) else {
                continue;
            };
            let Some(source_id) = self.attribute_source(target_id, marker.start) else {
                // The target still had the marker up; it just contributes no stacks.
                tracing::debug!(
                    target_id,
                    start = marker.start,
                    "No damage near marker start, marker interval counts as zero stacks"
                );
                active |= self.source_ids.is_none();
                continue;
            };
            if self
                .source_ids
                .as_ref()
                .is_some_and(|sources| !sources.contains(&source_id))
            {
                continue;
            }

            let ticks = self
                .ticks
                .get(&(source_id, target_id))
                .map_or(&[][..], Vec::as_slice);
            let mut t = start;
            while t < end {
                timeline.push(t, self.count_at(ticks, t));
                t += self.params.step_ms;
            }
            timeline.push(end, 0);
            cursor = end;
            active = true;
        }

        active.then_some(timeline)
    }
}

impl StackModel for CoOccurrenceStackModel<'_> {
    fn max_level(&self) -> u32 {
        self.max_stacks
    }

    /// One timeline per target with marker activity inside `bounds`, even if
    /// no DoT ever ticked or the marker's applier couldn't be inferred. With a
    /// source filter, only markers attributed to a listed actor count the
    /// target as active.
    fn timelines(&self, bounds: TimeBounds) -> Vec<StackTimeline> {
        self.markers
            .iter()
            .filter_map(|(&target_id, markers)| self.target_timeline(target_id, markers, bounds))
            .collect()
    }
}
