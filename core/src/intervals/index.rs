//! Point-in-time membership lookups over built intervals.

use hashbrown::HashMap;
use tempo_types::{ActorId, EffectId, EffectInterval, IntervalMap};

/// Intervals of one (effect, target) pair, sorted by start.
#[derive(Debug, Default)]
struct Lane<'a> {
    intervals: Vec<&'a EffectInterval>,
    /// Running maximum of `end`, so a backwards scan can stop early
    max_end: Vec<i64>,
}

/// Read-only index answering "was effect X on target Y at time t".
///
/// Built once per request; lookups are a binary search plus a short scan.
#[derive(Debug, Default)]
pub struct IntervalIndex<'a> {
    lanes: HashMap<(EffectId, ActorId), Lane<'a>>,
}

impl<'a> IntervalIndex<'a> {
    pub fn new(intervals: &'a IntervalMap) -> Self {
        let mut lanes: HashMap<(EffectId, ActorId), Lane<'a>> = HashMap::new();
        for (&effect_id, list) in intervals {
            for interval in list {
                lanes
                    .entry((effect_id, interval.target_id))
                    .or_default()
                    .intervals
                    .push(interval);
            }
        }

        for lane in lanes.values_mut() {
            lane.intervals.sort_by_key(|i| i.start);
            let mut running = i64::MIN;
            lane.max_end = lane
                .intervals
                .iter()
                .map(|i| {
                    running = running.max(i.end);
                    running
                })
                .collect();
        }

        Self { lanes }
    }

    /// Intervals of `effect_id` on `target_id`, sorted by start.
    pub fn intervals(&self, effect_id: EffectId, target_id: ActorId) -> &[&'a EffectInterval] {
        self.lanes
            .get(&(effect_id, target_id))
            .map(|lane| lane.intervals.as_slice())
            .unwrap_or(&[])
    }

    /// Intervals of `effect_id` on `target_id` that cover `timestamp`.
    pub fn active_at(
        &self,
        effect_id: EffectId,
        target_id: ActorId,
        timestamp: i64,
    ) -> impl Iterator<Item = &'a EffectInterval> + '_ {
        let lane = self.lanes.get(&(effect_id, target_id));
        let candidates = lane.map_or(0, |lane| {
            lane.intervals.partition_point(|i| i.start <= timestamp)
        });

        (0..candidates)
            .rev()
            .take_while(move |&idx| lane.is_some_and(|lane| lane.max_end[idx] > timestamp))
            .filter_map(move |idx| lane.map(|lane| lane.intervals[idx]))
            .filter(move |interval| interval.contains(timestamp))
    }

    /// Whether the effect covers `timestamp` on the target, optionally only
    /// counting intervals credited to `source_id`.
    pub fn is_active(
        &self,
        effect_id: EffectId,
        target_id: ActorId,
        timestamp: i64,
        source_id: Option<ActorId>,
    ) -> bool {
        self.active_at(effect_id, target_id, timestamp)
            .any(|interval| source_id.is_none_or(|source| interval.source_id == Some(source)))
    }
}
