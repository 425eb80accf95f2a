//! Decay/union stacking: each distinct sub-effect type active on a target is
//! one stack, and the reported level is the best target's count.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use tempo_types::{ActorId, EffectId, IntervalMap, TimeBounds};

use super::{StackModel, StackTimeline};

/// One end of an interval. Ends sort before starts at the same timestamp so
/// back-to-back instances don't briefly double count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EdgeKind {
    End,
    Start,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    timestamp: i64,
    kind: EdgeKind,
    target_id: ActorId,
    /// Index into the model's effect list
    slot: usize,
}

#[derive(Debug, Default)]
struct TargetState {
    /// Concurrent instances per sub-effect slot
    instances: HashMap<usize, u32>,
    /// Slots with at least one live instance
    distinct: u32,
}

#[derive(Debug, Clone)]
pub struct DecayStackModel<'a> {
    intervals: &'a IntervalMap,
    effect_ids: Vec<EffectId>,
    source_ids: Option<HashSet<ActorId>>,
    target_ids: Option<HashSet<ActorId>>,
}

impl<'a> DecayStackModel<'a> {
    /// Duplicate effect ids count once.
    pub fn new(intervals: &'a IntervalMap, effect_ids: &[EffectId]) -> Self {
        let mut seen = HashSet::new();
        let effect_ids = effect_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        Self {
            intervals,
            effect_ids,
            source_ids: None,
            target_ids: None,
        }
    }

    /// Only count instances applied by these actors. Sourceless intervals still count.
    pub fn with_sources(mut self, source_ids: Option<&[ActorId]>) -> Self {
        self.source_ids = source_ids.map(|ids| ids.iter().copied().collect());
        self
    }

    pub fn with_targets(mut self, target_ids: Option<&[ActorId]>) -> Self {
        self.target_ids = target_ids.map(|ids| ids.iter().copied().collect());
        self
    }

    fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (slot, effect_id) in self.effect_ids.iter().enumerate() {
            let Some(list) = self.intervals.get(effect_id) else {
                continue;
            };
            for interval in list {
                if interval.end <= interval.start {
                    continue;
                }
                if let (Some(sources), Some(source)) = (&self.source_ids, interval.source_id)
                    && !sources.contains(&source)
                {
                    continue;
                }
                if self
                    .target_ids
                    .as_ref()
                    .is_some_and(|targets| !targets.contains(&interval.target_id))
                {
                    continue;
                }
                for (timestamp, kind) in [
                    (interval.start, EdgeKind::Start),
                    (interval.end, EdgeKind::End),
                ] {
                    edges.push(Edge {
                        timestamp,
                        kind,
                        target_id: interval.target_id,
                        slot,
                    });
                }
            }
        }
        edges.sort_by_key(|edge| (edge.timestamp, edge.kind));
        edges
    }
}

impl StackModel for DecayStackModel<'_> {
    fn max_level(&self) -> u32 {
        self.effect_ids.len() as u32
    }

    fn timelines(&self, _bounds: TimeBounds) -> Vec<StackTimeline> {
        let edges = self.edges();
        if edges.is_empty() {
            return Vec::new();
        }

        let mut targets: HashMap<ActorId, TargetState> = HashMap::new();
        // distinct count -> number of targets currently at it
        let mut histogram: BTreeMap<u32, usize> = BTreeMap::new();
        let mut timeline = StackTimeline::new();

        for (i, edge) in edges.iter().enumerate() {
            let state = targets.entry(edge.target_id).or_default();
            let before = state.distinct;
            let instances = state.instances.entry(edge.slot).or_default();
            match edge.kind {
                EdgeKind::Start => {
                    *instances += 1;
                    if *instances == 1 {
                        state.distinct += 1;
                    }
                }
                EdgeKind::End => {
                    if *instances > 0 {
                        *instances -= 1;
                        if *instances == 0 {
                            state.distinct -= 1;
                        }
                    }
                }
            }

            let after = state.distinct;
            if before != after {
                if before > 0
                    && let Some(n) = histogram.get_mut(&before)
                {
                    *n -= 1;
                    if *n == 0 {
                        histogram.remove(&before);
                    }
                }
                if after > 0 {
                    *histogram.entry(after).or_default() += 1;
                }
            }

            let last_at_timestamp = edges
                .get(i + 1)
                .is_none_or(|next| next.timestamp != edge.timestamp);
            if last_at_timestamp {
                let level = histogram.last_key_value().map_or(0, |(&count, _)| count);
                timeline.push(edge.timestamp, level);
            }
        }

        vec![timeline]
    }
}
