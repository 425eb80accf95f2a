//! Interval builder
//!
//! Turns an unordered apply/remove event stream into per-effect, per-target
//! `[start, end)` intervals. This is the only place intervals are constructed;
//! everything downstream reads them.
//!
//! Rules:
//! - A second apply before the remove is a refresh, not a new instance.
//! - A remove without a recorded apply is dropped.
//! - An effect still active when the stream ends persists to encounter end.

mod index;


use hashbrown::HashMap;
use tempo_types::{ActorId, EffectEvent, EffectId, EffectInterval, IntervalMap};

pub use index::IntervalIndex;

/// An instance that has been applied and not yet removed.
#[derive(Debug, Clone, Copy)]
struct OpenInstance {
    start: i64,
    source_id: Option<ActorId>,
}

/// Build intervals grouped by effect id, each list sorted by start.
///
/// The remove event's source is credited when it has one, otherwise the
/// source of the apply that opened the instance.
pub fn build_intervals(events: &[EffectEvent], encounter_end: i64) -> IntervalMap {
    let mut ordered: Vec<&EffectEvent> = events.iter().collect();
    // Stable: same-timestamp events keep their input order
    ordered.sort_by_key(|e| e.timestamp);

    let mut open: HashMap<(EffectId, ActorId), OpenInstance> = HashMap::new();
    let mut intervals = IntervalMap::new();
    let mut unmatched_removes = 0usize;

    for event in ordered {
        let key = (event.effect_id, event.target_id);

        if event.kind.opens() {
            open.entry(key).or_insert(OpenInstance {
                start: event.timestamp,
                source_id: event.source_id,
            });
        } else if event.kind.closes() {
            let Some(instance) = open.remove(&key) else {
                unmatched_removes += 1;
                continue;
            };
            intervals.entry(event.effect_id).or_default().push(EffectInterval {
                start: instance.start,
                end: event.timestamp,
                target_id: event.target_id,
                source_id: event.source_id.or(instance.source_id),
            });
        }
    }

    let unremoved = open.len();
    for ((effect_id, target_id), instance) in open {
        intervals.entry(effect_id).or_default().push(EffectInterval {
            start: instance.start,
            end: encounter_end,
            target_id,
            source_id: instance.source_id,
        });
    }

    let mut inverted = 0usize;
    for list in intervals.values_mut() {
        let before = list.len();
        list.retain(|interval| interval.end >= interval.start);
        inverted += before - list.len();
        list.sort_by_key(|interval| (interval.start, interval.target_id));
    }
    intervals.retain(|_, list| !list.is_empty());

    tracing::debug!(
        events = events.len(),
        effects = intervals.len(),
        unmatched_removes,
        unremoved,
        inverted,
        "Built effect intervals"
    );

    intervals
}

/// Distinct targets that have at least one interval of `effect_id`.
pub fn targets_of(intervals: &IntervalMap, effect_id: EffectId) -> Vec<ActorId> {
    let mut targets: Vec<ActorId> = intervals
        .get(&effect_id)
        .map(|list| list.iter().map(|i| i.target_id).collect())
        .unwrap_or_default();
    targets.sort_unstable();
    targets.dedup();
    targets
}
