//! Active-combat detection
//!
//! Splits an encounter into active and idle segments from damage timestamps
//! alone. Damage that keeps landing with gaps no larger than the idle
//! threshold forms one active segment; a larger gap closes it.

use hashbrown::HashSet;
use tempo_types::{ActorId, CombatSegment, DamageEvent, TimeBounds};

/// Gap between damage events that still counts as continuous combat.
pub const DEFAULT_IDLE_THRESHOLD_MS: i64 = 1000;

/// Partition `bounds` into ordered, contiguous active/idle segments.
///
/// An active segment runs from its first damage event through the millisecond
/// of its last one. Events outside `bounds` or on targets outside the filter
/// are ignored. With no qualifying events the whole span is one idle segment.
pub fn find_active_intervals(
    damage_events: &[DamageEvent],
    bounds: TimeBounds,
    target_filter: Option<&[ActorId]>,
    idle_threshold_ms: i64,
) -> Vec<CombatSegment> {
    if bounds.duration_ms() == 0 {
        return Vec::new();
    }

    let targets: Option<HashSet<ActorId>> = target_filter.map(|ids| ids.iter().copied().collect());
    let mut timestamps: Vec<i64> = damage_events
        .iter()
        .filter(|e| targets.as_ref().is_none_or(|t| t.contains(&e.target_id)))
        .map(|e| e.timestamp)
        .filter(|&ts| bounds.contains(ts))
        .collect();
    timestamps.sort_unstable();

    let Some((&first, rest)) = timestamps.split_first() else {
        tracing::debug!(start = bounds.start, end = bounds.end, "No damage in encounter, fully idle");
        return vec![CombatSegment {
            start: bounds.start,
            end: bounds.end,
            active: false,
        }];
    };

    // (first, last) timestamps of each run of closely spaced events
    let mut runs: Vec<(i64, i64)> = Vec::new();
    let mut run = (first, first);
    for &ts in rest {
        if ts - run.1 > idle_threshold_ms {
            runs.push(run);
            run = (ts, ts);
        } else {
            run.1 = ts;
        }
    }
    runs.push(run);

    let mut segments = Vec::with_capacity(runs.len() * 2 + 1);
    let mut cursor = bounds.start;
    for (run_start, run_last) in runs {
        if run_start > cursor {
            segments.push(CombatSegment {
                start: cursor,
                end: run_start,
                active: false,
            });
        }
        let run_end = (run_last + 1).min(bounds.end);
        segments.push(CombatSegment {
            start: run_start,
            end: run_end,
            active: true,
        });
        cursor = run_end;
    }
    if cursor < bounds.end {
        segments.push(CombatSegment {
            start: cursor,
            end: bounds.end,
            active: false,
        });
    }

    segments
}

/// Whether `timestamp` falls inside an active segment.
pub fn is_active_at(segments: &[CombatSegment], timestamp: i64) -> bool {
    let idx = segments.partition_point(|s| s.end <= timestamp);
    segments
        .get(idx)
        .is_some_and(|s| s.active && s.contains(timestamp))
}

/// Total milliseconds covered by active segments.
pub fn active_duration_ms(segments: &[CombatSegment]) -> i64 {
    segments
        .iter()
        .filter(|s| s.active)
        .map(|s| s.end - s.start)
        .sum()
}
