//! Property tests for the timeline engine
//!
//! Verifies that:
//! - Clipping never grows an interval past its own length or the range length
//! - Matched apply/remove pairs give exactly one interval each, in any input order
//! - Uptime is a pure function of its inputs
//! - The refresh counter never exceeds its cap
//! - Decay per-level durations never increase with the level
//! - Active-combat segments partition the encounter

use std::collections::BTreeMap;

use proptest::prelude::*;
use tempo_core::{
    DamageEvent, DecayStackModel, EffectEvent, EffectEventKind, EffectInterval, HitType,
    IntervalMap, RefreshStackModel, StackModel, StackUptimeOptions, TimeBounds, UptimeOptions,
    build_intervals, compute_stack_uptime, compute_uptime, derive_stack_levels,
    find_active_intervals,
};

// ═══════════════════════════════════════════════════════════════════════════
// Strategies
// ═══════════════════════════════════════════════════════════════════════════

fn interval_strategy(effect_ids: Vec<i64>) -> impl Strategy<Value = (i64, EffectInterval)> {
    (
        prop::sample::select(effect_ids),
        0i64..20_000,
        0i64..8_000,
        1i64..4,
        prop::option::of(1i64..4),
    )
        .prop_map(|(effect_id, start, len, target_id, source_id)| {
            (
                effect_id,
                EffectInterval {
                    start,
                    end: start + len,
                    target_id,
                    source_id,
                },
            )
        })
}

fn interval_map(entries: Vec<(i64, EffectInterval)>) -> IntervalMap {
    let mut map: IntervalMap = BTreeMap::new();
    for (effect_id, interval) in entries {
        map.entry(effect_id).or_default().push(interval);
    }
    for list in map.values_mut() {
        list.sort_by_key(|interval| (interval.start, interval.target_id));
    }
    map
}

/// Non-overlapping `(start, end)` pairs with positive length, in order.
fn matched_pairs() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((1i64..2_000, 1i64..2_000), 1..20).prop_map(|steps| {
        let mut cursor = 0;
        steps
            .into_iter()
            .map(|(gap, len)| {
                let start = cursor + gap;
                cursor = start + len;
                (start, cursor)
            })
            .collect()
    })
}

fn effect(timestamp: i64, kind: EffectEventKind) -> EffectEvent {
    EffectEvent {
        timestamp,
        kind,
        effect_id: 1,
        source_id: Some(5),
        target_id: 9,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Properties
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clipped_never_exceeds_original_or_bounds(
        start in -10_000i64..10_000,
        len in 0i64..10_000,
        bounds_start in -5_000i64..5_000,
        bounds_len in 0i64..10_000,
    ) {
        let bounds = TimeBounds::new(bounds_start, bounds_start + bounds_len);
        if let Some((clipped_start, clipped_end)) = bounds.clip(start, start + len) {
            let clipped = clipped_end - clipped_start;
            prop_assert!(clipped > 0);
            prop_assert!(clipped <= len);
            prop_assert!(clipped <= bounds.duration_ms());
        }
    }

    #[test]
    fn matched_pairs_give_one_interval_each(
        events in matched_pairs().prop_flat_map(|pairs| {
            let mut events = vec![effect(0, EffectEventKind::Remove)];
            for &(start, end) in &pairs {
                events.push(effect(start, EffectEventKind::Apply));
                events.push(effect(end, EffectEventKind::Remove));
            }
            (Just(pairs), Just(events).prop_shuffle())
        })
    ) {
        let (pairs, events) = events;
        let intervals = build_intervals(&events, 100_000);
        let built: Vec<(i64, i64)> = intervals
            .get(&1)
            .map(|list| list.iter().map(|i| (i.start, i.end)).collect())
            .unwrap_or_default();
        prop_assert_eq!(built, pairs);
    }

    #[test]
    fn uptime_is_idempotent(
        entries in prop::collection::vec(interval_strategy(vec![1, 2, 3]), 0..40),
        target_count in prop::option::of(1usize..5),
    ) {
        let intervals = interval_map(entries);
        let options = UptimeOptions {
            effect_ids: vec![1, 2, 3],
            source_ids: None,
            target_ids: None,
            bounds: TimeBounds::new(0, 20_000),
            target_count,
            metadata: BTreeMap::new(),
        };
        let first = compute_uptime(Some(&intervals), &options).unwrap();
        let second = compute_uptime(Some(&intervals), &options).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.iter().all(|result| result.uptime_percentage > 0.0));
    }

    #[test]
    fn refresh_counter_respects_cap(
        triggers in prop::collection::vec(0i64..30_000, 0..60),
        duration_ms in 1i64..10_000,
        max_stacks in 1u32..6,
    ) {
        let bounds = TimeBounds::new(0, 30_000);
        let model = RefreshStackModel::new(triggers, duration_ms, max_stacks).unwrap();
        for timeline in model.timelines(bounds) {
            prop_assert!(timeline.max_count() <= max_stacks);
            let leveled = derive_stack_levels(&timeline, bounds, max_stacks + 2);
            prop_assert!(leveled.iter().all(|l| l.level <= max_stacks));
        }
    }

    #[test]
    fn decay_levels_are_non_increasing(
        entries in prop::collection::vec(interval_strategy(vec![10, 20, 30]), 0..40),
    ) {
        let intervals = interval_map(entries);
        let model = DecayStackModel::new(&intervals, &[10, 20, 30]);
        let options = StackUptimeOptions {
            bounds: TimeBounds::new(0, 20_000),
            effect_id: 10,
            metadata: None,
        };
        let results = compute_stack_uptime(&model, &options).unwrap();

        for (expected_level, result) in (1..).zip(&results) {
            prop_assert_eq!(result.stack_level, expected_level);
        }
        for pair in results.windows(2) {
            prop_assert!(pair[1].uptime.total_duration_ms <= pair[0].uptime.total_duration_ms);
        }
    }

    #[test]
    fn active_segments_partition_the_encounter(
        timestamps in prop::collection::vec(-1_000i64..12_000, 0..50),
        idle_threshold_ms in 0i64..3_000,
    ) {
        let damage: Vec<DamageEvent> = timestamps
            .iter()
            .map(|&timestamp| DamageEvent {
                timestamp,
                source_id: 1,
                target_id: 2,
                ability_id: 3,
                amount: 10,
                is_tick: false,
                hit_type: HitType::Normal,
            })
            .collect();
        let bounds = TimeBounds::new(0, 10_000);
        let segments = find_active_intervals(&damage, bounds, None, idle_threshold_ms);

        prop_assert!(!segments.is_empty());
        prop_assert_eq!(segments[0].start, bounds.start);
        prop_assert_eq!(segments[segments.len() - 1].end, bounds.end);
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        prop_assert!(segments.iter().all(|s| s.end > s.start));
    }
}
