//! Tests for uptime aggregation
//!
//! Verifies that:
//! - Durations are clipped to the queried bounds and summed per target
//! - Averaging honours an explicit target count (diluted averages)
//! - Filters, metadata fallback and ordering behave as documented

use std::collections::BTreeMap;

use tempo_types::{
    EffectInterval, EffectMetadata, Hostility, IntervalMap, TimeBounds, UptimeOptions,
};

use super::compute_uptime;
use crate::error::EngineError;

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn span(start: i64, end: i64, target_id: i64) -> EffectInterval {
    EffectInterval {
        start,
        end,
        target_id,
        source_id: None,
    }
}

fn sourced(start: i64, end: i64, target_id: i64, source_id: i64) -> EffectInterval {
    EffectInterval {
        source_id: Some(source_id),
        ..span(start, end, target_id)
    }
}

fn options(effect_ids: Vec<i64>, start: i64, end: i64) -> UptimeOptions {
    UptimeOptions {
        effect_ids,
        source_ids: None,
        target_ids: None,
        bounds: TimeBounds::new(start, end),
        target_count: None,
        metadata: BTreeMap::new(),
    }
}

fn map(entries: Vec<(i64, Vec<EffectInterval>)>) -> IntervalMap {
    entries.into_iter().collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Core Arithmetic
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_single_interval_is_half_uptime() {
    let intervals = map(vec![(5, vec![span(1000, 6000, 1)])]);
    let mut opts = options(vec![5], 0, 10_000);
    opts.target_ids = Some(vec![1]);

    let results = compute_uptime(Some(&intervals), &opts).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].uptime_percentage, 50.0);
    assert_eq!(results[0].application_count, 1);
    assert_eq!(results[0].total_duration_ms, 5000.0);
    assert_eq!(results[0].uptime_seconds, 5.0);
}

#[test]
fn test_two_intervals_sum_duration_and_applications() {
    let intervals = map(vec![(5, vec![span(1000, 3000, 1), span(5000, 8000, 1)])]);
    let results = compute_uptime(Some(&intervals), &options(vec![5], 0, 20_000)).unwrap();

    assert_eq!(results[0].total_duration_ms, 5000.0);
    assert_eq!(results[0].application_count, 2);
    assert_eq!(results[0].uptime_percentage, 25.0);
}

#[test]
fn test_explicit_target_count_dilutes_average() {
    let intervals = map(vec![(5, vec![span(0, 5000, 1)])]);
    let mut opts = options(vec![5], 0, 10_000);
    opts.target_count = Some(2);

    let results = compute_uptime(Some(&intervals), &opts).unwrap();

    assert_eq!(results[0].uptime_percentage, 25.0);
}

#[test]
fn test_average_over_targets_with_data() {
    let intervals = map(vec![(5, vec![span(0, 10_000, 1), span(0, 5000, 2)])]);
    let results = compute_uptime(Some(&intervals), &options(vec![5], 0, 10_000)).unwrap();

    assert_eq!(results[0].uptime_percentage, 75.0);
    assert_eq!(results[0].application_count, 1);
}

#[test]
fn test_intervals_are_clipped_to_bounds() {
    let intervals = map(vec![(5, vec![span(-2000, 2000, 1), span(9000, 14_000, 1)])]);
    let results = compute_uptime(Some(&intervals), &options(vec![5], 0, 10_000)).unwrap();

    assert_eq!(results[0].total_duration_ms, 3000.0);
    assert_eq!(results[0].application_count, 2);
}

#[test]
fn test_empty_and_inverted_intervals_contribute_nothing() {
    let intervals = map(vec![(5, vec![span(4000, 4000, 1), span(6000, 5000, 1)])]);
    let results = compute_uptime(Some(&intervals), &options(vec![5], 0, 10_000)).unwrap();

    assert!(results.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Degradation
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_intervals_yield_empty() {
    assert!(compute_uptime(None, &options(vec![5], 0, 10_000)).unwrap().is_empty());
}

#[test]
fn test_zero_duration_bounds_yield_empty() {
    let intervals = map(vec![(5, vec![span(0, 5000, 1)])]);
    assert!(compute_uptime(Some(&intervals), &options(vec![5], 3000, 3000)).unwrap().is_empty());
}

#[test]
fn test_inverted_bounds_are_a_request_error() {
    let intervals = map(vec![(5, vec![span(0, 5000, 1)])]);
    let err = compute_uptime(Some(&intervals), &options(vec![5], 5000, 1000)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidBounds { start: 5000, end: 1000 }));
}

#[test]
fn test_unknown_effect_uses_placeholder_name() {
    let intervals = map(vec![(42, vec![span(0, 5000, 1)])]);
    let results = compute_uptime(Some(&intervals), &options(vec![42], 0, 10_000)).unwrap();

    assert_eq!(results[0].display_name, "Unknown (42)");
    assert!(!results[0].is_debuff);
}

#[test]
fn test_metadata_is_copied_onto_result() {
    let intervals = map(vec![(42, vec![span(0, 5000, 1)])]);
    let mut opts = options(vec![42], 0, 10_000);
    opts.metadata.insert(
        42,
        EffectMetadata {
            name: "Major Breach".to_string(),
            icon: Some("ability_debuff_major_breach".to_string()),
            is_debuff: true,
            hostility: Hostility::Hostile,
        },
    );

    let results = compute_uptime(Some(&intervals), &opts).unwrap();

    assert_eq!(results[0].display_name, "Major Breach");
    assert_eq!(results[0].icon.as_deref(), Some("ability_debuff_major_breach"));
    assert!(results[0].is_debuff);
    assert_eq!(results[0].hostility, Hostility::Hostile);
}

// ═══════════════════════════════════════════════════════════════════════════
// Filters & Ordering
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_effects_outside_allow_list_are_skipped() {
    let intervals = map(vec![(5, vec![span(0, 5000, 1)]), (6, vec![span(0, 9000, 1)])]);
    let results = compute_uptime(Some(&intervals), &options(vec![5], 0, 10_000)).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].effect_id, 5);
}

#[test]
fn test_source_filter_passes_unattributed_intervals() {
    let intervals = map(vec![(
        5,
        vec![sourced(0, 1000, 1, 7), sourced(2000, 3000, 1, 8), span(4000, 5000, 1)],
    )]);
    let mut opts = options(vec![5], 0, 10_000);
    opts.source_ids = Some(vec![7]);

    let results = compute_uptime(Some(&intervals), &opts).unwrap();

    assert_eq!(results[0].total_duration_ms, 2000.0);
    assert_eq!(results[0].application_count, 2);
}

#[test]
fn test_target_filter_excludes_other_targets() {
    let intervals = map(vec![(5, vec![span(0, 1000, 1), span(0, 9000, 2)])]);
    let mut opts = options(vec![5], 0, 10_000);
    opts.target_ids = Some(vec![1]);

    let results = compute_uptime(Some(&intervals), &opts).unwrap();

    assert_eq!(results[0].uptime_percentage, 10.0);
}

#[test]
fn test_results_sorted_descending_with_stable_ties() {
    let intervals = map(vec![
        (1, vec![span(0, 2000, 1)]),
        (2, vec![span(0, 8000, 1)]),
        (3, vec![span(0, 2000, 1)]),
    ]);
    let results = compute_uptime(Some(&intervals), &options(vec![3, 1, 2], 0, 10_000)).unwrap();

    let order: Vec<i64> = results.iter().map(|r| r.effect_id).collect();
    assert_eq!(order, vec![2, 3, 1]);
}

#[test]
fn test_duplicate_allow_list_entries_report_once() {
    let intervals = map(vec![(5, vec![span(0, 5000, 1)])]);
    let results = compute_uptime(Some(&intervals), &options(vec![5, 5], 0, 10_000)).unwrap();

    assert_eq!(results.len(), 1);
}

#[test]
fn test_repeated_calls_are_identical() {
    let intervals = map(vec![(5, vec![span(100, 5000, 1), span(300, 7000, 2)])]);
    let opts = options(vec![5], 0, 10_000);

    let first = compute_uptime(Some(&intervals), &opts).unwrap();
    let second = compute_uptime(Some(&intervals), &opts).unwrap();
    assert_eq!(first, second);
}
