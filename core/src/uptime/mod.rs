//! Effect uptime aggregation
//!
//! Clips intervals to the queried bounds, groups them per target and averages
//! the per-target uptime. The divisor is either the number of targets that
//! have data or a caller-supplied target count, so an effect that only
//! reached some of the intended targets reports a diluted average.

use hashbrown::{HashMap, HashSet};
use tempo_types::{
    ActorId, EffectId, EffectInterval, EffectMetadata, IntervalMap, TimeBounds, UptimeOptions,
    UptimeResult,
};

use crate::error::EngineError;

#[cfg(test)]
mod uptime_tests;

/// Clipped duration and application count for one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TargetTotals {
    pub duration_ms: i64,
    pub applications: u32,
}

/// Compute averaged uptime for every allow-listed effect that has intervals.
///
/// Results are sorted by uptime percentage, highest first; equal percentages
/// keep allow-list order. Missing interval data or a zero-length range give an
/// empty list.
pub fn compute_uptime(
    intervals: Option<&IntervalMap>,
    options: &UptimeOptions,
) -> Result<Vec<UptimeResult>, EngineError> {
    EngineError::check_bounds(&options.bounds)?;

    let Some(intervals) = intervals else {
        return Ok(Vec::new());
    };
    let total_ms = options.bounds.duration_ms();
    if total_ms == 0 {
        return Ok(Vec::new());
    }

    let sources: Option<HashSet<ActorId>> = options
        .source_ids
        .as_ref()
        .map(|ids| ids.iter().copied().collect());
    let targets: Option<HashSet<ActorId>> = options
        .target_ids
        .as_ref()
        .map(|ids| ids.iter().copied().collect());

    let mut seen: HashSet<EffectId> = HashSet::new();
    let mut results = Vec::new();

    for &effect_id in &options.effect_ids {
        if !seen.insert(effect_id) {
            continue;
        }
        let Some(list) = intervals.get(&effect_id).filter(|list| !list.is_empty()) else {
            continue;
        };

        let per_target = totals_by_target(
            list.iter().filter(|interval| {
                passes_filters(interval, sources.as_ref(), targets.as_ref())
            }),
            &options.bounds,
        );
        if per_target.is_empty() {
            continue;
        }

        let divisor = options
            .target_count
            .filter(|&count| count > 0)
            .unwrap_or(per_target.len());

        let metadata = match options.metadata.get(&effect_id) {
            Some(metadata) => metadata.clone(),
            None => {
                tracing::trace!(effect_id, "No metadata for effect, using placeholder");
                EffectMetadata::placeholder(effect_id)
            }
        };

        let result = averaged_result(effect_id, &metadata, per_target.values(), divisor, total_ms);
        if result.uptime_percentage > 0.0 {
            results.push(result);
        }
    }

    // sort_by is stable, so ties keep allow-list order
    results.sort_by(|a, b| b.uptime_percentage.total_cmp(&a.uptime_percentage));
    Ok(results)
}

/// Intervals lacking a source always pass the source filter.
fn passes_filters(
    interval: &EffectInterval,
    sources: Option<&HashSet<ActorId>>,
    targets: Option<&HashSet<ActorId>>,
) -> bool {
    let source_ok = match (sources, interval.source_id) {
        (Some(sources), Some(source)) => sources.contains(&source),
        _ => true,
    };
    let target_ok = targets.is_none_or(|targets| targets.contains(&interval.target_id));
    source_ok && target_ok
}

/// Clip each interval to `bounds` and sum per target. Non-positive clips are discarded.
pub(crate) fn totals_by_target<'a>(
    intervals: impl Iterator<Item = &'a EffectInterval>,
    bounds: &TimeBounds,
) -> HashMap<ActorId, TargetTotals> {
    let mut per_target: HashMap<ActorId, TargetTotals> = HashMap::new();
    for interval in intervals {
        let Some((start, end)) = bounds.clip(interval.start, interval.end) else {
            continue;
        };
        let totals = per_target.entry(interval.target_id).or_default();
        totals.duration_ms += end - start;
        totals.applications += 1;
    }
    per_target
}

/// Average per-target totals over `divisor` targets into a result row.
pub(crate) fn averaged_result<'a>(
    effect_id: EffectId,
    metadata: &EffectMetadata,
    totals: impl Iterator<Item = &'a TargetTotals>,
    divisor: usize,
    total_ms: i64,
) -> UptimeResult {
    let (duration_ms, applications) = totals.fold((0i64, 0u64), |(d, a), t| {
        (d + t.duration_ms, a + u64::from(t.applications))
    });
    let divisor = divisor.max(1) as f64;
    let avg_duration_ms = duration_ms as f64 / divisor;

    UptimeResult {
        effect_id,
        display_name: metadata.name.clone(),
        icon: metadata.icon.clone(),
        total_duration_ms: avg_duration_ms,
        uptime_seconds: avg_duration_ms / 1000.0,
        uptime_percentage: avg_duration_ms / total_ms as f64 * 100.0,
        application_count: (applications as f64 / divisor).round() as u32,
        is_debuff: metadata.is_debuff,
        hostility: metadata.hostility,
    }
}
