//! Time-sampled metrics
//!
//! Samples a scalar per actor at a fixed step across the encounter. Each
//! sample is a static part (computed once per actor) plus a dynamic part read
//! from the interval index at that instant. The series is then reduced to a
//! handful of summary numbers, with active-combat samples weighed separately
//! from idle ones.

mod components;


use tempo_types::{
    ActorId, ActorMetricSeries, CombatSegment, IntervalMap, MetricDefinition, MetricRequest,
    MetricSample,
};

use crate::activity::is_active_at;
use crate::error::EngineError;
use crate::intervals::IntervalIndex;
use crate::progress::Progress;

pub use components::{dynamic_component, static_component};

/// Share of progress spent on the static precompute.
const STATIC_PHASE_END: f32 = 0.5;

/// Sample `definition` for every actor in the request.
///
/// Samples are taken at `start, start + step, ...` strictly before `end`.
/// `segments` is the active-combat partition used to flag samples.
pub fn sample_metric(
    definition: &MetricDefinition,
    request: &MetricRequest,
    intervals: &IntervalMap,
    segments: &[CombatSegment],
    step_ms: i64,
    progress: &mut Progress<'_>,
) -> Result<Vec<ActorMetricSeries>, EngineError> {
    EngineError::check_bounds(&request.bounds)?;
    EngineError::check_step("sample_step_ms", step_ms)?;

    let actors = &request.actors;
    let mut static_values = Vec::with_capacity(actors.len());
    for (i, build) in actors.iter().enumerate() {
        static_values.push(static_component(definition, build));
        progress.report_phase(0.0, STATIC_PHASE_END, i + 1, actors.len());
    }

    let bounds = request.bounds;
    let timestamps: Vec<i64> = sample_times(bounds.start, bounds.end, step_ms).collect();
    let index = IntervalIndex::new(intervals);
    let mut samples: Vec<Vec<MetricSample>> = actors
        .iter()
        .map(|_| Vec::with_capacity(timestamps.len()))
        .collect();

    for (step, &timestamp) in timestamps.iter().enumerate() {
        let active = is_active_at(segments, timestamp);
        for ((build, base), series) in actors.iter().zip(&static_values).zip(&mut samples) {
            let dynamic = dynamic_component(
                definition,
                &index,
                build.actor_id,
                &request.debuff_target_ids,
                timestamp,
            );
            series.push(MetricSample {
                timestamp,
                value: base + dynamic,
                active,
            });
        }
        progress.report_phase(STATIC_PHASE_END, 1.0, step + 1, timestamps.len());
    }
    progress.finish();

    tracing::debug!(
        metric = %definition.name,
        actors = actors.len(),
        samples = timestamps.len(),
        "Sampled metric"
    );

    Ok(actors
        .iter()
        .zip(static_values)
        .zip(samples)
        .map(|((build, static_value), samples)| {
            summarize(build.actor_id, static_value, samples, definition.cap)
        })
        .collect())
}

fn sample_times(start: i64, end: i64, step_ms: i64) -> impl Iterator<Item = i64> {
    std::iter::successors(Some(start), move |t| Some(t + step_ms))
        .take_while(move |&t| t < end)
}

/// Reduce a sampled series to its summary numbers.
///
/// The effective average and the at-cap share look at active samples only.
/// Without active samples the effective average falls back to every sample,
/// while the at-cap share is zero.
pub fn summarize(
    actor_id: ActorId,
    static_value: f64,
    samples: Vec<MetricSample>,
    cap: f64,
) -> ActorMetricSeries {
    let mean = |values: &[f64]| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    let at_cap = |values: &[f64]| {
        if values.is_empty() {
            0.0
        } else {
            let capped = values.iter().filter(|&&v| v >= cap).count();
            capped as f64 / values.len() as f64 * 100.0
        }
    };

    let all: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let active: Vec<f64> = samples.iter().filter(|s| s.active).map(|s| s.value).collect();
    let effective = if active.is_empty() { &all } else { &active };

    ActorMetricSeries {
        actor_id,
        static_value,
        max_value: all.iter().copied().reduce(f64::max).unwrap_or(0.0),
        average: mean(&all),
        effective_average: mean(effective),
        percent_at_cap: at_cap(&active),
        active_samples: active.len(),
        samples,
    }
}
