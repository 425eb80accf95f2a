//! Request dispatch
//!
//! One [`AnalysisRequest`] in, one [`AnalysisResponse`] out. Every request is
//! computed from scratch over its own event batch; nothing carries over
//! between calls.

use std::time::Instant;

use tempo_types::{
    AnalysisJob, AnalysisRequest, AnalysisResponse, EventBatch, IntervalMap, MetricDefinition,
    MetricSelector, StackModelSpec, StackSelector, StackUptimeRequest, StackUptimeResult,
    TriggerKind,
};

use crate::activity::find_active_intervals;
use crate::config::EngineConfig;
use crate::definitions::DefinitionSet;
use crate::error::EngineError;
use crate::intervals::build_intervals;
use crate::progress::Progress;
use crate::sampling::sample_metric;
use crate::stacks::{
    CoOccurrenceParams, CoOccurrenceStackModel, DecayStackModel, RefreshStackModel,
    StackUptimeOptions, compute_stack_uptime, triggers_from_damage, triggers_from_effects,
};
use crate::uptime::compute_uptime;

/// Run one request to completion.
///
/// `config` supplies thresholds the request doesn't override; `definitions`
/// resolves stack families and metrics referenced by name. The callback, if
/// any, sees progress in `[0.0, 1.0]` and always ends on `1.0`.
pub fn run_request(
    request: &AnalysisRequest,
    config: &EngineConfig,
    definitions: Option<&DefinitionSet>,
    callback: Option<&mut dyn FnMut(f32)>,
) -> Result<AnalysisResponse, EngineError> {
    let config = config.with_overrides(&request.overrides);
    config.validate()?;

    let mut progress = Progress::new(callback);
    let started = Instant::now();
    let batch = &request.batch;

    let response = match &request.job {
        AnalysisJob::Intervals { encounter_end } => AnalysisResponse::Intervals {
            intervals: build_intervals(&batch.effect_events, *encounter_end),
        },
        AnalysisJob::Uptime { options } => {
            EngineError::check_bounds(&options.bounds)?;
            let intervals = build_intervals(&batch.effect_events, options.bounds.end);
            AnalysisResponse::Uptime {
                results: compute_uptime(Some(&intervals), options)?,
            }
        }
        AnalysisJob::StackUptime { request } => AnalysisResponse::StackUptime {
            results: run_stack_uptime(request, batch, &config, definitions)?,
        },
        AnalysisJob::ActiveCombat { bounds, target_ids } => {
            EngineError::check_bounds(bounds)?;
            AnalysisResponse::ActiveCombat {
                segments: find_active_intervals(
                    &batch.damage_events,
                    *bounds,
                    target_ids.as_deref(),
                    config.idle_threshold_ms,
                ),
            }
        }
        AnalysisJob::Metric { request } => {
            EngineError::check_bounds(&request.bounds)?;
            let definition = resolve_metric(&request.metric, definitions)?;
            let intervals = build_intervals(&batch.effect_events, request.bounds.end);
            let segments = find_active_intervals(
                &batch.damage_events,
                request.bounds,
                request.activity_target_ids.as_deref(),
                config.idle_threshold_ms,
            );
            AnalysisResponse::Metric {
                series: sample_metric(
                    definition,
                    request,
                    &intervals,
                    &segments,
                    config.sample_step_ms,
                    &mut progress,
                )?,
            }
        }
    };

    progress.finish();
    tracing::debug!(
        job = job_name(&request.job),
        effect_events = batch.effect_events.len(),
        damage_events = batch.damage_events.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request complete"
    );

    Ok(response)
}

fn job_name(job: &AnalysisJob) -> &'static str {
    match job {
        AnalysisJob::Intervals { .. } => "intervals",
        AnalysisJob::Uptime { .. } => "uptime",
        AnalysisJob::StackUptime { .. } => "stack_uptime",
        AnalysisJob::ActiveCombat { .. } => "active_combat",
        AnalysisJob::Metric { .. } => "metric",
    }
}

fn resolve_stack<'a>(
    selector: &'a StackSelector,
    definitions: Option<&'a DefinitionSet>,
) -> Result<&'a StackModelSpec, EngineError> {
    match selector {
        StackSelector::Inline(spec) => Ok(spec),
        StackSelector::Named(name) => match definitions {
            Some(definitions) => definitions.stack(name),
            None => Err(EngineError::UnknownStackFamily { name: name.clone() }),
        },
    }
}

fn resolve_metric<'a>(
    selector: &'a MetricSelector,
    definitions: Option<&'a DefinitionSet>,
) -> Result<&'a MetricDefinition, EngineError> {
    match selector {
        MetricSelector::Inline(definition) => Ok(definition),
        MetricSelector::Named(name) => match definitions {
            Some(definitions) => definitions.metric(name),
            None => Err(EngineError::UnknownMetric { name: name.clone() }),
        },
    }
}

fn run_stack_uptime(
    request: &StackUptimeRequest,
    batch: &EventBatch,
    config: &EngineConfig,
    definitions: Option<&DefinitionSet>,
) -> Result<Vec<StackUptimeResult>, EngineError> {
    EngineError::check_bounds(&request.bounds)?;
    let spec = resolve_stack(&request.stack, definitions)?;
    let options = StackUptimeOptions {
        bounds: request.bounds,
        effect_id: request.effect_id,
        metadata: request.metadata.as_ref(),
    };
    let sources = request.source_ids.as_deref();
    let targets = request.target_ids.as_deref();

    match spec {
        StackModelSpec::Decay { effect_ids } => {
            let intervals = intervals_for(batch, request);
            let model = DecayStackModel::new(&intervals, effect_ids)
                .with_sources(sources)
                .with_targets(targets);
            compute_stack_uptime(&model, &options)
        }
        StackModelSpec::Refresh {
            trigger_ids,
            trigger_kind,
            duration_ms,
            max_stacks,
        } => {
            let target_id = match targets {
                Some([target_id]) => *target_id,
                other => {
                    return Err(EngineError::MissingStackTarget {
                        count: other.map_or(0, <[_]>::len),
                    });
                }
            };
            let triggers = match trigger_kind {
                TriggerKind::Damage => {
                    triggers_from_damage(&batch.damage_events, trigger_ids, target_id, sources)
                }
                TriggerKind::Effect => {
                    triggers_from_effects(&batch.effect_events, trigger_ids, target_id, sources)
                }
            };
            let model = RefreshStackModel::new(triggers, *duration_ms, *max_stacks)?;
            compute_stack_uptime(&model, &options)
        }
        StackModelSpec::CoOccurrence {
            marker_effect_id,
            max_stacks,
            dot_ability_ids,
        } => {
            let intervals = intervals_for(batch, request);
            let model = CoOccurrenceStackModel::new(
                &intervals,
                &batch.damage_events,
                *marker_effect_id,
                *max_stacks,
                dot_ability_ids.as_deref(),
                CoOccurrenceParams::from_config(config),
            )?
            .with_sources(sources)
            .with_targets(targets);
            compute_stack_uptime(&model, &options)
        }
    }
}

fn intervals_for(batch: &EventBatch, request: &StackUptimeRequest) -> IntervalMap {
    build_intervals(&batch.effect_events, request.bounds.end)
}
