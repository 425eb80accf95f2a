//! Static and dynamic parts of a sampled metric.

use tempo_types::{ActorBuild, ActorId, EffectContribution, MetricDefinition};

use crate::intervals::IntervalIndex;

/// Everything that doesn't change during the encounter: base value, gear and passives.
pub fn static_component(definition: &MetricDefinition, build: &ActorBuild) -> f64 {
    let gear: f64 = build.gear.iter().map(|item| item.value).sum();
    let passives: f64 = definition
        .passives
        .iter()
        .filter(|(name, _)| build.passives.iter().any(|owned| owned == *name))
        .map(|(_, value)| value)
        .sum();
    definition.base + gear + passives
}

/// Effect-driven value at `timestamp`: the actor's active buffs plus the best
/// debuff total among `debuff_targets`.
pub fn dynamic_component(
    definition: &MetricDefinition,
    index: &IntervalIndex<'_>,
    actor_id: ActorId,
    debuff_targets: &[ActorId],
    timestamp: i64,
) -> f64 {
    let buffs = active_total(&definition.buffs, index, actor_id, actor_id, timestamp);
    let debuffs = debuff_targets
        .iter()
        .map(|&target| active_total(&definition.debuffs, index, actor_id, target, timestamp))
        .reduce(f64::max)
        .unwrap_or(0.0);
    buffs + debuffs
}

/// Sum of contributions whose effect is up on `target_id`. Own-only
/// contributions need an interval credited to `actor_id`.
fn active_total(
    contributions: &[EffectContribution],
    index: &IntervalIndex<'_>,
    actor_id: ActorId,
    target_id: ActorId,
    timestamp: i64,
) -> f64 {
    contributions
        .iter()
        .filter(|c| {
            let source = c.only_own.then_some(actor_id);
            index.is_active(c.effect_id, target_id, timestamp, source)
        })
        .map(|c| c.value)
        .sum()
}
