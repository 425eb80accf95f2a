//! Refresh/counter stacking: every trigger adds a stack up to a cap and pushes
//! the expiry back to `trigger + duration`. Silence longer than the duration
//! drops the counter to zero.

use tempo_types::{AbilityId, ActorId, DamageEvent, EffectEvent, EffectId, TimeBounds};

use super::{StackModel, StackTimeline};
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct RefreshStackModel {
    /// Sorted trigger timestamps
    triggers: Vec<i64>,
    duration_ms: i64,
    max_stacks: u32,
}

impl RefreshStackModel {
    pub fn new(
        mut triggers: Vec<i64>,
        duration_ms: i64,
        max_stacks: u32,
    ) -> Result<Self, EngineError> {
        if max_stacks == 0 {
            return Err(EngineError::InvalidStackCap);
        }
        if duration_ms <= 0 {
            return Err(EngineError::InvalidStackDuration { duration_ms });
        }
        triggers.sort_unstable();
        Ok(Self {
            triggers,
            duration_ms,
            max_stacks,
        })
    }

    pub fn triggers(&self) -> &[i64] {
        &self.triggers
    }

    /// The counter timeline, before clipping.
    pub fn timeline(&self, bounds: TimeBounds) -> StackTimeline {
        let mut timeline = StackTimeline::new();
        let mut count = 0u32;
        let mut previous: Option<i64> = None;

        for &trigger in &self.triggers {
            if let Some(previous) = previous
                && trigger - previous > self.duration_ms
            {
                timeline.push(previous + self.duration_ms, 0);
                count = 0;
            }
            count = (count + 1).min(self.max_stacks);
            timeline.push(trigger, count);
            previous = Some(trigger);
        }

        // A still-running expiry past the range is closed by clipping instead
        if let Some(last) = previous {
            let expiry = last + self.duration_ms;
            if expiry < bounds.end {
                timeline.push(expiry, 0);
            }
        }

        timeline
    }
}

impl StackModel for RefreshStackModel {
    fn max_level(&self) -> u32 {
        self.max_stacks
    }

    fn timelines(&self, bounds: TimeBounds) -> Vec<StackTimeline> {
        if self.triggers.is_empty() {
            return Vec::new();
        }
        vec![self.timeline(bounds)]
    }
}

/// Trigger timestamps from damage landing on `target_id` with one of `ability_ids`.
pub fn triggers_from_damage(
    events: &[DamageEvent],
    ability_ids: &[AbilityId],
    target_id: ActorId,
    source_ids: Option<&[ActorId]>,
) -> Vec<i64> {
    events
        .iter()
        .filter(|e| e.target_id == target_id && ability_ids.contains(&e.ability_id))
        .filter(|e| source_ids.is_none_or(|sources| sources.contains(&e.source_id)))
        .map(|e| e.timestamp)
        .collect()
}

/// Trigger timestamps from applies (and apply-stacks) of `effect_ids` on `target_id`.
///
/// Events without a source never match an explicit source list.
pub fn triggers_from_effects(
    events: &[EffectEvent],
    effect_ids: &[EffectId],
    target_id: ActorId,
    source_ids: Option<&[ActorId]>,
) -> Vec<i64> {
    events
        .iter()
        .filter(|e| e.kind.opens())
        .filter(|e| e.target_id == target_id && effect_ids.contains(&e.effect_id))
        .filter(|e| {
            source_ids.is_none_or(|sources| e.source_id.is_some_and(|s| sources.contains(&s)))
        })
        .map(|e| e.timestamp)
        .collect()
}
