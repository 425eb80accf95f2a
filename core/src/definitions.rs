//! Named stack families and metrics
//!
//! Callers can refer to a stack family or a sampled metric by name instead of
//! spelling it out in every request. Definitions live in a TOML file with
//! `[[stack]]` and `[[metric]]` tables.

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tempo_types::{MetricDefinition, StackModelSpec};

use crate::error::{DefinitionError, EngineError};

/// A stack family with a name to look it up by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDefinition {
    pub name: String,
    #[serde(flatten)]
    pub spec: StackModelSpec,
}

// ═══════════════════════════════════════════════════════════════════════════
// Config File Structure
// ═══════════════════════════════════════════════════════════════════════════

/// Root structure of a definitions file (TOML)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionConfig {
    #[serde(default, rename = "stack")]
    pub stacks: Vec<StackDefinition>,

    #[serde(default, rename = "metric")]
    pub metrics: Vec<MetricDefinition>,
}

/// Validated definitions, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    stacks: HashMap<String, StackModelSpec>,
    metrics: HashMap<String, MetricDefinition>,
    origin: Option<PathBuf>,
}

impl DefinitionSet {
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let content = fs::read_to_string(path).map_err(|source| DefinitionError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::from_toml(&content, path)?;
        tracing::info!(
            path = %path.display(),
            stacks = set.stacks.len(),
            metrics = set.metrics.len(),
            "Loaded definitions"
        );
        Ok(set)
    }

    /// Parse and validate definitions. `origin` only labels errors.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, DefinitionError> {
        let config: DefinitionConfig =
            toml::from_str(content).map_err(|source| DefinitionError::ParseToml {
                path: origin.to_path_buf(),
                source,
            })?;
        Self::from_config(config, origin)
    }

    pub fn from_config(config: DefinitionConfig, origin: &Path) -> Result<Self, DefinitionError> {
        let invalid = |reason: String| DefinitionError::Invalid {
            path: origin.to_path_buf(),
            reason,
        };

        let mut stacks = HashMap::new();
        for definition in config.stacks {
            check_name("stack", &definition.name, stacks.contains_key(&definition.name))
                .map_err(invalid)?;
            check_stack(&definition).map_err(invalid)?;
            stacks.insert(definition.name, definition.spec);
        }

        let mut metrics = HashMap::new();
        for definition in config.metrics {
            check_name("metric", &definition.name, metrics.contains_key(&definition.name))
                .map_err(invalid)?;
            check_metric(&definition).map_err(invalid)?;
            metrics.insert(definition.name.clone(), definition);
        }

        Ok(Self {
            stacks,
            metrics,
            origin: Some(origin.to_path_buf()),
        })
    }

    pub fn stack(&self, name: &str) -> Result<&StackModelSpec, EngineError> {
        self.stacks
            .get(name)
            .ok_or_else(|| EngineError::UnknownStackFamily {
                name: name.to_string(),
            })
    }

    pub fn metric(&self, name: &str) -> Result<&MetricDefinition, EngineError> {
        self.metrics
            .get(name)
            .ok_or_else(|| EngineError::UnknownMetric {
                name: name.to_string(),
            })
    }

    pub fn stack_names(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// File the definitions were read from.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

fn check_name(kind: &str, name: &str, taken: bool) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{kind} definition with an empty name"));
    }
    if taken {
        return Err(format!("duplicate {kind} definition '{name}'"));
    }
    Ok(())
}

fn check_stack(definition: &StackDefinition) -> Result<(), String> {
    let name = &definition.name;
    match &definition.spec {
        StackModelSpec::Decay { effect_ids } => {
            if effect_ids.is_empty() {
                return Err(format!("stack '{name}' lists no effect ids"));
            }
        }
        StackModelSpec::Refresh {
            trigger_ids,
            duration_ms,
            max_stacks,
            ..
        } => {
            if trigger_ids.is_empty() {
                return Err(format!("stack '{name}' lists no trigger ids"));
            }
            if *duration_ms <= 0 {
                return Err(format!("stack '{name}' needs a positive duration_ms"));
            }
            if *max_stacks == 0 {
                return Err(format!("stack '{name}' needs max_stacks of at least 1"));
            }
        }
        StackModelSpec::CoOccurrence { max_stacks, .. } => {
            if *max_stacks == 0 {
                return Err(format!("stack '{name}' needs max_stacks of at least 1"));
            }
        }
    }
    Ok(())
}

fn check_metric(definition: &MetricDefinition) -> Result<(), String> {
    if !definition.cap.is_finite() {
        return Err(format!("metric '{}' needs a finite cap", definition.name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_types::TriggerKind;

    const EXAMPLE: &str = r#"
[[stack]]
name = "elemental_catalyst"
model = "decay"
effect_ids = [142610, 142652, 142653]

[[stack]]
name = "stagger"
model = "refresh"
trigger_ability_ids = [134336]
duration_ms = 6000
max_stacks = 3

[[stack]]
name = "touch_of_zen"
model = "co_occurrence"
marker_effect_id = 126597
max_stacks = 5

[[metric]]
name = "penetration"
base = 0
cap = 18200
buffs = [{ effect_id = 61744, value = 2974 }]
debuffs = [{ effect_id = 61743, value = 5948 }, { effect_id = 17906, value = 2108, only_own = true }]
passives = { "piercing" = 700 }
"#;

    fn origin() -> &'static Path {
        Path::new("definitions.toml")
    }

    #[test]
    fn parses_every_model() {
        let set = DefinitionSet::from_toml(EXAMPLE, origin()).unwrap();

        assert_eq!(
            set.stack("elemental_catalyst").unwrap(),
            &StackModelSpec::Decay {
                effect_ids: vec![142610, 142652, 142653]
            }
        );
        assert_eq!(
            set.stack("stagger").unwrap(),
            &StackModelSpec::Refresh {
                trigger_ids: vec![134336],
                trigger_kind: TriggerKind::Damage,
                duration_ms: 6000,
                max_stacks: 3,
            }
        );
        assert_eq!(
            set.stack("touch_of_zen").unwrap(),
            &StackModelSpec::CoOccurrence {
                marker_effect_id: 126597,
                max_stacks: 5,
                dot_ability_ids: None,
            }
        );

        let metric = set.metric("penetration").unwrap();
        assert_eq!(metric.cap, 18200.0);
        assert_eq!(metric.buffs.len(), 1);
        assert!(metric.debuffs[1].only_own);
        assert_eq!(metric.passives.get("piercing"), Some(&700.0));
        assert_eq!(set.origin(), Some(origin()));
    }

    #[test]
    fn unknown_names_are_engine_errors() {
        let set = DefinitionSet::from_toml(EXAMPLE, origin()).unwrap();
        assert!(matches!(
            set.stack("missing"),
            Err(EngineError::UnknownStackFamily { name }) if name == "missing"
        ));
        assert!(matches!(
            set.metric("missing"),
            Err(EngineError::UnknownMetric { .. })
        ));
    }

    #[test]
    fn empty_file_is_valid() {
        let set = DefinitionSet::from_toml("", origin()).unwrap();
        assert_eq!(set.stack_names().count(), 0);
        assert_eq!(set.metric_names().count(), 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let toml = r#"
[[stack]]
name = "dup"
model = "decay"
effect_ids = [1]

[[stack]]
name = "dup"
model = "decay"
effect_ids = [2]
"#;
        let err = DefinitionSet::from_toml(toml, origin()).unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::Invalid { reason, .. } if reason.contains("duplicate")
        ));
    }

    #[test]
    fn zero_cap_is_rejected() {
        let toml = r#"
[[stack]]
name = "zen"
model = "co_occurrence"
marker_effect_id = 1
max_stacks = 0
"#;
        assert!(matches!(
            DefinitionSet::from_toml(toml, origin()),
            Err(DefinitionError::Invalid { .. })
        ));
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let toml = r#"
[[stack]]
name = "stagger"
model = "refresh"
trigger_ids = [1]
duration_ms = 0
max_stacks = 3
"#;
        assert!(matches!(
            DefinitionSet::from_toml(toml, origin()),
            Err(DefinitionError::Invalid { .. })
        ));
    }

    #[test]
    fn unknown_model_is_a_parse_error() {
        let toml = r#"
[[stack]]
name = "odd"
model = "pulse"
"#;
        assert!(matches!(
            DefinitionSet::from_toml(toml, origin()),
            Err(DefinitionError::ParseToml { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = Path::new("/nonexistent/tempo/definitions.toml");
        let err = DefinitionSet::load(path).unwrap_err();
        assert!(matches!(err, DefinitionError::ReadFile { .. }));
    }
}
