//! Named pipelines and the steps they run.

use codeforge_config::Config;
use codeforge_utils::error::{ConfigError, ForgeError};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::IntoEnumIterator;

use crate::steps::{Step, StepKind};

/// The built-in pipelines.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum Pipeline {
    Default,
    Benchmark,
    Simple,
    Tdd,
    #[strum(serialize = "tdd+")]
    TddPlus,
    Clarify,
    Respec,
    UseFeedback,
    ExecuteOnly,
    Improve,
    Summary,
}

impl Pipeline {
    /// Steps of this pipeline, in execution order.
    #[must_use]
    pub fn steps(self) -> &'static [StepKind] {
        use StepKind::*;
        match self {
            Self::Default | Self::Clarify => {
                &[Clarify, GenClarifiedCode, GenEntrypoint, ExecuteEntrypoint]
            }
            Self::Benchmark => &[GenSimple, GenEntrypoint],
            Self::Simple => &[GenSimple, GenEntrypoint, ExecuteEntrypoint],
            Self::Tdd => &[GenSpec, GenUnitTests, GenCode, GenEntrypoint, ExecuteEntrypoint],
            Self::TddPlus => &[
                GenSpec,
                GenUnitTests,
                GenCode,
                FixCode,
                GenEntrypoint,
                ExecuteEntrypoint,
            ],
            Self::Respec => &[
                GenSpec,
                Respec,
                GenUnitTests,
                GenCode,
                GenEntrypoint,
                ExecuteEntrypoint,
            ],
            Self::UseFeedback => &[UseFeedback, GenEntrypoint, ExecuteEntrypoint],
            Self::ExecuteOnly => &[GenEntrypoint, ExecuteEntrypoint],
            Self::Improve => &[GenSimple, Improve, GenEntrypoint, ExecuteEntrypoint],
            Self::Summary => &[GenSummary],
        }
    }
}

/// Built-in step with the given name.
#[must_use]
pub fn step_by_name(name: &str) -> Option<Arc<dyn Step>> {
    StepKind::from_str(name)
        .ok()
        .map(|kind| Arc::new(kind) as Arc<dyn Step>)
}

/// Pipeline name to ordered step list.
#[derive(Clone, Default)]
pub struct StepRegistry {
    pipelines: BTreeMap<String, Vec<Arc<dyn Step>>>,
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: BTreeMap<&str, Vec<&str>> = self
            .pipelines
            .iter()
            .map(|(k, v)| (k.as_str(), v.iter().map(|s| s.name()).collect()))
            .collect();
        f.debug_struct("StepRegistry")
            .field("pipelines", &names)
            .finish()
    }
}

impl StepRegistry {
    /// Registry holding every [`Pipeline`].
    #[must_use]
    pub fn builtin() -> Self {
        let pipelines = Pipeline::iter()
            .map(|p| {
                let steps = p
                    .steps()
                    .iter()
                    .map(|kind| Arc::new(*kind) as Arc<dyn Step>)
                    .collect();
                (p.to_string(), steps)
            })
            .collect();
        Self { pipelines }
    }

    /// Built-in pipelines plus the `[pipelines]` table of `config`.
    ///
    /// A configured pipeline with a built-in name replaces the built-in one.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut registry = Self::builtin();
        for (name, step_names) in &config.pipelines {
            let steps = step_names
                .iter()
                .map(|step| {
                    step_by_name(step).ok_or_else(|| ConfigError::UnknownStep {
                        pipeline: name.clone(),
                        step: step.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            registry.register(name.clone(), steps)?;
        }
        Ok(registry)
    }

    /// Add or replace a pipeline.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        steps: Vec<Arc<dyn Step>>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if steps.is_empty() {
            return Err(ConfigError::EmptyPipeline { pipeline: name });
        }
        self.pipelines.insert(name, steps);
        Ok(())
    }

    /// Steps of pipeline `name`.
    ///
    /// # Errors
    ///
    /// `ForgeError::PipelineNotFound` listing the known names.
    pub fn resolve(&self, name: &str) -> Result<&[Arc<dyn Step>], ForgeError> {
        self.pipelines
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ForgeError::PipelineNotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Every pipeline name, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.pipelines.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(steps: &[Arc<dyn Step>]) -> Vec<&str> {
        steps.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_every_builtin_is_non_empty() {
        let registry = StepRegistry::builtin();
        for pipeline in Pipeline::iter() {
            let steps = registry.resolve(pipeline.as_ref()).unwrap();
            assert!(!steps.is_empty(), "{pipeline} has no steps");
        }
    }

    #[test]
    fn test_tdd_plus_order() {
        let registry = StepRegistry::builtin();
        assert_eq!(
            names(registry.resolve("tdd+").unwrap()),
            vec![
                "gen_spec",
                "gen_unit_tests",
                "gen_code",
                "fix_code",
                "gen_entrypoint",
                "execute_entrypoint"
            ]
        );
    }

    #[test]
    fn test_default_and_clarify_match() {
        assert_eq!(Pipeline::Default.steps(), Pipeline::Clarify.steps());
        assert_eq!(Pipeline::from_str("execute_only").unwrap(), Pipeline::ExecuteOnly);
        assert_eq!(Pipeline::TddPlus.to_string(), "tdd+");
    }

    #[test]
    fn test_unknown_pipeline_lists_available() {
        let err = StepRegistry::builtin().resolve("turbo").err().unwrap();
        let ForgeError::PipelineNotFound { name, available } = err else {
            panic!("expected PipelineNotFound");
        };
        assert_eq!(name, "turbo");
        assert!(available.contains(&"tdd".to_string()));
        assert!(available.contains(&"use_feedback".to_string()));
    }

    #[test]
    fn test_custom_pipeline_from_config() {
        let config = Config::builder()
            .pipeline("spec_then_code", ["gen_spec", "gen_unit_tests", "gen_code"])
            .build()
            .unwrap();

        let registry = StepRegistry::from_config(&config).unwrap();

        assert_eq!(
            names(registry.resolve("spec_then_code").unwrap()),
            vec!["gen_spec", "gen_unit_tests", "gen_code"]
        );
        assert!(registry.resolve("default").is_ok());
    }

    #[test]
    fn test_custom_pipeline_unknown_step() {
        let config = Config::builder()
            .pipeline("broken", ["gen_spec", "write_poetry"])
            .build()
            .unwrap();

        let err = StepRegistry::from_config(&config).unwrap_err();
        let ConfigError::UnknownStep { pipeline, step } = err else {
            panic!("expected UnknownStep, got {err:?}");
        };
        assert_eq!(pipeline, "broken");
        assert_eq!(step, "write_poetry");
    }

    #[test]
    fn test_register_rejects_empty() {
        let mut registry = StepRegistry::builtin();
        assert!(matches!(
            registry.register("nothing", Vec::new()),
            Err(ConfigError::EmptyPipeline { .. })
        ));
    }

    #[test]
    fn test_step_by_name() {
        assert_eq!(step_by_name("respec").unwrap().name(), "respec");
        assert!(step_by_name("Respec").is_none());
    }
}
