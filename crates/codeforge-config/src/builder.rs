use codeforge_utils::error::ConfigError;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use super::{Config, ConfigSource, Defaults, LlmConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Unlike [`Config::discover`], the builder never reads files or the
    /// environment, which makes it the right entry point for tests and
    /// embedding.
    ///
    /// ```rust
    /// use codeforge_config::Config;
    ///
    /// let config = Config::builder()
    ///     .model("gpt-3.5-turbo")
    ///     .steps("tdd")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.steps(), "tdd");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent builder for [`Config`].
///
/// Every value set here is attributed to [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    model: Option<String>,
    fallback_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    steps: Option<String>,
    agent: Option<String>,
    agents_dir: Option<PathBuf>,
    run_prefix: Option<String>,
    protected_templates: Option<Vec<String>>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    timeout_secs: Option<u64>,
    stream: Option<bool>,
    pipelines: BTreeMap<String, Vec<String>>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Pass an empty string to disable the fallback.
    #[must_use]
    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn steps(mut self, pipeline: impl Into<String>) -> Self {
        self.steps = Some(pipeline.into());
        self
    }

    #[must_use]
    pub fn agent(mut self, template: impl Into<String>) -> Self {
        self.agent = Some(template.into());
        self
    }

    #[must_use]
    pub fn agents_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.agents_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn run_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.run_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn protected_templates(mut self, names: Vec<String>) -> Self {
        self.protected_templates = Some(names);
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Declare a custom pipeline.
    #[must_use]
    pub fn pipeline<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        steps: impl IntoIterator<Item = S>,
    ) -> Self {
        self.pipelines
            .insert(name.into(), steps.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut defaults = Defaults::default();
        let mut llm = LlmConfig::default();
        let src = ConfigSource::Programmatic;

        let mut set = |key: &str| {
            source_attribution.insert(key.to_string(), src);
        };

        if let Some(v) = self.model {
            defaults.model = Some(v);
            set("model");
        }
        if let Some(v) = self.fallback_model {
            defaults.fallback_model = Some(v);
            set("fallback_model");
        }
        if let Some(v) = self.temperature {
            defaults.temperature = Some(v);
            set("temperature");
        }
        if let Some(v) = self.max_tokens {
            defaults.max_tokens = Some(v);
            set("max_tokens");
        }
        if let Some(v) = self.steps {
            defaults.steps = Some(v);
            set("steps");
        }
        if let Some(v) = self.agent {
            defaults.agent = Some(v);
            set("agent");
        }
        if let Some(v) = self.agents_dir {
            defaults.agents_dir = Some(v);
            set("agents_dir");
        }
        if let Some(v) = self.run_prefix {
            defaults.run_prefix = Some(v);
            set("run_prefix");
        }
        if let Some(v) = self.protected_templates {
            defaults.protected_templates = Some(v);
            set("protected_templates");
        }
        if let Some(v) = self.base_url {
            llm.base_url = Some(v);
            set("llm_base_url");
        }
        if let Some(v) = self.api_key_env {
            llm.api_key_env = Some(v);
            set("llm_api_key_env");
        }
        if let Some(v) = self.timeout_secs {
            llm.timeout_secs = Some(v);
            set("llm_timeout_secs");
        }
        if let Some(v) = self.stream {
            llm.stream = Some(v);
            set("llm_stream");
        }
        if !self.pipelines.is_empty() {
            set("pipelines");
        }

        let config = Config {
            defaults,
            llm,
            pipelines: self.pipelines,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_values_are_programmatic() {
        let config = Config::builder()
            .model("gpt-3.5-turbo")
            .temperature(0.7)
            .agent("generic")
            .build()
            .unwrap();

        assert_eq!(config.model(), "gpt-3.5-turbo");
        assert!((config.temperature() - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.agent(), "generic");
        assert_eq!(config.source_of("model"), ConfigSource::Programmatic);
        assert_eq!(config.source_of("steps"), ConfigSource::Default);
    }

    #[test]
    fn test_builder_pipeline() {
        let config = Config::builder()
            .pipeline("spec_only", ["gen_spec", "respec"])
            .build()
            .unwrap();

        assert_eq!(
            config.pipelines.get("spec_only"),
            Some(&vec!["gen_spec".to_string(), "respec".to_string()])
        );
    }
}
