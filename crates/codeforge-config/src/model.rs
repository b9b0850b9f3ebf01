use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Model requested when nothing else is configured
pub const DEFAULT_MODEL: &str = "gpt-4";
/// Model used when the requested one is not available to the API key
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 4097;
pub const DEFAULT_PIPELINE: &str = "default";
/// Identity template copied for each project
pub const DEFAULT_AGENT: &str = "coder";
pub const DEFAULT_AGENTS_DIR: &str = "agents";
pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value read from a `CODEFORGE_*` environment variable.
    Env,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl ConfigSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}

/// Configuration for a codeforge run.
///
/// Use [`Config::discover`] for CLI-like behavior that searches for
/// `.codeforge/config.toml` upward from the current directory, or
/// [`Config::builder`] for deterministic programmatic construction.
///
/// # Configuration File Format
///
/// ```toml
/// [defaults]
/// model = "gpt-4"
/// fallback_model = "gpt-3.5-turbo"
/// temperature = 0.1
/// steps = "tdd"
///
/// [llm]
/// base_url = "http://localhost:8080/v1"
/// api_key_env = "OPENAI_API_KEY"
///
/// [pipelines]
/// spec_only = ["gen_spec", "respec"]
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub llm: LlmConfig,
    /// Custom pipelines, name to ordered step names.
    pub pipelines: BTreeMap<String, Vec<String>>,
    /// Source attribution for each setting.
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    pub model: Option<String>,
    /// Set to an empty string to disable the availability fallback.
    pub fallback_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Pipeline to run.
    pub steps: Option<String>,
    /// Identity template name under `agents_dir`.
    pub agent: Option<String>,
    pub agents_dir: Option<PathBuf>,
    /// Prepended to the `memory` and `workspace` directory names.
    pub run_prefix: Option<String>,
    /// Template directories that survive identity cleanup.
    pub protected_templates: Option<Vec<String>>,
}

/// `[llm]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Stream tokens to the terminal as they arrive.
    pub stream: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: Some(DEFAULT_MODEL.to_string()),
            fallback_model: Some(DEFAULT_FALLBACK_MODEL.to_string()),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            steps: Some(DEFAULT_PIPELINE.to_string()),
            agent: Some(DEFAULT_AGENT.to_string()),
            agents_dir: Some(PathBuf::from(DEFAULT_AGENTS_DIR)),
            run_prefix: Some(String::new()),
            protected_templates: Some(vec!["generic".to_string(), "coder".to_string()]),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Some(DEFAULT_PROVIDER.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            stream: Some(true),
        }
    }
}

impl Config {
    #[must_use]
    pub fn model(&self) -> &str {
        self.defaults.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Fallback model, `None` when disabled.
    #[must_use]
    pub fn fallback_model(&self) -> Option<&str> {
        self.defaults
            .fallback_model
            .as_deref()
            .filter(|m| !m.is_empty())
    }

    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.defaults.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    #[must_use]
    pub fn max_tokens(&self) -> u32 {
        self.defaults.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Name of the pipeline to run
    #[must_use]
    pub fn steps(&self) -> &str {
        self.defaults.steps.as_deref().unwrap_or(DEFAULT_PIPELINE)
    }

    #[must_use]
    pub fn agent(&self) -> &str {
        self.defaults.agent.as_deref().unwrap_or(DEFAULT_AGENT)
    }

    #[must_use]
    pub fn agents_dir(&self) -> &Path {
        self.defaults
            .agents_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_AGENTS_DIR))
    }

    #[must_use]
    pub fn run_prefix(&self) -> &str {
        self.defaults.run_prefix.as_deref().unwrap_or("")
    }

    #[must_use]
    pub fn protected_templates(&self) -> Vec<String> {
        self.defaults
            .protected_templates
            .clone()
            .unwrap_or_else(|| vec!["generic".to_string(), "coder".to_string()])
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        self.llm.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.llm.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn api_key_env(&self) -> &str {
        self.llm.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn stream(&self) -> bool {
        self.llm.stream.unwrap_or(true)
    }

    /// Source of a configuration key, `Default` when never overridden.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .copied()
            .unwrap_or(ConfigSource::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let config = Config::builder().build().unwrap();

        assert_eq!(config.model(), "gpt-4");
        assert_eq!(config.fallback_model(), Some("gpt-3.5-turbo"));
        assert_eq!(config.max_tokens(), 4097);
        assert_eq!(config.steps(), "default");
        assert_eq!(config.agent(), "coder");
        assert_eq!(config.agents_dir(), Path::new("agents"));
        assert_eq!(config.run_prefix(), "");
        assert_eq!(config.protected_templates(), vec!["generic", "coder"]);
        assert_eq!(config.api_key_env(), "OPENAI_API_KEY");
        assert!(config.stream());
        assert_eq!(config.source_of("model"), ConfigSource::Default);
    }

    #[test]
    fn test_empty_fallback_disables_it() {
        let mut config = Config::builder().build().unwrap();
        config.defaults.fallback_model = Some(String::new());
        assert_eq!(config.fallback_model(), None);
    }

    #[test]
    fn test_config_source_labels() {
        assert_eq!(ConfigSource::Cli.as_str(), "cli");
        assert_eq!(ConfigSource::Env.as_str(), "env");
        assert_eq!(ConfigSource::Config.as_str(), "config");
        assert_eq!(ConfigSource::Programmatic.as_str(), "programmatic");
        assert_eq!(ConfigSource::Default.as_str(), "default");
    }
}
