use codeforge_utils::error::ConfigError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::{CliArgs, Config, ConfigSource, Defaults, LlmConfig};

/// Directory searched for during discovery
pub const CONFIG_DIR: &str = ".codeforge";
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `[llm].base_url`
const ENV_BASE_URL: &str = "CODEFORGE_BASE_URL";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    defaults: Option<Defaults>,
    llm: Option<LlmConfig>,
    pipelines: Option<BTreeMap<String, Vec<String>>>,
}

macro_rules! apply {
    ($target:expr, $value:expr, $key:literal, $attribution:ident, $source:expr) => {
        if let Some(v) = $value {
            $target = Some(v);
            $attribution.insert($key.to_string(), $source);
        }
    };
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| {
            ConfigError::InvalidFile(format!("cannot determine current directory: {e}"))
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// Path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut defaults = Defaults::default();
        let mut llm = LlmConfig::default();
        let mut pipelines = BTreeMap::new();

        let config_path = match &cli_args.config_path {
            Some(explicit) if !explicit.exists() => {
                return Err(ConfigError::NotFound {
                    path: explicit.display().to_string(),
                });
            }
            Some(explicit) => Some(explicit.clone()),
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            let file = Self::load_config_file(path)?;
            let src = ConfigSource::Config;

            if let Some(d) = file.defaults {
                apply!(defaults.model, d.model, "model", source_attribution, src);
                apply!(
                    defaults.fallback_model,
                    d.fallback_model,
                    "fallback_model",
                    source_attribution,
                    src
                );
                apply!(defaults.temperature, d.temperature, "temperature", source_attribution, src);
                apply!(defaults.max_tokens, d.max_tokens, "max_tokens", source_attribution, src);
                apply!(defaults.steps, d.steps, "steps", source_attribution, src);
                apply!(defaults.agent, d.agent, "agent", source_attribution, src);
                apply!(defaults.agents_dir, d.agents_dir, "agents_dir", source_attribution, src);
                apply!(defaults.run_prefix, d.run_prefix, "run_prefix", source_attribution, src);
                apply!(
                    defaults.protected_templates,
                    d.protected_templates,
                    "protected_templates",
                    source_attribution,
                    src
                );
            }

            if let Some(l) = file.llm {
                apply!(llm.provider, l.provider, "llm_provider", source_attribution, src);
                apply!(llm.base_url, l.base_url, "llm_base_url", source_attribution, src);
                apply!(llm.api_key_env, l.api_key_env, "llm_api_key_env", source_attribution, src);
                apply!(
                    llm.timeout_secs,
                    l.timeout_secs,
                    "llm_timeout_secs",
                    source_attribution,
                    src
                );
                apply!(llm.stream, l.stream, "llm_stream", source_attribution, src);
            }

            if let Some(p) = file.pipelines {
                pipelines = p;
                source_attribution.insert("pipelines".to_string(), src);
            }
        }

        if let Ok(base_url) = std::env::var(ENV_BASE_URL)
            && !base_url.is_empty()
        {
            llm.base_url = Some(base_url);
            source_attribution.insert("llm_base_url".to_string(), ConfigSource::Env);
        }

        // CLI overrides (highest priority)
        let cli = ConfigSource::Cli;
        apply!(defaults.model, cli_args.model.clone(), "model", source_attribution, cli);
        apply!(defaults.temperature, cli_args.temperature, "temperature", source_attribution, cli);
        apply!(defaults.max_tokens, cli_args.max_tokens, "max_tokens", source_attribution, cli);
        apply!(defaults.steps, cli_args.steps.clone(), "steps", source_attribution, cli);
        apply!(defaults.agent, cli_args.agent.clone(), "agent", source_attribution, cli);
        apply!(
            defaults.run_prefix,
            cli_args.run_prefix.clone(),
            "run_prefix",
            source_attribution,
            cli
        );
        apply!(
            defaults.agents_dir,
            cli_args.agents_dir.clone(),
            "agents_dir",
            source_attribution,
            cli
        );

        let config = Self {
            defaults,
            llm,
            pipelines,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }

    /// Search upward from `start_dir` for `.codeforge/config.toml`.
    ///
    /// Stops at repository root markers (.git, .hg, .svn) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }

            current = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }
}
