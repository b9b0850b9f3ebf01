use codeforge_utils::error::ConfigError;

use super::{Config, DEFAULT_PROVIDER};

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let temperature = self.temperature();
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "temperature".to_string(),
                value: format!("{temperature} is outside 0.0..=2.0"),
            });
        }

        if self.max_tokens() == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_tokens".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        if self.model().trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model".to_string(),
                value: "must not be empty".to_string(),
            });
        }

        if self.provider() != DEFAULT_PROVIDER {
            return Err(ConfigError::InvalidValue {
                key: "llm_provider".to_string(),
                value: format!(
                    "Unknown provider '{}'. Supported: {DEFAULT_PROVIDER}",
                    self.provider()
                ),
            });
        }

        if self.llm.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "llm_timeout_secs".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        let base_url = self.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "llm_base_url".to_string(),
                value: format!("'{base_url}' must start with http:// or https://"),
            });
        }

        if self.run_prefix().contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                key: "run_prefix".to_string(),
                value: "must not contain path separators".to_string(),
            });
        }

        for (name, steps) in &self.pipelines {
            if steps.is_empty() {
                return Err(ConfigError::EmptyPipeline {
                    pipeline: name.clone(),
                });
            }
        }

        Ok(())
    }
}
