use std::collections::BTreeMap;

use super::Config;

impl Config {
    /// Effective configuration as `key -> (value, source)`, for `--verbose`
    /// startup output.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = self.source_of(key).as_str().to_string();
            config.insert(key.to_string(), (value, source));
        };

        add("model", self.model().to_string());
        add(
            "fallback_model",
            self.fallback_model().unwrap_or("(disabled)").to_string(),
        );
        add("temperature", self.temperature().to_string());
        add("max_tokens", self.max_tokens().to_string());
        add("steps", self.steps().to_string());
        add("agent", self.agent().to_string());
        add("agents_dir", self.agents_dir().display().to_string());
        add("run_prefix", self.run_prefix().to_string());
        add("protected_templates", self.protected_templates().join(", "));
        add("llm_provider", self.provider().to_string());
        add("llm_base_url", self.base_url().to_string());
        add("llm_api_key_env", self.api_key_env().to_string());
        add("llm_timeout_secs", self.timeout().as_secs().to_string());
        add("llm_stream", self.stream().to_string());

        if !self.pipelines.is_empty() {
            let names: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
            add("pipelines", names.join(", "));
        }

        config
    }
}
