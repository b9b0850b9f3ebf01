use std::path::PathBuf;

/// Command-line overrides fed into [`Config::discover`](crate::Config::discover).
///
/// `None` means the flag was not given, so the file or built-in default wins.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub steps: Option<String>,
    pub agent: Option<String>,
    pub run_prefix: Option<String>,
    pub agents_dir: Option<PathBuf>,
}
