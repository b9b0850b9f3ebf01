//! Discovery and precedence tests for `.codeforge/config.toml`.

use codeforge_config::{CliArgs, Config, ConfigSource};
use codeforge_utils::error::ConfigError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(root: &Path, body: &str) {
    let dir = root.join(".codeforge");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), body).unwrap();
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn discovers_config_in_parent_directory() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path(), "[defaults]\nsteps = \"tdd\"\n");
    let nested = temp.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let found = Config::discover_config_file_from(&nested).unwrap();
    assert_eq!(found, temp.path().join(".codeforge").join("config.toml"));

    let config = Config::discover_from(&nested, &CliArgs::default()).unwrap();
    assert_eq!(config.steps(), "tdd");
    assert_eq!(config.source_of("steps"), ConfigSource::Config);
}

#[test]
fn discovery_stops_at_repository_root() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path(), "[defaults]\nsteps = \"tdd\"\n");
    let repo = temp.path().join("repo");
    fs::create_dir_all(repo.join(".git")).unwrap();
    let inner = repo.join("src");
    fs::create_dir_all(&inner).unwrap();

    assert!(Config::discover_config_file_from(&inner).is_none());

    let config = Config::discover_from(&inner, &CliArgs::default()).unwrap();
    assert_eq!(config.steps(), "default");
}

#[test]
fn explicit_missing_config_is_not_found() {
    let temp = TempDir::new().unwrap();
    let args = CliArgs {
        config_path: Some(temp.path().join("nope.toml")),
        ..CliArgs::default()
    };

    let err = Config::discover_from(temp.path(), &args).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn malformed_toml_is_invalid_file() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path(), "[defaults\nmodel = ");

    let err = Config::discover_from(temp.path(), &CliArgs::default()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFile(_)));
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn cli_overrides_file_overrides_default() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        r#"
[defaults]
model = "gpt-3.5-turbo"
temperature = 0.5
agent = "generic"

[llm]
timeout_secs = 30
stream = false
"#,
    );
    let args = CliArgs {
        model: Some("gpt-4o".to_string()),
        ..CliArgs::default()
    };

    let config = Config::discover_from(temp.path(), &args).unwrap();

    assert_eq!(config.model(), "gpt-4o");
    assert_eq!(config.source_of("model"), ConfigSource::Cli);
    assert!((config.temperature() - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.agent(), "generic");
    assert_eq!(config.timeout().as_secs(), 30);
    assert!(!config.stream());
    assert_eq!(config.max_tokens(), 4097);
    assert_eq!(config.source_of("max_tokens"), ConfigSource::Default);
}

#[test]
fn custom_pipelines_are_loaded() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        "[pipelines]\nspec_only = [\"gen_spec\", \"respec\"]\n",
    );

    let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();
    assert_eq!(
        config.pipelines.get("spec_only").map(Vec::len),
        Some(2),
        "custom pipeline should be read from [pipelines]"
    );
}

#[test]
fn empty_custom_pipeline_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path(), "[pipelines]\nhollow = []\n");

    let err = Config::discover_from(temp.path(), &CliArgs::default()).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyPipeline { .. }));
}
