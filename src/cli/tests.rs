use clap::{CommandFactory, Parser};
use std::path::PathBuf;

use super::Cli;

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_defaults() {
    let cli = Cli::try_parse_from(["codeforge"]).unwrap();

    assert_eq!(cli.project_path, PathBuf::from("example"));
    assert!(!cli.delete_existing);
    assert!(!cli.keep_identity);

    let args = cli.to_cli_args();
    assert!(args.model.is_none());
    assert!(args.steps.is_none());
    assert!(args.config_path.is_none());
}

#[test]
fn test_flags_reach_config_overrides() {
    let cli = Cli::try_parse_from([
        "codeforge",
        "projects/snake",
        "-d",
        "-s",
        "tdd+",
        "--model",
        "gpt-4o",
        "--temperature",
        "0.7",
        "--max-tokens",
        "2000",
        "--run-prefix",
        "retry_",
        "--agent",
        "generic",
    ])
    .unwrap();

    assert!(cli.delete_existing);
    let args = cli.to_cli_args();
    assert_eq!(args.steps.as_deref(), Some("tdd+"));
    assert_eq!(args.model.as_deref(), Some("gpt-4o"));
    assert_eq!(args.temperature, Some(0.7));
    assert_eq!(args.max_tokens, Some(2000));
    assert_eq!(args.run_prefix.as_deref(), Some("retry_"));
    assert_eq!(args.agent.as_deref(), Some("generic"));
}

#[test]
fn test_rejects_bad_numbers() {
    assert!(Cli::try_parse_from(["codeforge", "--max-tokens", "lots"]).is_err());
}
