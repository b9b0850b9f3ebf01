//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::CliArgs;

/// codeforge - generate a codebase from a project prompt
#[derive(Parser, Debug)]
#[command(name = "codeforge")]
#[command(about = "Generate a codebase from a project prompt by chaining LLM conversations")]
#[command(long_about = r#"
codeforge runs a named pipeline of steps against a project directory. Each
step talks to the model, reads what earlier steps stored and writes new
artifacts: a specification, tests, source files, and finally a run.sh
entrypoint that you may choose to execute.

EXAMPLES:
  # Clarify the prompt interactively, then generate code
  codeforge projects/snake

  # Test-driven generation with a fix-up pass
  codeforge projects/snake --steps tdd+

  # Start over, discarding earlier memory and workspace
  codeforge projects/snake -d

  # Regenerate and run the entrypoint for an existing workspace
  codeforge projects/snake --steps execute_only

PROJECT LAYOUT:
  <project>/                      identity tags in prompt.json, feedback
  <project>/<prefix>memory/       specification, tests, logs/
  <project>/<prefix>workspace/    generated files and run.sh
  <agents>/<project name>/        prompts built from the agent template

CONFIGURATION:
  Precedence: CLI flags > config file > defaults
  The config file is found by searching upward from the current directory
  for .codeforge/config.toml; use --config to name one explicitly.
  A .env file in the current directory is loaded before anything else.
"#)]
#[command(version)]
pub struct Cli {
    /// Project directory
    #[arg(default_value = "example")]
    pub project_path: PathBuf,

    /// Delete memory and workspace from an earlier run first
    #[arg(short = 'd', long)]
    pub delete_existing: bool,

    /// Identity template to build the project's prompts from
    #[arg(long)]
    pub agent: Option<String>,

    /// Model to request
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum tokens per completion
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Pipeline to run
    #[arg(short = 's', long)]
    pub steps: Option<String>,

    /// Prefix for the memory and workspace directories, to keep runs apart
    #[arg(long)]
    pub run_prefix: Option<String>,

    /// Directory holding identity templates
    #[arg(long)]
    pub agents_dir: Option<PathBuf>,

    /// Path to configuration file (overrides discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Leave the project's identity directory in place after the run
    #[arg(long)]
    pub keep_identity: bool,

    /// List available pipelines and exit
    #[arg(long)]
    pub list_pipelines: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Overrides handed to configuration discovery.
    #[must_use]
    pub fn to_cli_args(&self) -> CliArgs {
        CliArgs {
            config_path: self.config.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            steps: self.steps.clone(),
            agent: self.agent.clone(),
            run_prefix: self.run_prefix.clone(),
            agents_dir: self.agents_dir.clone(),
        }
    }
}
