//! CLI entry point
//!
//! `run()` parses arguments, loads `.env` and configuration, resolves the
//! pipeline, then drives the run on a tokio runtime. It prints all output,
//! errors included.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use codeforge_llm::resolve_model;
use codeforge_store::{clean_identity, initialize_identity};
use codeforge_utils::logging::init_tracing;

use super::args::Cli;
use crate::{
    Ai, BashRunner, Config, Dbs, ExitCode, ForgeError, Orchestrator, RunLayout, RunSummary,
    StdoutSink, StepContext, StepRegistry, TerminalOperator,
};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after the error has been reported on stderr;
/// main only exits with it.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Warning: could not load .env: {e}");
    }

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let (config, registry) = match load(&cli) {
        Ok(loaded) => loaded,
        Err(err) => return Err(report(&err)),
    };

    if cli.list_pipelines {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let rt = match tokio::runtime::Runtime::new().context("Failed to create async runtime") {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return Err(ExitCode::INTERNAL);
        }
    };

    match rt.block_on(execute(&cli, &config, registry)) {
        Ok(summary) => {
            info!(
                pipeline = %summary.pipeline,
                steps = summary.steps.len(),
                duration_ms = %summary.total_ms(),
                "Run complete"
            );
            Ok(())
        }
        Err(err) => Err(report(&err)),
    }
}

/// Configuration and pipeline registry, with the requested pipeline checked
/// before any other work happens.
fn load(cli: &Cli) -> Result<(Config, StepRegistry), ForgeError> {
    let config = Config::discover(&cli.to_cli_args())?;
    let registry = StepRegistry::from_config(&config)?;
    if !cli.list_pipelines {
        registry.resolve(config.steps())?;
    }
    Ok((config, registry))
}

async fn execute(
    cli: &Cli,
    config: &Config,
    registry: StepRegistry,
) -> Result<RunSummary, ForgeError> {
    let layout = RunLayout::new(&cli.project_path, config.run_prefix(), config.agents_dir());
    let dbs = Dbs::open(&layout)?;

    if cli.delete_existing {
        info!(
            memory = %layout.memory.display(),
            workspace = %layout.workspace.display(),
            "Deleting output of earlier runs"
        );
        dbs.clear_generated()?;
    }

    initialize_identity(&dbs, &layout.project_name, config.agent())?;

    let backend = codeforge_llm::from_config(config)?;
    let model = resolve_model(backend.as_ref(), config.model(), config.fallback_model()).await?;
    let mut ai = Ai::from_config(backend, model, config);
    if config.stream() {
        ai = ai.with_stream_sink(Arc::new(StdoutSink));
    }

    let operator = TerminalOperator::new();
    let runner = BashRunner;
    let ctx = StepContext::new(&ai, &dbs, &operator, &runner);

    let result = Orchestrator::new(registry)
        .run(config.steps(), &ctx)
        .await;

    if !cli.keep_identity {
        match clean_identity(&layout.agents, &config.protected_templates()) {
            Ok(removed) if !removed.is_empty() => info!(removed = ?removed, "Cleaned identities"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to clean identities"),
        }
    }

    result
}

fn report(err: &ForgeError) -> ExitCode {
    eprintln!("{}", err.display_for_user());
    err.to_exit_code()
}
