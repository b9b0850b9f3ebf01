//! codeforge turns a natural-language project prompt into a generated
//! codebase by chaining model conversations through a named pipeline of
//! steps.
//!
//! The workspace is split by concern:
//!
//! - `codeforge-config`: configuration discovery and precedence
//! - `codeforge-llm`: model backends and conversation state
//! - `codeforge-store`: artifact namespaces and agent identities
//! - `codeforge-steps`: steps, output materialization, pipeline registry
//! - `codeforge-engine`: the orchestrator
//!
//! This crate re-exports the types needed to drive a run from code and
//! hosts the `codeforge` command-line interface.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use codeforge::{
//!     Ai, BashRunner, Config, Dbs, Orchestrator, RunLayout, StepContext, StepRegistry,
//!     TerminalOperator,
//! };
//!
//! # async fn demo() -> Result<(), codeforge::ForgeError> {
//! let config = Config::builder().steps("simple").build()?;
//! let layout = RunLayout::new(Path::new("projects/snake"), "", config.agents_dir());
//! let dbs = Dbs::open(&layout)?;
//! let backend = codeforge_llm::from_config(&config)?;
//! let ai = Ai::from_config(backend, config.model(), &config);
//! let operator = TerminalOperator::new();
//! let ctx = StepContext::new(&ai, &dbs, &operator, &BashRunner);
//!
//! let summary = Orchestrator::new(StepRegistry::from_config(&config)?)
//!     .run(config.steps(), &ctx)
//!     .await?;
//! println!("ran {} steps", summary.steps.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use codeforge_config::{CliArgs, Config, ConfigBuilder, ConfigSource};
pub use codeforge_engine::{Orchestrator, RunSummary, StepRecord};
pub use codeforge_llm::{Ai, Conversation, LlmBackend, Message, Role, StdoutSink, StreamSink};
pub use codeforge_steps::{
    BashRunner, Operator, Pipeline, ScriptRunner, Step, StepContext, StepKind, StepRegistry,
    TerminalOperator,
};
pub use codeforge_store::{Db, Dbs, IdentityOutcome, RunLayout};
pub use codeforge_utils::error::ForgeError;
pub use codeforge_utils::exit_codes::ExitCode;
