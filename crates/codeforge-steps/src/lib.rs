//! Steps and pipelines for codeforge
//!
//! - [`materialize`] turns model replies into workspace files
//! - [`steps`] holds the built-in [`Step`]s and the [`StepContext`] they run in
//! - [`registry`] maps pipeline names to ordered step lists
//!
//! Interactive steps talk to the operator through [`Operator`] and run
//! generated scripts through [`ScriptRunner`], so whole pipelines can be
//! exercised without a terminal.

pub mod materialize;
mod operator;
pub mod registry;
mod runner;
pub mod steps;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use materialize::{extract_code_blocks, materialize_reply, parse_chat, to_files};
pub use operator::{Operator, TerminalOperator};
pub use registry::{Pipeline, StepRegistry, step_by_name};
pub use runner::{BashRunner, ScriptOutcome, ScriptRunner};
pub use steps::{Step, StepContext, StepKind};
