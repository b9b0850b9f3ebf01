//! Pipeline orchestration for codeforge
//!
//! [`Orchestrator`] resolves a pipeline name against a
//! [`StepRegistry`](codeforge_steps::StepRegistry), runs its steps one after
//! another and logs each step's final conversation under the step's name.

mod orchestrator;

pub use orchestrator::{Orchestrator, RunSummary, StepRecord};
