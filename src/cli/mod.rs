//! Command-line interface for codeforge
//!
//! - `args`: clap argument definitions
//! - `run`: entry point, configuration and the pipeline run

pub mod args;
mod run;

#[cfg(test)]
mod tests;

pub use args::Cli;
pub use run::run;
