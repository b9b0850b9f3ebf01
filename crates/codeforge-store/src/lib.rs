//! Artifact storage for codeforge runs
//!
//! A run works against six [`Db`] namespaces, each a directory on disk. Steps
//! hand artifacts to each other only through these namespaces.

mod db;
mod dbs;
pub mod identity;

pub use db::Db;
pub use dbs::{Dbs, RunLayout};
pub use identity::{IdentityOutcome, clean_identity, initialize_identity};
