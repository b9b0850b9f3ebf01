use codeforge_utils::error::StoreError;
use std::path::{Path, PathBuf};

use crate::Db;

/// On-disk locations for one run of a project.
///
/// ```text
/// <project>/                      input (prompt, prompt.json, feedback)
/// <project>/<prefix>memory/       memory
/// <project>/<prefix>memory/logs/  logs
/// <project>/<prefix>workspace/    workspace
/// <agents>/                       agent (identity templates)
/// <agents>/<project name>/        identity
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub project_name: String,
    pub input: PathBuf,
    pub memory: PathBuf,
    pub logs: PathBuf,
    pub workspace: PathBuf,
    pub agents: PathBuf,
    pub identity: PathBuf,
}

impl RunLayout {
    #[must_use]
    pub fn new(project_path: &Path, run_prefix: &str, agents_dir: &Path) -> Self {
        let input =
            std::path::absolute(project_path).unwrap_or_else(|_| project_path.to_path_buf());
        let project_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "project".to_string());

        let memory = input.join(format!("{run_prefix}memory"));
        let workspace = input.join(format!("{run_prefix}workspace"));
        let logs = memory.join("logs");
        let agents = agents_dir.to_path_buf();
        let identity = agents.join(&project_name);

        Self {
            project_name,
            input,
            memory,
            logs,
            workspace,
            agents,
            identity,
        }
    }
}

/// The namespaces a pipeline run reads and writes.
#[derive(Debug, Clone)]
pub struct Dbs {
    /// Project prompt and operator-provided files
    pub input: Db,
    /// Generated source files
    pub workspace: Db,
    /// Intermediate artifacts such as `specification` and `tests`
    pub memory: Db,
    /// One serialized conversation per executed step
    pub logs: Db,
    /// Identity templates
    pub agent: Db,
    /// Prompts for this project, materialized from a template
    pub identity: Db,
}

impl Dbs {
    /// Open every namespace of `layout`.
    ///
    /// Input, memory, logs and workspace directories are created; agent and
    /// identity directories are left for identity initialization to manage.
    pub fn open(layout: &RunLayout) -> Result<Self, StoreError> {
        Ok(Self {
            input: Db::open("input", &layout.input)?,
            workspace: Db::open("workspace", &layout.workspace)?,
            memory: Db::open("memory", &layout.memory)?,
            logs: Db::open("logs", &layout.logs)?,
            agent: Db::new("agent", &layout.agents),
            identity: Db::new("identity", &layout.identity),
        })
    }

    /// Wipe generated output from a previous run.
    ///
    /// Removes the memory (including logs) and workspace directories, then
    /// recreates them empty.
    pub fn clear_generated(&self) -> Result<(), StoreError> {
        for db in [&self.memory, &self.workspace] {
            db.remove_all()?;
        }
        for db in [&self.memory, &self.logs, &self.workspace] {
            Db::open(db.name(), db.path())?;
        }
        Ok(())
    }
}
