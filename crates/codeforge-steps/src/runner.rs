//! Running the generated entrypoint script.

use async_trait::async_trait;
use codeforge_utils::error::ForgeError;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// How a script run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl ScriptOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes a script file from a working directory.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` (a path relative to `cwd`) with `cwd` as working
    /// directory. Output goes straight to the operator's terminal.
    async fn run(&self, script: &str, cwd: &Path) -> Result<ScriptOutcome, ForgeError>;
}

/// Runs scripts as `bash <script>`.
///
/// The script name is passed as a single argument, never through a shell
/// command string.
#[derive(Debug, Clone, Default)]
pub struct BashRunner;

#[async_trait]
impl ScriptRunner for BashRunner {
    async fn run(&self, script: &str, cwd: &Path) -> Result<ScriptOutcome, ForgeError> {
        debug!(script = %script, cwd = %cwd.display(), "Spawning bash");
        let status = Command::new("bash")
            .arg(script)
            .current_dir(cwd)
            .status()
            .await
            .map_err(|e| ForgeError::Execution {
                reason: format!("could not spawn bash: {e}"),
            })?;

        Ok(ScriptOutcome {
            exit_code: status.code(),
        })
    }
}
