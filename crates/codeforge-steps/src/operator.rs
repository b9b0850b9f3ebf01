//! The human in the loop.

use async_trait::async_trait;
use codeforge_utils::error::ForgeError;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Source of operator input and sink for operator-facing text.
///
/// Steps never read the terminal directly, so interactive steps can be driven
/// by a script in tests.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Show `text` to the operator.
    fn say(&self, text: &str);

    /// Show `prompt` and wait for one line of input, without its line ending.
    ///
    /// End of input is reported as an empty answer.
    async fn ask(&self, prompt: &str) -> Result<String, ForgeError>;
}

/// Operator on the process's stdin and stdout.
pub struct TerminalOperator {
    stdin: Mutex<BufReader<Stdin>>,
}

impl TerminalOperator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for TerminalOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TerminalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalOperator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Operator for TerminalOperator {
    fn say(&self, text: &str) {
        println!("{text}");
    }

    async fn ask(&self, prompt: &str) -> Result<String, ForgeError> {
        println!();
        println!("{prompt}");
        std::io::stdout().flush()?;

        let mut line = String::new();
        self.stdin.lock().await.read_line(&mut line).await?;
        println!();

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
