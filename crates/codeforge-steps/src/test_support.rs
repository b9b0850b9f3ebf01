//! Scripted stand-ins for the operator and the script runner.
//!
//! Available to other crates through the `test-utils` feature.

use async_trait::async_trait;
use codeforge_utils::error::ForgeError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::operator::Operator;
use crate::runner::{ScriptOutcome, ScriptRunner};

/// Operator that answers from a fixed list and records what it was shown.
///
/// Once the answers run out every further question gets an empty answer,
/// the same as end of input on a terminal.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
    said: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Prompts passed to `ask`, in order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Text passed to `say`, in order.
    pub fn said(&self) -> Vec<String> {
        self.said.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    fn say(&self, text: &str) {
        if let Ok(mut said) = self.said.lock() {
            said.push(text.to_string());
        }
    }

    async fn ask(&self, prompt: &str) -> Result<String, ForgeError> {
        if let Ok(mut questions) = self.questions.lock() {
            questions.push(prompt.to_string());
        }
        Ok(self
            .answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or_default())
    }
}

/// Runner that records invocations instead of spawning anything.
#[derive(Debug)]
pub struct RecordingRunner {
    calls: Mutex<Vec<(String, PathBuf)>>,
    exit_code: Option<i32>,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::with_exit_code(Some(0))
    }
}

impl RecordingRunner {
    pub fn with_exit_code(exit_code: Option<i32>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code,
        }
    }

    /// `(script, cwd)` of every run, in order.
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ScriptRunner for RecordingRunner {
    async fn run(&self, script: &str, cwd: &Path) -> Result<ScriptOutcome, ForgeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((script.to_string(), cwd.to_path_buf()));
        }
        Ok(ScriptOutcome {
            exit_code: self.exit_code,
        })
    }
}
