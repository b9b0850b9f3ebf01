//! Test doubles for code that talks to a model.
//!
//! Available to other crates through the `test-utils` feature.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::LlmError;
use crate::sink::StreamSink;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

/// Backend that replays canned replies in order and records every invocation.
///
/// Running out of replies is a `LlmError::Transport`, so a test that expects
/// fewer model calls than it scripted fails loudly.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    invocations: Mutex<Vec<LlmInvocation>>,
    unavailable: HashSet<String>,
}

impl ScriptedBackend {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            invocations: Mutex::new(Vec::new()),
            unavailable: HashSet::new(),
        }
    }

    /// Report `model` as unavailable from `model_available`.
    #[must_use]
    pub fn with_unavailable_model(mut self, model: impl Into<String>) -> Self {
        self.unavailable.insert(model.into());
        self
    }

    pub fn invocations(&self) -> Vec<LlmInvocation> {
        self.invocations
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = inv.model.clone();
        if let Ok(mut log) = self.invocations.lock() {
            log.push(inv);
        }
        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or_else(|| LlmError::Transport("scripted backend has no replies left".into()))?;
        Ok(LlmResult::new(reply, "scripted", model))
    }

    async fn model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(!self.unavailable.contains(model))
    }
}

/// Sink that keeps everything it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
    text: Mutex<String>,
    completed: Mutex<usize>,
}

impl CollectingSink {
    pub fn text(&self) -> String {
        self.text.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Number of replies that finished streaming.
    pub fn completed(&self) -> usize {
        self.completed.lock().map(|c| *c).unwrap_or_default()
    }
}

impl StreamSink for CollectingSink {
    fn on_chunk(&self, chunk: &str) {
        if let Ok(mut text) = self.text.lock() {
            text.push_str(chunk);
        }
    }

    fn on_complete(&self) {
        if let Ok(mut completed) = self.completed.lock() {
            *completed += 1;
        }
    }
}
