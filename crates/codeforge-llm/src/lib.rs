//! Model capability for codeforge
//!
//! Every provider implements [`LlmBackend`]. Steps never talk to a backend
//! directly: they go through [`Ai`], which carries the model parameters and
//! grows a [`Conversation`] by exactly one assistant message per call.

mod ai;
mod conversation;
pub(crate) mod http_client;
mod openai_backend;
mod sink;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use ai::{Ai, resolve_model};
pub use codeforge_utils::error::LlmError;
pub use conversation::Conversation;
pub use openai_backend::{OpenAiBackend, SseDecoder, SseEvent};
pub use sink::{NullSink, StdoutSink, StreamSink};
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role, TokenUsage};

pub use http_client::redact_error_message;

use codeforge_config::Config;
use std::sync::Arc;

/// Construct the backend named by `[llm].provider`.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` for an unknown provider and
/// `LlmError::Misconfiguration` when the API key is missing.
pub fn from_config(config: &Config) -> Result<Arc<dyn LlmBackend>, LlmError> {
    match config.provider() {
        "openai" => Ok(Arc::new(OpenAiBackend::new_from_config(config)?)),
        other => Err(LlmError::Unsupported(format!(
            "Unknown LLM provider '{other}'. Supported providers: openai"
        ))),
    }
}
