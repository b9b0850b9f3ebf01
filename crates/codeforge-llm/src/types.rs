//! Wire-neutral chat types shared by every backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::LlmError;
use crate::sink::StreamSink;

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One chat turn. Serializes as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        Self { role, content }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A single completion request.
///
/// Sampling parameters left as `None` fall back to the backend's defaults.
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    pub model: String,
    pub messages: Vec<Message>,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            timeout,
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_temperature(self, temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..self
        }
    }

    #[must_use]
    pub fn with_max_tokens(self, max_tokens: Option<u32>) -> Self {
        Self { max_tokens, ..self }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
}

impl TokenUsage {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.prompt + self.completion
    }
}

/// The finished reply to an [`LlmInvocation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Full reply text, also when it was streamed.
    pub text: String,
    pub provider: String,
    /// Model name as echoed by the provider, which may be more specific
    /// than the one requested.
    pub model: String,
    pub usage: Option<TokenUsage>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model: model.into(),
            usage: None,
        }
    }

    #[must_use]
    pub fn with_usage(self, usage: TokenUsage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }
}

/// A chat completion provider.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send `inv` and wait for the whole reply.
    ///
    /// # Errors
    ///
    /// Any `LlmError`: transport, auth, quota, timeout or provider failure.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;

    /// Send `inv`, handing text to `sink` as it arrives.
    ///
    /// The default forwards the complete reply as one chunk, for backends
    /// that cannot stream.
    async fn invoke_streaming(
        &self,
        inv: LlmInvocation,
        sink: &dyn StreamSink,
    ) -> Result<LlmResult, LlmError> {
        let result = self.invoke(inv).await?;
        sink.on_chunk(&result.text);
        sink.on_complete();
        Ok(result)
    }

    /// Whether `model` can be used with the configured credentials.
    async fn model_available(&self, _model: &str) -> Result<bool, LlmError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_invocation_sampling_defaults_to_none() {
        let inv = LlmInvocation::new("gpt-4", Duration::from_secs(5), vec![Message::user("x")]);
        assert_eq!(inv.temperature, None);
        assert_eq!(inv.max_tokens, None);

        let inv = inv.with_temperature(0.1).with_max_tokens(Some(256));
        assert_eq!(inv.temperature, Some(0.1));
        assert_eq!(inv.max_tokens, Some(256));
        assert_eq!(inv.messages[0].role, Role::User);
    }

    #[test]
    fn test_usage_total() {
        let usage = TokenUsage {
            prompt: 7,
            completion: 2,
        };
        assert_eq!(usage.total(), 9);
        assert_eq!(LlmResult::new("t", "p", "m").with_usage(usage).usage, Some(usage));
    }
}
