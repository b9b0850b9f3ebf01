use codeforge_config::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::LlmError;
use crate::conversation::Conversation;
use crate::sink::{NullSink, StreamSink};
use crate::types::{LlmBackend, LlmInvocation, Message};

/// A backend bound to one set of model parameters.
///
/// Each call to [`Ai::start`] or [`Ai::next`] performs exactly one model
/// invocation and returns the conversation extended by the assistant reply.
#[derive(Clone)]
pub struct Ai {
    backend: Arc<dyn LlmBackend>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    stream: bool,
    sink: Arc<dyn StreamSink>,
}

impl std::fmt::Debug for Ai {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ai")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl Ai {
    /// Parameters default to temperature 0.1, no token cap, no streaming.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature: 0.1,
            max_tokens: None,
            timeout: Duration::from_secs(600),
            stream: false,
            sink: Arc::new(NullSink),
        }
    }

    /// Parameters from `config`; `model` is the already resolved model name.
    #[must_use]
    pub fn from_config(
        backend: Arc<dyn LlmBackend>,
        model: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self::new(backend, model)
            .with_temperature(config.temperature())
            .with_max_tokens(config.max_tokens())
            .with_timeout(config.timeout())
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stream replies into `sink` while they are generated.
    #[must_use]
    pub fn with_stream_sink(mut self, sink: Arc<dyn StreamSink>) -> Self {
        self.stream = true;
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether replies are already shown to the operator as they stream.
    #[must_use]
    pub fn streams(&self) -> bool {
        self.stream
    }

    /// Open a conversation with a system and a user message.
    pub async fn start(&self, system: &str, user: &str) -> Result<Conversation, LlmError> {
        let conversation = Conversation::from_messages(vec![
            Message::system(system),
            Message::user(user),
        ]);
        self.next(conversation, None).await
    }

    /// Append `prompt` as a user turn (when given and non-empty), invoke the
    /// model on the whole conversation and append its reply.
    pub async fn next(
        &self,
        mut conversation: Conversation,
        prompt: Option<&str>,
    ) -> Result<Conversation, LlmError> {
        if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
            conversation.push(Message::user(prompt));
        }

        let inv = LlmInvocation::new(
            self.model.clone(),
            self.timeout,
            conversation.messages().to_vec(),
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        debug!(
            model = %self.model,
            messages = conversation.len(),
            "Creating a new chat completion"
        );

        let result = if self.stream {
            self.backend
                .invoke_streaming(inv, self.sink.as_ref())
                .await?
        } else {
            self.backend.invoke(inv).await?
        };

        conversation.push(Message::assistant(result.text));
        debug!(messages = conversation.len(), "Chat completion finished");
        Ok(conversation)
    }
}

/// Pick `requested` if the backend can serve it, otherwise `fallback`.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` when neither model is usable, or the
/// backend's error if the availability probe itself fails.
pub async fn resolve_model(
    backend: &dyn LlmBackend,
    requested: &str,
    fallback: Option<&str>,
) -> Result<String, LlmError> {
    if backend.model_available(requested).await? {
        return Ok(requested.to_string());
    }

    match fallback.filter(|f| *f != requested) {
        Some(fallback) => {
            warn!(
                requested = %requested,
                fallback = %fallback,
                "Model not available for provided API key, reverting to fallback"
            );
            Ok(fallback.to_string())
        }
        None => Err(LlmError::Misconfiguration(format!(
            "Model '{requested}' is not available for the provided API key"
        ))),
    }
}
