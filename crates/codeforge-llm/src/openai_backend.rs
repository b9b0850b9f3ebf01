//! OpenAI-compatible chat completions backend
//!
//! Talks to `{base_url}/chat/completions`. Streaming replies arrive as
//! server-sent events and are forwarded to a [`StreamSink`] chunk by chunk.

use crate::LlmError;
use crate::http_client::{HttpClient, map_client_error, redact_error_message};
use crate::sink::StreamSink;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, TokenUsage};
use async_trait::async_trait;
use codeforge_config::Config;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "openai";

/// Upper bound for the model availability probe
const MODEL_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Sampling temperature when the invocation leaves it unset
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Backend for any server exposing the OpenAI chat completions API
#[derive(Clone)]
pub struct OpenAiBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl OpenAiBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        max_timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new(max_timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build from `[llm]` configuration, reading the key from `api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` when the key variable is unset.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key_env = config.api_key_env();
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!(
                    "API key not found in environment variable '{api_key_env}'. \
                     Set it, add it to .env, or configure a different api_key_env in [llm]."
                ))
            })?;

        Self::new(api_key, config.base_url(), config.timeout())
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request(&self, inv: &LlmInvocation, stream: bool) -> reqwest::RequestBuilder {
        let temperature = inv.temperature.unwrap_or(DEFAULT_TEMPERATURE);

        debug!(
            provider = PROVIDER,
            model = %inv.model,
            messages = inv.messages.len(),
            max_tokens = ?inv.max_tokens,
            temperature = temperature,
            stream = stream,
            "Creating chat completion"
        );

        let body = ChatRequest {
            model: &inv.model,
            messages: &inv.messages,
            max_tokens: inv.max_tokens,
            temperature,
            stream,
        };

        self.client
            .inner()
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let request = self.request(&inv, false);
        let response = self
            .client
            .execute_with_retry(request, inv.timeout, PROVIDER)
            .await?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!(
                "Failed to parse {PROVIDER} response: {}",
                redact_error_message(&e.to_string())
            ))
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Transport(format!("{PROVIDER} response missing choices[0]")))?;
        let content = choice.message.content.unwrap_or_default();

        let mut result = LlmResult::new(content, PROVIDER, body.model.unwrap_or(inv.model));
        if let Some(usage) = body.usage {
            result = result.with_usage(TokenUsage {
                prompt: usage.prompt_tokens,
                completion: usage.completion_tokens,
            });
        }

        debug!(
            provider = PROVIDER,
            prompt_tokens = ?result.usage.map(|u| u.prompt),
            completion_tokens = ?result.usage.map(|u| u.completion),
            "Chat completion finished"
        );
        Ok(result)
    }

    async fn invoke_streaming(
        &self,
        inv: LlmInvocation,
        sink: &dyn StreamSink,
    ) -> Result<LlmResult, LlmError> {
        let request = self.request(&inv, true);
        let mut response = self
            .client
            .execute_with_retry(request, inv.timeout, PROVIDER)
            .await?;

        let mut decoder = SseDecoder::new();
        let mut text = String::new();
        let forward = |events: Vec<SseEvent>, text: &mut String| {
            for event in events {
                if let SseEvent::Delta(chunk) = event {
                    sink.on_chunk(&chunk);
                    text.push_str(&chunk);
                }
            }
        };

        while !decoder.is_done() {
            let chunk = response.chunk().await.map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        duration: self.client.effective_timeout(inv.timeout),
                    }
                } else {
                    LlmError::Transport(format!(
                        "{PROVIDER} stream interrupted: {}",
                        redact_error_message(&e.to_string())
                    ))
                }
            })?;

            match chunk {
                Some(bytes) => forward(decoder.feed(&bytes)?, &mut text),
                None => {
                    forward(decoder.finish()?, &mut text);
                    break;
                }
            }
        }
        sink.on_complete();

        debug!(
            provider = PROVIDER,
            chars = text.len(),
            "Streamed chat completion finished"
        );
        Ok(LlmResult::new(text, PROVIDER, inv.model))
    }

    async fn model_available(&self, model: &str) -> Result<bool, LlmError> {
        let url = format!("{}/models/{model}", self.base_url);
        let response = self
            .client
            .inner()
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.client.effective_timeout(MODEL_PROBE_TIMEOUT))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        duration: MODEL_PROBE_TIMEOUT,
                    }
                } else {
                    LlmError::Transport(format!(
                        "{PROVIDER} model lookup failed: {}",
                        redact_error_message(&e.to_string())
                    ))
                }
            })?;

        let status = response.status();
        debug!(provider = PROVIDER, model = %model, status = status.as_u16(), "Model lookup");
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_client_error() => Err(map_client_error(s, PROVIDER)),
            s => Err(LlmError::ProviderOutage(format!(
                "{PROVIDER} returned server error: {s}"
            ))),
        }
    }
}

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Text appended to the reply
    Delta(String),
    /// The `[DONE]` sentinel
    Done,
}

/// Incremental decoder for chat completion event streams.
///
/// Network chunks may split lines (and UTF-8 sequences) anywhere, so bytes are
/// buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes and return every event completed by them.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Transport` for malformed payloads or an error event.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, LlmError> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = self.decode_line(&line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Result<Vec<SseEvent>, LlmError> {
        let line = std::mem::take(&mut self.buffer);
        Ok(self.decode_line(&line)?.into_iter().collect())
    }

    fn decode_line(&mut self, raw: &[u8]) -> Result<Option<SseEvent>, LlmError> {
        if self.done {
            return Ok(None);
        }

        let line = std::str::from_utf8(raw)
            .map_err(|e| LlmError::Transport(format!("{PROVIDER} stream is not UTF-8: {e}")))?
            .trim_end_matches(['\r', '\n']);

        let Some(payload) = line.strip_prefix("data:") else {
            // Comments, `event:` lines and blank separators carry no text.
            return Ok(None);
        };
        let payload = payload.trim_start();

        if payload == "[DONE]" {
            self.done = true;
            return Ok(Some(SseEvent::Done));
        }

        let chunk: StreamChunk = serde_json::from_str(payload).map_err(|e| {
            LlmError::Transport(format!("Malformed {PROVIDER} stream event: {e}"))
        })?;

        if let Some(error) = chunk.error {
            return Err(LlmError::Transport(format!(
                "{PROVIDER} stream error: {}",
                error.message
            )));
        }

        let text: String = chunk
            .choices
            .into_iter()
            .filter_map(|c| c.delta.content)
            .collect();
        Ok((!text.is_empty()).then_some(SseEvent::Delta(text)))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}
