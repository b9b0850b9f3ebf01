use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::exit_codes::ExitCode;

/// Library-level error type for codeforge runs.
///
/// Every failure that can abort a pipeline run is expressed here. Steps never
/// recover from a lower-level failure: the error unwinds to the orchestrator,
/// which wraps it in [`ForgeError::Step`] and stops the run. Whatever was
/// already written to the memory, logs and workspace namespaces stays on disk.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 3 | Unknown pipeline name |
/// | 4 | Missing artifact in a namespace |
/// | 70 | Model backend failure |
/// | 1 | Other errors |
///
/// Library code returns `ForgeError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown pipeline '{name}'")]
    PipelineNotFound { name: String, available: Vec<String> },

    #[error("Step {step} failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<ForgeError>,
    },

    #[error("Failed to run generated entrypoint: {reason}")]
    Execution { reason: String },

    #[error("Conversation log '{key}' is unreadable: {reason}")]
    CorruptLog { key: String, reason: String },
}

impl ForgeError {
    /// Wrap an error raised inside a named step.
    #[must_use]
    pub fn in_step(step: impl Into<String>, source: ForgeError) -> Self {
        Self::Step {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through step wrappers.
    #[must_use]
    pub fn root(&self) -> &ForgeError {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self.root() {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::PipelineNotFound { .. } => ExitCode::PIPELINE_NOT_FOUND,
            Self::Store(StoreError::NotFound { .. }) => ExitCode::ARTIFACT_MISSING,
            Self::Llm(_) => ExitCode::LLM_FAILURE,
            _ => ExitCode::INTERNAL,
        }
    }

    /// Render the error with its category, context and suggestions for the
    /// operator.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("Error: {}", self.user_message());
        out.push_str(&format!("\n\nCategory: {}", self.category()));
        if let Some(context) = self.context() {
            out.push_str(&format!("\n\n{context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for s in suggestions {
                out.push_str(&format!("\n  - {s}"));
            }
        }
        out
    }
}

/// Trait for errors that can be explained to the person running the tool
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get additional context about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    StepExecution,
    ModelBackend,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::StepExecution => write!(f, "Step Execution"),
            Self::ModelBackend => write!(f, "Model Backend"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

impl UserFriendlyError for ForgeError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Io(e) => format!("File operation failed: {e}"),
            Self::PipelineNotFound { name, .. } => format!("No pipeline named '{name}'"),
            Self::Step { step, source } => {
                format!("Step '{step}' failed: {}", source.user_message())
            }
            Self::Execution { reason } => {
                format!("Could not run the generated entrypoint: {reason}")
            }
            Self::CorruptLog { key, reason } => {
                format!("The stored conversation '{key}' could not be parsed: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Store(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::Io(_) => None,
            Self::PipelineNotFound { available, .. } => {
                Some(format!("Available pipelines: {}", available.join(", ")))
            }
            Self::Step { source, .. } => source.context(),
            Self::Execution { .. } => Some(
                "The entrypoint is executed with bash from the workspace directory.".to_string(),
            ),
            Self::CorruptLog { .. } => Some(
                "Logs are JSON arrays of {role, content} objects written after each step."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Store(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::Io(_) => vec!["Check permissions on the project directory".to_string()],
            Self::PipelineNotFound { .. } => vec![
                "Pass one of the available pipeline names to --steps".to_string(),
                "Declare custom pipelines under [pipelines] in .codeforge/config.toml".to_string(),
            ],
            Self::Step { source, .. } => {
                let mut s = source.suggestions();
                s.push(
                    "Completed steps left their output in memory/ and memory/logs/; rerun with a \
                     narrower pipeline such as execute_only to resume"
                        .to_string(),
                );
                s
            }
            Self::Execution { .. } => vec!["Check that bash is installed and in PATH".to_string()],
            Self::CorruptLog { .. } => vec![
                "Rerun the step that produces this log, or start over with --delete-existing"
                    .to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::PipelineNotFound { .. } => ErrorCategory::Configuration,
            Self::Store(_) | Self::Io(_) | Self::CorruptLog { .. } => ErrorCategory::FileSystem,
            Self::Llm(_) => ErrorCategory::ModelBackend,
            Self::Step { source, .. } => source.category(),
            Self::Execution { .. } => ErrorCategory::StepExecution,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Pipeline '{pipeline}' references unknown step '{step}'")]
    UnknownStep { pipeline: String, step: String },

    #[error("Pipeline '{pipeline}' has no steps")]
    EmptyPipeline { pipeline: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => format!("Configuration file has invalid format: {reason}"),
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::UnknownStep { pipeline, step } => {
                format!("Pipeline '{pipeline}' lists a step that does not exist: '{step}'")
            }
            Self::EmptyPipeline { pipeline } => format!("Pipeline '{pipeline}' is empty"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => Some(
                "codeforge searches for .codeforge/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::UnknownStep { .. } | Self::EmptyPipeline { .. } => {
                Some("Every pipeline needs at least one known step.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => {
                vec!["Check the TOML syntax of the configuration file".to_string()]
            }
            Self::InvalidValue { .. } => {
                vec!["Remove the option to use the built-in default".to_string()]
            }
            Self::NotFound { .. } => vec![
                "Create .codeforge/config.toml in your project root".to_string(),
                "Use CLI flags instead of a configuration file".to_string(),
            ],
            Self::UnknownStep { .. } => vec![
                "Use step names such as gen_spec, gen_code, gen_entrypoint, execute_entrypoint"
                    .to_string(),
            ],
            Self::EmptyPipeline { .. } => vec!["Add at least one step to the pipeline".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors raised by file-backed artifact namespaces
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key '{key}' not found in {namespace} namespace")]
    NotFound { namespace: String, key: String },

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { namespace, key } => {
                format!("'{key}' is missing from the {namespace} directory")
            }
            Self::InvalidKey { key, reason } => format!("Refusing to use path '{key}': {reason}"),
            Self::Io { path, source } => format!("Could not access {}: {source}", path.display()),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::NotFound { namespace, .. } if namespace == "logs" || namespace == "memory" => Some(
                "Later steps read what earlier steps stored; the step that writes this key has not run yet."
                    .to_string(),
            ),
            Self::NotFound { namespace, .. } if namespace == "identity" => Some(
                "Identity files are copied from the agent template named by --agent.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { .. } => vec![
                "Run a pipeline that produces this artifact first".to_string(),
                "Check the project path and --run-prefix".to_string(),
            ],
            Self::InvalidKey { .. } => vec!["Use a relative path without '..'".to_string()],
            Self::Io { .. } => vec!["Check permissions on the project directory".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::FileSystem
    }
}

/// Errors that can occur during LLM backend operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => format!("LLM invocation timed out after {duration:?}"),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            Self::ProviderQuota(_) => Some(
                "Quota errors occur when rate limits or usage limits are exceeded.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) | Self::ProviderOutage(_) => vec![
                "Verify network connectivity and the configured base_url".to_string(),
                "Wait a few minutes and try again".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the API key environment variable is set (default OPENAI_API_KEY)"
                    .to_string(),
                "A .env file in the working directory is loaded automatically".to_string(),
            ],
            Self::ProviderQuota(_) => vec!["Wait a few minutes and try again".to_string()],
            Self::Timeout { .. } => {
                vec!["Increase timeout_secs in the [llm] section of the configuration".to_string()]
            }
            Self::Misconfiguration(_) | Self::Unsupported(_) => {
                vec!["Review the [llm] section of .codeforge/config.toml".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::ModelBackend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let err = ForgeError::Config(ConfigError::InvalidFile("bad".to_string()));
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);

        let err = ForgeError::PipelineNotFound {
            name: "nope".to_string(),
            available: vec!["default".to_string()],
        };
        assert_eq!(err.to_exit_code(), ExitCode::PIPELINE_NOT_FOUND);

        let err = ForgeError::Llm(LlmError::ProviderQuota("slow down".to_string()));
        assert_eq!(err.to_exit_code(), ExitCode::LLM_FAILURE);
    }

    #[test]
    fn test_step_wrapper_maps_through_to_root() {
        let inner = ForgeError::Store(StoreError::NotFound {
            namespace: "memory".to_string(),
            key: "specification".to_string(),
        });
        let err = ForgeError::in_step("gen_unit_tests", inner);

        assert!(matches!(err.root(), ForgeError::Store(e) if e.is_not_found()));
        assert_eq!(err.to_exit_code(), ExitCode::ARTIFACT_MISSING);
        assert_eq!(err.category(), ErrorCategory::FileSystem);
        assert!(err.to_string().contains("gen_unit_tests"));
    }

    #[test]
    fn test_display_for_user_lists_available_pipelines() {
        let err = ForgeError::PipelineNotFound {
            name: "tdd++".to_string(),
            available: vec!["default".to_string(), "tdd".to_string()],
        };
        let rendered = err.display_for_user();

        assert!(rendered.starts_with("Error: No pipeline named 'tdd++'"));
        assert!(rendered.contains("Available pipelines: default, tdd"));
        assert!(rendered.contains("Suggestions:"));
    }

    #[test]
    fn test_display_for_user_names_root_category() {
        let err = ForgeError::in_step(
            "gen_spec",
            ForgeError::Llm(LlmError::ProviderAuth("bad key".to_string())),
        );
        assert!(err.display_for_user().contains("Category: Model Backend"));

        let err = ForgeError::Execution {
            reason: "bash missing".to_string(),
        };
        assert!(err.display_for_user().contains("Category: Step Execution"));
    }

    #[test]
    fn test_step_suggestions_mention_resume() {
        let err = ForgeError::in_step(
            "gen_code",
            ForgeError::Llm(LlmError::Transport("connection reset".to_string())),
        );
        let suggestions = err.suggestions();
        assert!(suggestions.iter().any(|s| s.contains("execute_only")));
    }
}
