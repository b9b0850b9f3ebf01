//! Logging infrastructure for codeforge
//!
//! Structured logging through `tracing`. Step-level helpers keep the field
//! names consistent so a run can be followed with `RUST_LOG=codeforge=debug`.

use std::io::IsTerminal;
use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// The filter used when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "codeforge=debug,info"
    } else {
        "codeforge=info,warn"
    }
}

/// Initialize the tracing subscriber.
///
/// Log lines go to stderr so that streamed model output on stdout stays
/// readable. `RUST_LOG` overrides the default filter.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false);

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                layer
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.with_target(false).compact())
            .try_init()?;
    }

    Ok(())
}

/// Span covering one step of a pipeline run
pub fn step_span(pipeline: &str, step: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "step_execution",
        pipeline = %pipeline,
        step = %step,
    )
}

pub fn log_step_start(pipeline: &str, step: &str) {
    info!(pipeline = %pipeline, step = %step, "Starting step");
}

pub fn log_step_complete(pipeline: &str, step: &str, duration_ms: u128) {
    info!(
        pipeline = %pipeline,
        step = %step,
        duration_ms = %duration_ms,
        "Step completed"
    );
}

pub fn log_step_error(pipeline: &str, step: &str, error: &str, duration_ms: u128) {
    error!(
        pipeline = %pipeline,
        step = %step,
        duration_ms = %duration_ms,
        error = %error,
        "Step failed"
    );
}
