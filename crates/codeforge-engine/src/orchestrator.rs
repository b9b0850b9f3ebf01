use codeforge_llm::Conversation;
use codeforge_steps::{Step, StepContext, StepRegistry};
use codeforge_utils::error::ForgeError;
use codeforge_utils::logging::{log_step_complete, log_step_error, log_step_start, step_span};
use std::time::Instant;
use tracing::{Instrument, info};

/// One completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub duration_ms: u128,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pipeline: String,
    pub steps: Vec<StepRecord>,
}

impl RunSummary {
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    #[must_use]
    pub fn total_ms(&self) -> u128 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }
}

/// Runs pipelines from a registry, strictly in order.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: StepRegistry,
}

impl Orchestrator {
    #[must_use]
    pub fn new(registry: StepRegistry) -> Self {
        Self { registry }
    }

    /// Run pipeline `name`.
    ///
    /// The name is resolved before anything runs. Each step's conversation is
    /// written to the logs namespace as soon as the step returns, so a failed
    /// run leaves the logs of every completed step behind.
    ///
    /// # Errors
    ///
    /// `ForgeError::PipelineNotFound` for an unknown name; otherwise the
    /// first step failure wrapped in `ForgeError::Step`.
    pub async fn run(&self, name: &str, ctx: &StepContext<'_>) -> Result<RunSummary, ForgeError> {
        let steps = self.registry.resolve(name)?;
        info!(
            pipeline = %name,
            steps = steps.len(),
            model = %ctx.ai.model(),
            "Running pipeline"
        );

        let mut summary = RunSummary {
            pipeline: name.to_string(),
            steps: Vec::with_capacity(steps.len()),
        };

        for step in steps {
            let record = run_step(name, step.as_ref(), ctx)
                .instrument(step_span(name, step.name()))
                .await?;
            summary.steps.push(record);
        }

        info!(
            pipeline = %name,
            steps = summary.steps.len(),
            duration_ms = %summary.total_ms(),
            "Pipeline finished"
        );
        Ok(summary)
    }
}

async fn run_step(
    pipeline: &str,
    step: &dyn Step,
    ctx: &StepContext<'_>,
) -> Result<StepRecord, ForgeError> {
    let started = Instant::now();
    log_step_start(pipeline, step.name());

    let result = match step.run(ctx).await {
        Ok(conversation) => write_log(step.name(), &conversation, ctx),
        Err(e) => Err(e),
    };
    let duration_ms = started.elapsed().as_millis();

    match result {
        Ok(()) => {
            log_step_complete(pipeline, step.name(), duration_ms);
            Ok(StepRecord {
                name: step.name().to_string(),
                duration_ms,
            })
        }
        Err(e) => {
            log_step_error(pipeline, step.name(), &e.to_string(), duration_ms);
            Err(ForgeError::in_step(step.name(), e))
        }
    }
}

fn write_log(
    step: &str,
    conversation: &Conversation,
    ctx: &StepContext<'_>,
) -> Result<(), ForgeError> {
    let json = conversation.to_json().map_err(|e| ForgeError::CorruptLog {
        key: step.to_string(),
        reason: e.to_string(),
    })?;
    ctx.dbs.logs.write(step, &json)?;
    Ok(())
}
