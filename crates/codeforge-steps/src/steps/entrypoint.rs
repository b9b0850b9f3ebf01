use codeforge_llm::Conversation;
use codeforge_utils::error::ForgeError;
use tracing::{info, warn};

use super::StepContext;
use crate::materialize::{ALL_OUTPUT_KEY, extract_code_blocks};
use crate::runner::ScriptOutcome;

/// Workspace key of the generated entrypoint script.
pub const ENTRYPOINT_KEY: &str = "run.sh";

/// What happened when the operator was offered the entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Declined,
    Executed(ScriptOutcome),
}

pub(super) async fn gen_entrypoint(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let codebase = ctx.dbs.workspace.read(ALL_OUTPUT_KEY)?;
    let conversation = ctx
        .ai
        .start(
            &ctx.identity("install")?,
            &format!("Information about the codebase:\n\n{codebase}"),
        )
        .await?;

    let script = extract_code_blocks(conversation.last_content().unwrap_or_default()).join("\n");
    if script.is_empty() {
        warn!("Model reply contained no code blocks; run.sh is empty");
    }
    ctx.dbs.workspace.write(ENTRYPOINT_KEY, &script)?;
    Ok(conversation)
}

pub(super) async fn execute_entrypoint(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let outcome = offer_execution(ctx).await?;
    match outcome {
        ExecutionOutcome::Declined => info!("Entrypoint not executed"),
        ExecutionOutcome::Executed(script) if script.success() => info!("Entrypoint finished"),
        ExecutionOutcome::Executed(script) => {
            warn!(exit_code = ?script.exit_code, "Entrypoint exited unsuccessfully");
        }
    }
    Ok(Conversation::new())
}

/// Show the script and run it only on an explicit `yes`.
async fn offer_execution(ctx: &StepContext<'_>) -> Result<ExecutionOutcome, ForgeError> {
    let command = ctx.dbs.workspace.read(ENTRYPOINT_KEY)?;

    ctx.operator.say("Do you want to execute this code?");
    ctx.operator.say("");
    ctx.operator.say(&command);
    ctx.operator.say("");
    let answer = ctx
        .operator
        .ask("If yes, type \"yes\" and press enter. Anything else skips execution.")
        .await?;

    if answer != "yes" {
        ctx.operator.say("Ok, not executing the code.");
        return Ok(ExecutionOutcome::Declined);
    }

    ctx.operator.say("Executing the code...");
    let outcome = ctx
        .runner
        .run(ENTRYPOINT_KEY, ctx.dbs.workspace.path())
        .await?;
    Ok(ExecutionOutcome::Executed(outcome))
}

pub(super) async fn gen_summary(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let project = ctx.dbs.workspace.read(ALL_OUTPUT_KEY)?;
    let conversation = ctx
        .ai
        .start(
            &ctx.identity("summary")?,
            &format!("Information about the project:\n\n{project}"),
        )
        .await?;

    if !ctx.ai.streams() {
        ctx.operator.say(conversation.last_content().unwrap_or_default());
    }
    Ok(conversation)
}
