use codeforge_llm::{Conversation, Message};
use codeforge_utils::error::ForgeError;
use tracing::info;

use super::{StepContext, StepKind};
use crate::materialize::materialize_reply;

/// Memory key of the generated specification.
pub const SPECIFICATION_KEY: &str = "specification";
/// Memory key of the generated unit tests.
pub const TESTS_KEY: &str = "tests";

fn materialize_last(ctx: &StepContext<'_>, conversation: &Conversation) -> Result<(), ForgeError> {
    let reply = conversation.last_content().unwrap_or_default();
    let files = materialize_reply(reply, &ctx.dbs.workspace)?;
    info!(files = files.len(), "Wrote generated files to workspace");
    Ok(())
}

fn instructions(ctx: &StepContext<'_>) -> Result<String, ForgeError> {
    Ok(format!("Instructions: {}", ctx.identity("main_prompt")?))
}

fn outline(ctx: &StepContext<'_>) -> Result<String, ForgeError> {
    Ok(format!(
        "Outline:\n\n{}",
        ctx.dbs.memory.read(SPECIFICATION_KEY)?
    ))
}

pub(super) async fn gen_simple(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let conversation = ctx
        .ai
        .start(&ctx.setup_sys_prompt()?, &ctx.identity("main_prompt")?)
        .await?;
    materialize_last(ctx, &conversation)?;
    Ok(conversation)
}

pub(super) async fn gen_spec(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let conversation = Conversation::new()
        .with(Message::system(ctx.setup_sys_prompt()?))
        .with(Message::system(instructions(ctx)?));

    let conversation = ctx
        .ai
        .next(conversation, Some(ctx.identity("spec")?.as_str()))
        .await?;

    ctx.dbs
        .memory
        .write(SPECIFICATION_KEY, conversation.last_content().unwrap_or_default())?;
    Ok(conversation)
}

pub(super) async fn respec(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let conversation = ctx
        .logged_conversation(StepKind::GenSpec)?
        .with(Message::system(ctx.identity("respec")?));

    let conversation = ctx.ai.next(conversation, None).await?;
    let conversation = ctx
        .ai
        .next(conversation, Some(ctx.identity("check")?.as_str()))
        .await?;

    ctx.dbs
        .memory
        .write(SPECIFICATION_KEY, conversation.last_content().unwrap_or_default())?;
    Ok(conversation)
}

pub(super) async fn gen_unit_tests(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let conversation = Conversation::new()
        .with(Message::system(ctx.setup_sys_prompt()?))
        .with(Message::user(instructions(ctx)?))
        .with(Message::user(outline(ctx)?));

    let conversation = ctx
        .ai
        .next(conversation, Some(ctx.identity("tests")?.as_str()))
        .await?;

    let tests = conversation.last_content().unwrap_or_default();
    ctx.dbs.memory.write(TESTS_KEY, tests)?;
    materialize_last(ctx, &conversation)?;
    Ok(conversation)
}

pub(super) async fn gen_clarified_code(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let mut conversation = ctx.logged_conversation(StepKind::Clarify)?;
    conversation.replace_first(Message::system(ctx.setup_sys_prompt()?));

    let conversation = ctx
        .ai
        .next(conversation, Some(ctx.identity("create")?.as_str()))
        .await?;
    materialize_last(ctx, &conversation)?;
    Ok(conversation)
}

pub(super) async fn gen_code(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let conversation = Conversation::new()
        .with(Message::system(ctx.setup_sys_prompt()?))
        .with(Message::user(instructions(ctx)?))
        .with(Message::user(outline(ctx)?))
        .with(Message::user(format!(
            "Tests:\n\n{}",
            ctx.dbs.memory.read(TESTS_KEY)?
        )));

    let conversation = ctx
        .ai
        .next(conversation, Some(ctx.identity("create")?.as_str()))
        .await?;
    materialize_last(ctx, &conversation)?;
    Ok(conversation)
}

/// Shared shape of `fix_code` and `improve`: replay an earlier step's final
/// output under the improve instructions and ask for a revision.
async fn revise(
    ctx: &StepContext<'_>,
    source: StepKind,
    request: &str,
) -> Result<Conversation, ForgeError> {
    let previous = ctx.logged_output(source)?;
    let conversation = Conversation::new()
        .with(Message::system(ctx.setup_sys_prompt()?))
        .with(Message::user(instructions(ctx)?))
        .with(Message::user(previous))
        .with(Message::system(ctx.identity("improve")?));

    let conversation = ctx.ai.next(conversation, Some(request)).await?;
    materialize_last(ctx, &conversation)?;
    Ok(conversation)
}

pub(super) async fn fix_code(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    revise(ctx, StepKind::GenCode, "Please fix any errors in the code above.").await
}

pub(super) async fn improve(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    revise(ctx, StepKind::GenSimple, "Please improve the project above.").await
}

pub(super) async fn use_feedback(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let project = ctx.dbs.workspace.read(crate::materialize::ALL_OUTPUT_KEY)?;
    let feedback = ctx.dbs.input.read("feedback")?;

    let conversation = Conversation::new()
        .with(Message::system(ctx.setup_sys_prompt()?))
        .with(Message::user(format!("Project to Improve: {project}")))
        .with(Message::user(format!("Feedback: {feedback}")));

    let conversation = ctx
        .ai
        .next(conversation, Some(ctx.identity("use_feedback")?.as_str()))
        .await?;
    let conversation = ctx
        .ai
        .next(conversation, Some(ctx.identity("improve")?.as_str()))
        .await?;
    materialize_last(ctx, &conversation)?;
    Ok(conversation)
}
