use codeforge_llm::{Conversation, Message};
use codeforge_utils::error::ForgeError;
use tracing::debug;

use super::StepContext;

/// Appended to every operator answer so the model either asks its next
/// question or says it has none.
pub const CLARIFY_SUFFIX: &str = "\n\n\
Is anything else unclear? If yes, only answer in the form:\n\
{remaining unclear areas} remaining questions.\n\
{Next question}\n\
If everything is sufficiently clear, only answer \"no\".";

const OPERATOR_PROMPT: &str = "(answer in text, or \"q\" to move on)";

/// Where the clarification dialogue stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarifyState {
    /// `prompt` is about to be sent as the next user turn.
    AwaitingModelReply { prompt: String },
    /// The model asked something; the operator has to answer.
    AwaitingOperatorInput,
    Done,
}

impl ClarifyState {
    /// State after the model replied with `reply`.
    #[must_use]
    pub fn after_reply(reply: &str) -> Self {
        if reply.trim().to_lowercase().starts_with("no") {
            Self::Done
        } else {
            Self::AwaitingOperatorInput
        }
    }

    /// State after the operator answered with `answer`.
    #[must_use]
    pub fn after_answer(answer: &str) -> Self {
        if answer.is_empty() || answer == "q" {
            Self::Done
        } else {
            Self::AwaitingModelReply {
                prompt: format!("{answer}{CLARIFY_SUFFIX}"),
            }
        }
    }
}

pub(super) async fn clarify(ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
    let mut conversation = Conversation::new().with(Message::system(ctx.identity("qa")?));
    let mut state = ClarifyState::AwaitingModelReply {
        prompt: ctx.identity("main_prompt")?,
    };

    loop {
        state = match state {
            ClarifyState::AwaitingModelReply { prompt } => {
                conversation = ctx.ai.next(conversation, Some(prompt.as_str())).await?;
                let reply = conversation.last_content().unwrap_or_default();
                if !ctx.ai.streams() {
                    ctx.operator.say(reply);
                }
                ClarifyState::after_reply(reply)
            }
            ClarifyState::AwaitingOperatorInput => {
                let answer = ctx.operator.ask(OPERATOR_PROMPT).await?;
                ClarifyState::after_answer(&answer)
            }
            ClarifyState::Done => break,
        };
        debug!(state = ?state, "Clarify transition");
    }

    Ok(conversation)
}
