//! The built-in steps.
//!
//! A step reads what earlier steps left in the namespaces, drives zero or
//! more model exchanges and returns the conversation it ended with. The
//! orchestrator logs that conversation under the step's name, which is how
//! later steps (and later runs) pick it up again.

mod clarify;
mod entrypoint;
mod generate;

use async_trait::async_trait;
use codeforge_llm::{Ai, Conversation};
use codeforge_store::Dbs;
use codeforge_utils::error::{ForgeError, StoreError};

use crate::operator::Operator;
use crate::runner::ScriptRunner;

pub use clarify::{CLARIFY_SUFFIX, ClarifyState};
pub use entrypoint::{ENTRYPOINT_KEY, ExecutionOutcome};
pub use generate::{SPECIFICATION_KEY, TESTS_KEY};

/// Everything a step may touch.
pub struct StepContext<'a> {
    pub ai: &'a Ai,
    pub dbs: &'a Dbs,
    pub operator: &'a dyn Operator,
    pub runner: &'a dyn ScriptRunner,
}

impl<'a> StepContext<'a> {
    #[must_use]
    pub fn new(
        ai: &'a Ai,
        dbs: &'a Dbs,
        operator: &'a dyn Operator,
        runner: &'a dyn ScriptRunner,
    ) -> Self {
        Self {
            ai,
            dbs,
            operator,
            runner,
        }
    }

    /// Text of an identity prompt file.
    pub fn identity(&self, key: &str) -> Result<String, StoreError> {
        self.dbs.identity.read(key)
    }

    /// System prompt shared by the generating steps.
    pub fn setup_sys_prompt(&self) -> Result<String, StoreError> {
        Ok(format!(
            "{}\nUseful to know:\n{}",
            self.identity("create")?,
            self.identity("philosophy")?
        ))
    }

    /// Conversation logged by an earlier run of `step`.
    pub fn logged_conversation(&self, step: StepKind) -> Result<Conversation, ForgeError> {
        let key = step.as_ref();
        let raw = self.dbs.logs.read(key)?;
        Conversation::from_json(&raw).map_err(|e| ForgeError::CorruptLog {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Final message of an earlier run of `step`.
    pub fn logged_output(&self, step: StepKind) -> Result<String, ForgeError> {
        let conversation = self.logged_conversation(step)?;
        conversation
            .last_content()
            .map(str::to_string)
            .ok_or_else(|| ForgeError::CorruptLog {
                key: step.as_ref().to_string(),
                reason: "conversation is empty".to_string(),
            })
    }
}

/// One named unit of pipeline work.
#[async_trait]
pub trait Step: Send + Sync {
    /// Unique name, also the key of the step's log entry.
    fn name(&self) -> &str;

    async fn run(&self, ctx: &StepContext<'_>) -> Result<Conversation, ForgeError>;
}

/// Identifier of every built-in step.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    GenSimple,
    Clarify,
    GenSpec,
    Respec,
    GenUnitTests,
    GenClarifiedCode,
    GenCode,
    FixCode,
    Improve,
    UseFeedback,
    GenEntrypoint,
    ExecuteEntrypoint,
    GenSummary,
}

#[async_trait]
impl Step for StepKind {
    fn name(&self) -> &str {
        self.as_ref()
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
        match self {
            Self::GenSimple => generate::gen_simple(ctx).await,
            Self::Clarify => clarify::clarify(ctx).await,
            Self::GenSpec => generate::gen_spec(ctx).await,
            Self::Respec => generate::respec(ctx).await,
            Self::GenUnitTests => generate::gen_unit_tests(ctx).await,
            Self::GenClarifiedCode => generate::gen_clarified_code(ctx).await,
            Self::GenCode => generate::gen_code(ctx).await,
            Self::FixCode => generate::fix_code(ctx).await,
            Self::Improve => generate::improve(ctx).await,
            Self::UseFeedback => generate::use_feedback(ctx).await,
            Self::GenEntrypoint => entrypoint::gen_entrypoint(ctx).await,
            Self::ExecuteEntrypoint => entrypoint::execute_entrypoint(ctx).await,
            Self::GenSummary => entrypoint::gen_summary(ctx).await,
        }
    }
}
