//! Orchestrator runs against scripted collaborators.

use async_trait::async_trait;
use codeforge_engine::Orchestrator;
use codeforge_llm::test_support::ScriptedBackend;
use codeforge_llm::{Ai, Conversation, Message};
use codeforge_steps::test_support::{RecordingRunner, ScriptedOperator};
use codeforge_steps::{Step, StepContext, StepRegistry};
use codeforge_store::{Dbs, RunLayout};
use codeforge_utils::error::{ForgeError, LlmError};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct Project {
    _temp: TempDir,
    dbs: Dbs,
}

fn project() -> Project {
    let temp = TempDir::new().unwrap();
    let layout = RunLayout::new(&temp.path().join("todo"), "", &temp.path().join("agents"));
    let dbs = Dbs::open(&layout).unwrap();
    for key in [
        "create",
        "philosophy",
        "main_prompt",
        "spec",
        "tests",
        "install",
        "improve",
    ] {
        dbs.identity.write(key, &key.to_uppercase()).unwrap();
    }
    Project { _temp: temp, dbs }
}

/// Step that only records that it ran.
struct Probe {
    name: &'static str,
    trace: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Step for Probe {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _ctx: &StepContext<'_>) -> Result<Conversation, ForgeError> {
        self.trace.lock().unwrap().push(self.name);
        Ok(Conversation::new().with(Message::assistant(self.name)))
    }
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn runs_steps_in_registered_order() {
    let p = project();
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut registry = StepRegistry::builtin();
    let probes: Vec<Arc<dyn Step>> = ["third", "first", "second"]
        .into_iter()
        .map(|name| {
            Arc::new(Probe {
                name,
                trace: trace.clone(),
            }) as Arc<dyn Step>
        })
        .collect();
    registry.register("probe", probes).unwrap();

    let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()));
    let ai = Ai::new(backend, "gpt-4");
    let operator = ScriptedOperator::default();
    let runner = RecordingRunner::default();
    let ctx = StepContext::new(&ai, &p.dbs, &operator, &runner);

    let summary = Orchestrator::new(registry).run("probe", &ctx).await.unwrap();

    assert_eq!(*trace.lock().unwrap(), vec!["third", "first", "second"]);
    assert_eq!(summary.step_names(), vec!["third", "first", "second"]);
    let logged = Conversation::from_json(&p.dbs.logs.read("first").unwrap()).unwrap();
    assert_eq!(logged.last_content(), Some("first"));
}

#[tokio::test]
async fn tdd_pipeline_end_to_end() {
    let p = project();
    let backend = Arc::new(ScriptedBackend::new([
        "the specification",
        "test_todo.py\n```\ndef test_add(): pass\n```",
        "todo.py\n```\ndef add(): pass\n```",
        "```bash\npython -m pytest\n```",
    ]));
    let ai = Ai::new(backend.clone(), "gpt-4");
    let operator = ScriptedOperator::new(["yes"]);
    let runner = RecordingRunner::default();
    let ctx = StepContext::new(&ai, &p.dbs, &operator, &runner);

    let summary = Orchestrator::new(StepRegistry::builtin())
        .run("tdd", &ctx)
        .await
        .unwrap();

    assert_eq!(
        summary.step_names(),
        vec![
            "gen_spec",
            "gen_unit_tests",
            "gen_code",
            "gen_entrypoint",
            "execute_entrypoint"
        ]
    );
    let prompts: Vec<String> = backend
        .invocations()
        .iter()
        .map(|inv| inv.messages.last().unwrap().content.clone())
        .collect();
    assert_eq!(prompts[0], "SPEC");
    assert_eq!(prompts[1], "TESTS");
    assert_eq!(prompts[2], "CREATE");
    assert!(prompts[3].starts_with("Information about the codebase:"));

    for step in summary.step_names() {
        assert!(p.dbs.logs.contains(step), "missing log for {step}");
    }
    assert_eq!(p.dbs.logs.read("execute_entrypoint").unwrap(), "[]");
    assert_eq!(p.dbs.workspace.read("todo.py").unwrap(), "def add(): pass");
    assert_eq!(p.dbs.workspace.read("run.sh").unwrap(), "python -m pytest\n");
    assert_eq!(runner.calls().len(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn unknown_pipeline_fails_before_any_step() {
    let p = project();
    let backend = Arc::new(ScriptedBackend::new(["never used"]));
    let ai = Ai::new(backend.clone(), "gpt-4");
    let operator = ScriptedOperator::default();
    let runner = RecordingRunner::default();
    let ctx = StepContext::new(&ai, &p.dbs, &operator, &runner);

    let err = Orchestrator::new(StepRegistry::builtin())
        .run("tdd++", &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, ForgeError::PipelineNotFound { ref name, .. } if name == "tdd++"));
    assert!(backend.invocations().is_empty());
    assert!(p.dbs.logs.keys().unwrap().is_empty());
}

#[tokio::test]
async fn step_failure_aborts_run_and_keeps_earlier_logs() {
    let p = project();
    let backend = Arc::new(ScriptedBackend::new(["only one reply"]));
    let ai = Ai::new(backend, "gpt-4");
    let operator = ScriptedOperator::default();
    let runner = RecordingRunner::default();
    let ctx = StepContext::new(&ai, &p.dbs, &operator, &runner);

    let err = Orchestrator::new(StepRegistry::builtin())
        .run("tdd", &ctx)
        .await
        .unwrap_err();

    let ForgeError::Step { ref step, .. } = err else {
        panic!("expected a step failure, got {err:?}");
    };
    assert_eq!(step, "gen_unit_tests");
    assert!(matches!(err.root(), ForgeError::Llm(LlmError::Transport(_))));
    assert_eq!(p.dbs.logs.keys().unwrap(), vec!["gen_spec"]);
    assert_eq!(
        p.dbs.memory.read("specification").unwrap(),
        "only one reply"
    );
}

#[tokio::test]
async fn execute_only_resumes_from_existing_workspace() {
    let p = project();
    p.dbs
        .workspace
        .write("all_output.txt", "main.py\n```\nprint(1)\n```")
        .unwrap();
    let backend = Arc::new(ScriptedBackend::new(["```\npython main.py\n```"]));
    let ai = Ai::new(backend, "gpt-4");
    let operator = ScriptedOperator::new(["no"]);
    let runner = RecordingRunner::default();
    let ctx = StepContext::new(&ai, &p.dbs, &operator, &runner);

    let summary = Orchestrator::new(StepRegistry::builtin())
        .run("execute_only", &ctx)
        .await
        .unwrap();

    assert_eq!(summary.steps.len(), 2);
    assert!(runner.calls().is_empty());
    assert_eq!(p.dbs.workspace.read("run.sh").unwrap(), "python main.py\n");
}
