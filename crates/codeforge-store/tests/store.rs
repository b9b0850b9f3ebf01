//! Namespace behavior across a full run layout.

use codeforge_store::{Db, Dbs, RunLayout};
use codeforge_utils::error::StoreError;
use proptest::prelude::*;
use tempfile::TempDir;

fn open_run(prefix: &str) -> (TempDir, Dbs) {
    let temp = TempDir::new().unwrap();
    let layout = RunLayout::new(&temp.path().join("project"), prefix, &temp.path().join("agents"));
    let dbs = Dbs::open(&layout).unwrap();
    (temp, dbs)
}

// ============================================================================
// Overwrite semantics
// ============================================================================

#[test]
fn overwrite_leaves_other_keys_alone() {
    let (_temp, dbs) = open_run("");
    dbs.workspace.write("a.py", "print('a')").unwrap();
    dbs.workspace.write("b.py", "print('b')").unwrap();

    dbs.workspace.write("a.py", "print('A')").unwrap();

    assert_eq!(dbs.workspace.read("a.py").unwrap(), "print('A')");
    assert_eq!(dbs.workspace.read("b.py").unwrap(), "print('b')");
    assert_eq!(dbs.workspace.keys().unwrap(), vec!["a.py", "b.py"]);
}

#[test]
fn namespaces_are_isolated() {
    let (_temp, dbs) = open_run("");
    dbs.memory.write("specification", "spec").unwrap();

    let err = dbs.workspace.read("specification").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref namespace, .. } if namespace == "workspace"));
}

#[test]
fn run_prefix_separates_runs() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    let agents = temp.path().join("agents");
    let first = Dbs::open(&RunLayout::new(&project, "", &agents)).unwrap();
    let second = Dbs::open(&RunLayout::new(&project, "retry_", &agents)).unwrap();

    first.workspace.write("main.py", "v1").unwrap();

    assert!(!second.workspace.contains("main.py"));
    assert_eq!(first.input.path(), second.input.path());
}

#[test]
fn values_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("memory");
    Db::open("memory", &root).unwrap().write("tests", "t").unwrap();

    let reopened = Db::open("memory", &root).unwrap();
    assert_eq!(reopened.read("tests").unwrap(), "t");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn last_write_wins(
        key in "[a-z]{1,8}(/[a-z]{1,8}){0,2}(\\.[a-z]{1,3})?",
        first in "\\PC*",
        second in "\\PC*",
    ) {
        let (_temp, dbs) = open_run("");
        dbs.memory.write(&key, &first).unwrap();
        dbs.memory.write(&key, &second).unwrap();

        prop_assert_eq!(dbs.memory.read(&key).unwrap(), second);
        prop_assert!(dbs.memory.contains(&key));
    }
}
