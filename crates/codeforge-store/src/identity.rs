//! Per-project identities built from agent templates.
//!
//! An identity is a copy of a template directory (`agents/coder`, say) under
//! `agents/<project>`, with `<tag>` placeholders in its prompt files replaced
//! by values from the project's `prompt.json`.

use codeforge_utils::error::{ConfigError, ForgeError, StoreError};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::Dbs;

/// Input key holding the tag values for an identity.
pub const PROMPT_TAGS_KEY: &str = "prompt.json";

/// What [`initialize_identity`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOutcome {
    /// No identity existed for the project; one was created.
    Built,
    /// A previous identity was replaced by a fresh copy of the template.
    Updated,
    /// The template directory does not exist; nothing was done.
    TemplateMissing,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Materialize `agent/<template_name>` as the identity for `project_name`.
///
/// The identity directory is replaced wholesale, then every file in it has
/// its `<key>` tags substituted from `input/prompt.json`. A missing template
/// is logged and reported as [`IdentityOutcome::TemplateMissing`].
pub fn initialize_identity(
    dbs: &Dbs,
    project_name: &str,
    template_name: &str,
) -> Result<IdentityOutcome, ForgeError> {
    let agents = dbs.agent.path();
    let template = agents.join(template_name);
    let identity = agents.join(project_name);

    if !template.is_dir() {
        warn!(
            template = %template_name,
            agents = %agents.display(),
            "Identity template not found"
        );
        return Ok(IdentityOutcome::TemplateMissing);
    }

    let tags = load_tags(dbs)?;
    let outcome = build_identity(&template, &identity, &tags)?;
    info!(
        project = %project_name,
        template = %template_name,
        outcome = ?outcome,
        "Identity ready"
    );
    Ok(outcome)
}

/// Read `prompt.json` from the input namespace as `<key>` -> value pairs.
fn load_tags(dbs: &Dbs) -> Result<Vec<(String, String)>, ForgeError> {
    let raw = match dbs.input.read(PROMPT_TAGS_KEY) {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => {
            warn!(
                path = %dbs.input.path().join(PROMPT_TAGS_KEY).display(),
                "No prompt.json in project; identity tags are left as-is"
            );
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let parsed: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
        ConfigError::InvalidFile(format!("{PROMPT_TAGS_KEY} must be a JSON object: {e}"))
    })?;

    Ok(parsed
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (format!("<{key}>"), text)
        })
        .collect())
}

/// Copy `template` to `identity` and substitute `tags` in every copied file.
///
/// When both paths are the same directory the template is edited in place.
pub fn build_identity(
    template: &Path,
    identity: &Path,
    tags: &[(String, String)],
) -> Result<IdentityOutcome, StoreError> {
    let same_dir = template == identity;
    let outcome = if identity.exists() && !same_dir {
        fs::remove_dir_all(identity).map_err(io_err(identity))?;
        IdentityOutcome::Updated
    } else {
        IdentityOutcome::Built
    };

    if !same_dir {
        copy_tree(template, identity)?;
    }
    replace_tags(identity, tags)?;
    Ok(outcome)
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), StoreError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(walk_err(from))?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(io_err(&target))?;
        }
    }
    Ok(())
}

/// Replace each tag with its value in every UTF-8 file under `root`.
pub fn replace_tags(root: &Path, tags: &[(String, String)]) -> Result<(), StoreError> {
    if tags.is_empty() {
        return Ok(());
    }

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(walk_err(root))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let bytes = fs::read(path).map_err(io_err(path))?;
        let Ok(original) = String::from_utf8(bytes) else {
            continue;
        };

        let replaced = tags
            .iter()
            .fold(original.clone(), |text, (tag, value)| text.replace(tag, value));
        if replaced != original {
            fs::write(path, replaced).map_err(io_err(path))?;
        }
    }
    Ok(())
}

fn walk_err(root: &Path) -> impl Fn(walkdir::Error) -> StoreError + '_ {
    move |e| StoreError::Io {
        path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
        source: e
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("directory walk failed")),
    }
}

/// Remove every identity directory under `agents` that is not a template.
///
/// Returns the removed names, sorted. A missing `agents` directory is not
/// an error.
pub fn clean_identity(agents: &Path, protected: &[String]) -> Result<Vec<String>, StoreError> {
    let entries = match fs::read_dir(agents) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: agents.to_path_buf(),
                source,
            });
        }
    };

    let mut doomed: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err(agents))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() && !protected.iter().any(|p| *p == name) {
            doomed.push((name, path));
        }
    }
    doomed.sort();

    let mut removed = Vec::with_capacity(doomed.len());
    for (name, path) in doomed {
        fs::remove_dir_all(&path).map_err(io_err(&path))?;
        info!(identity = %name, "Removed identity");
        removed.push(name);
    }
    Ok(removed)
}
