//! Turning free-form model replies into files.
//!
//! Models are asked to emit each file as a path label line followed by a
//! fenced code block. They do not always comply, so parsing is a lenient
//! regex scan: anything that does not look like a labelled block is skipped,
//! and a reply without recognizable blocks simply produces no files.

use codeforge_store::Db;
use codeforge_utils::error::StoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};
use tracing::{debug, warn};

/// Workspace key holding the full text of the most recent materialized reply.
pub const ALL_OUTPUT_KEY: &str = "all_output.txt";

/// A whole label line, optional blank lines, an opening fence with an
/// optional info string, then everything up to the next closing fence.
static LABELLED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^([^\n]*)\n(?:[ \t]*\n)*[ \t]*```[^\n]*\n(.*?)```").expect("static regex")
});

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\S*\n(.+?)```").expect("static regex"));

/// `File:`, `Filename:` or `Path:` in front of the actual path.
static LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:file(?:name)?|path)\s*:\s*").expect("static regex"));

/// Markdown decoration models wrap around path labels.
const DECORATION: &[char] = &['*', '`', '[', ']', '#', '"', '\'', ' ', '\t'];

/// Characters that never appear in a path we are willing to write.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*', '`', '[', ']', '\\'];

/// Extensionless file names that still count as paths.
const BARE_FILE_NAMES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "Procfile",
    "Gemfile",
    "Rakefile",
    "Jenkinsfile",
    "Vagrantfile",
    "LICENSE",
];

/// Extract `(path, content)` pairs from `text`.
///
/// Content excludes the fences and the single newline before the closing
/// fence. A block is kept only when the whole line above it reads as a
/// relative file path; prose such as "Here is the code:" is skipped.
#[must_use]
pub fn parse_chat(text: &str) -> Vec<(String, String)> {
    LABELLED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| {
            let label = caps.get(1)?.as_str();
            let body = caps.get(2)?.as_str();
            let Some(path) = clean_label(label) else {
                debug!(label = %label.trim(), "Skipping code block without a usable path");
                return None;
            };
            let content = body
                .strip_suffix('\n')
                .map(|b| b.strip_suffix('\r').unwrap_or(b))
                .unwrap_or(body);
            Some((path, content.to_string()))
        })
        .collect()
}

fn clean_label(line: &str) -> Option<String> {
    let line = line.trim();
    let line = LABEL_PREFIX.replace(line, "");
    let label = line.trim_matches(DECORATION);
    let label = label.strip_suffix(':').unwrap_or(label);
    let label = label.trim_matches(DECORATION);
    let label = label.strip_prefix("./").unwrap_or(label);

    if label.is_empty()
        || label.contains(char::is_whitespace)
        || label.contains(FORBIDDEN)
        || label.ends_with(['.', '/'])
    {
        return None;
    }
    if !looks_like_path(label) || !is_safe_relative(label) {
        return None;
    }
    Some(label.to_string())
}

fn looks_like_path(label: &str) -> bool {
    label.contains(['.', '/']) || BARE_FILE_NAMES.contains(&label)
}

fn is_safe_relative(path: &str) -> bool {
    if path.starts_with('/') {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Why `path` cannot be written as a file inside `root` without clobbering
/// something, if anything.
fn blocked_by_existing(root: &Path, path: &str) -> Option<&'static str> {
    let target = root.join(path);
    if target.is_dir() {
        return Some("an existing directory has this name");
    }
    let mut ancestor = target.parent();
    while let Some(dir) = ancestor {
        if dir == root {
            break;
        }
        if dir.is_file() {
            return Some("a parent component is an existing file");
        }
        ancestor = dir.parent();
    }
    None
}

/// Write every file parsed from `text` into `workspace`.
///
/// Existing files at the same paths are overwritten; other files are left
/// alone. A path that would collide with an existing directory, or that
/// runs through an existing file, is skipped. Returns the written keys in
/// the order they appeared.
///
/// # Errors
///
/// IO failures of the writes themselves.
pub fn to_files(text: &str, workspace: &Db) -> Result<Vec<String>, StoreError> {
    let files = parse_chat(text);
    let mut written = Vec::with_capacity(files.len());
    for (path, content) in files {
        if let Some(reason) = blocked_by_existing(workspace.path(), &path) {
            warn!(path = %path, reason, "Skipping generated file");
            continue;
        }
        workspace.write(&path, &content)?;
        written.push(path);
    }
    debug!(count = written.len(), "Materialized files");
    Ok(written)
}

/// Store the whole reply under [`ALL_OUTPUT_KEY`], then materialize its files.
pub fn materialize_reply(text: &str, workspace: &Db) -> Result<Vec<String>, StoreError> {
    workspace.write(ALL_OUTPUT_KEY, text)?;
    to_files(text, workspace)
}

/// Inner text of every fenced block in `text`, labelled or not.
#[must_use]
pub fn extract_code_blocks(text: &str) -> Vec<String> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}
