//! Change discovery: which files a run should look at, in order.

use std::path::Path;
use std::process::Command;
use tracing::{error, info};

use crate::error::{Result, SyncError};

pub const DEFAULT_DOCS_PREFIX: &str = "sdk-docs/";

fn is_markdown(path: &str) -> bool {
    path.ends_with(".md")
}

/// Read a newline-separated change list, keeping only Markdown paths.
///
/// A missing file means nothing changed.
pub fn read_change_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No change list found, nothing to sync");
            return Ok(Vec::new());
        }
        Err(e) => return Err(SyncError::io(path, e)),
    };
    let files: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && is_markdown(line))
        .map(String::from)
        .collect();
    info!(path = %path.display(), count = files.len(), "Read change list");
    Ok(files)
}

/// Split an explicit comma-separated file list.
pub fn parse_file_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// Markdown files under `prefix` changed between `base` and `head` in the checkout at `repo`.
///
/// Deleted files are included; the orchestrator decides what to do with them.
pub fn git_changed_files(repo: &Path, base: &str, head: &str, prefix: &str) -> Result<Vec<String>> {
    let pathspec = format!("{prefix}**/*.md");
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["diff", "--name-only", base, head, "--", &pathspec])
        .output()
        .map_err(|e| SyncError::io(repo, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(repo = %repo.display(), base, head, status = ?output.status, stderr = %stderr, "git diff failed");
        return Err(SyncError::FatalConfig(format!(
            "git diff {base} {head} failed: {}",
            stderr.trim()
        )));
    }

    let files: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && is_markdown(line))
        .map(String::from)
        .collect();
    info!(repo = %repo.display(), base, head, count = files.len(), "Discovered changed files");
    Ok(files)
}
