//! Run artifacts consumed by the surrounding CI job: the synced-files list,
//! step outputs and the JSON summary.

use anyhow::{Context, Result};
use docsync_core::report::SyncReport;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Environment variable naming the CI step-output file.
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// One docs-side path per line; an empty file when nothing was written.
pub fn write_synced_files(path: &Path, report: &SyncReport) -> Result<()> {
    let targets = report.written_targets();
    let mut content = targets.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    ensure_parent(path)?;
    fs::write(path, content).with_context(|| format!("Failed to write synced files list {path:?}"))?;
    tracing::info!(path = ?path, count = targets.len(), "Wrote synced files list");
    Ok(())
}

/// Appends `key=value` count lines to the step-output file.
pub fn append_step_outputs(path: &Path, report: &SyncReport) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open step output file {path:?}"))?;
    file.write_all(report.summary().step_outputs().as_bytes())
        .with_context(|| format!("Failed to append step outputs to {path:?}"))?;
    tracing::info!(path = ?path, "Appended step outputs");
    Ok(())
}

pub fn write_summary_json(path: &Path, report: &SyncReport) -> Result<()> {
    let json = report.to_json().context("Failed to serialise run summary")?;
    ensure_parent(path)?;
    fs::write(path, json + "\n").with_context(|| format!("Failed to write run summary {path:?}"))?;
    tracing::info!(path = ?path, "Wrote run summary");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {parent:?}"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_core::report::{FileOutcome, SyncDirection};
    use tempfile::tempdir;

    fn report() -> SyncReport {
        let mut report = SyncReport::new(SyncDirection::Forward, false);
        report.record(FileOutcome::Synced {
            path: "android/docs/a.md".into(),
            target: "sdk-docs/android/a.md".into(),
            dry_run: false,
            pull_request: None,
            note: None,
        });
        report.record(FileOutcome::NotMapped {
            path: "README.md".into(),
        });
        report
    }

    #[test]
    fn test_synced_files_lists_written_targets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("synced.txt");
        write_synced_files(&path, &report()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "sdk-docs/android/a.md\n");
    }

    #[test]
    fn test_synced_files_is_empty_for_dry_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("synced.txt");
        write_synced_files(&path, &SyncReport::new(SyncDirection::Forward, true)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_step_outputs_are_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("github_output");
        fs::write(&path, "previous=1\n").unwrap();
        append_step_outputs(&path, &report()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("previous=1\n"));
        assert!(text.contains("synced_count=1\n"));
        assert!(text.contains("not_mapped_count=1\n"));
        assert!(text.contains("error_count=0\n"));
    }
}
