//! Run report: one terminal outcome per processed file.
//!
//! Every per-file step returns exactly one [`FileOutcome`], and the
//! orchestrator appends it to the [`SyncReport`] it owns. Nothing else
//! writes to the report, so each path lands in exactly one bucket.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::stages::IssueKind;

/// Skip reason recorded when a source file no longer exists.
pub const DELETED_UPSTREAM: &str = "deleted upstream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Public repo -> docs repo.
    Forward,
    /// Docs repo -> private repos.
    Backward,
}

/// The mutually exclusive report buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Synced,
    Skipped,
    NotMapped,
    ClassifiedOut,
    ValidationFailed,
    Errored,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::Synced,
        Bucket::Skipped,
        Bucket::NotMapped,
        Bucket::ClassifiedOut,
        Bucket::ValidationFailed,
        Bucket::Errored,
    ];

    fn heading(self) -> &'static str {
        match self {
            Bucket::Synced => "Synced",
            Bucket::Skipped => "Skipped",
            Bucket::NotMapped => "Not mapped",
            Bucket::ClassifiedOut => "Classified out",
            Bucket::ValidationFailed => "Validation failed",
            Bucket::Errored => "Errors",
        }
    }
}

/// Terminal outcome of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Synced {
        path: String,
        target: String,
        dry_run: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pull_request: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Skipped {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        reason: String,
        /// The target was removed because its source is gone.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        deleted: bool,
    },
    NotMapped {
        path: String,
    },
    ClassifiedOut {
        path: String,
        reason: String,
    },
    ValidationFailed {
        path: String,
        target: String,
        issues: Vec<String>,
        /// The unconverted original was written in place of the conversion.
        fallback_written: bool,
    },
    Errored {
        path: String,
        error: String,
    },
}

impl FileOutcome {
    pub fn bucket(&self) -> Bucket {
        match self {
            FileOutcome::Synced { .. } => Bucket::Synced,
            FileOutcome::Skipped { .. } => Bucket::Skipped,
            FileOutcome::NotMapped { .. } => Bucket::NotMapped,
            FileOutcome::ClassifiedOut { .. } => Bucket::ClassifiedOut,
            FileOutcome::ValidationFailed { .. } => Bucket::ValidationFailed,
            FileOutcome::Errored { .. } => Bucket::Errored,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FileOutcome::Synced { path, .. }
            | FileOutcome::Skipped { path, .. }
            | FileOutcome::NotMapped { path }
            | FileOutcome::ClassifiedOut { path, .. }
            | FileOutcome::ValidationFailed { path, .. }
            | FileOutcome::Errored { path, .. } => path,
        }
    }

    pub fn skipped(path: impl Into<String>, target: Option<String>, reason: impl Into<String>) -> Self {
        FileOutcome::Skipped {
            path: path.into(),
            target,
            reason: reason.into(),
            deleted: false,
        }
    }

    /// A target removed (or, in dry-run, due for removal) because its source is gone.
    pub fn deleted_upstream(path: impl Into<String>, target: impl Into<String>, dry_run: bool) -> Self {
        FileOutcome::Skipped {
            path: path.into(),
            target: Some(target.into()),
            reason: if dry_run {
                format!("{DELETED_UPSTREAM} (dry run: would delete)")
            } else {
                DELETED_UPSTREAM.to_string()
            },
            deleted: !dry_run,
        }
    }

    pub fn errored(path: impl Into<String>, error: impl ToString) -> Self {
        FileOutcome::Errored {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Target-side path written to disk by this outcome, if any.
    fn written_target(&self) -> Option<&str> {
        match self {
            FileOutcome::Synced {
                target, dry_run: false, ..
            } => Some(target.as_str()),
            FileOutcome::ValidationFailed {
                target,
                fallback_written: true,
                ..
            } => Some(target.as_str()),
            FileOutcome::Skipped {
                target: Some(target),
                deleted: true,
                ..
            } => Some(target.as_str()),
            _ => None,
        }
    }

    fn render_line(&self, out: &mut String) {
        let _ = match self {
            FileOutcome::Synced {
                path,
                target,
                dry_run,
                pull_request,
                note,
            } => {
                let suffix = match (*dry_run, pull_request, note) {
                    (true, _, _) => " [DRY RUN]".to_string(),
                    (false, Some(url), _) => format!(" {url}"),
                    (false, None, Some(note)) => format!(" ({note})"),
                    (false, None, None) => String::new(),
                };
                writeln!(out, "  \u{2713} {path} -> {target}{suffix}")
            }
            FileOutcome::Skipped { path, reason, .. } => writeln!(out, "  - {path} ({reason})"),
            FileOutcome::NotMapped { path } => writeln!(out, "  - {path}"),
            FileOutcome::ClassifiedOut { path, reason } => writeln!(out, "  - {path} ({reason})"),
            FileOutcome::ValidationFailed {
                path,
                issues,
                fallback_written,
                ..
            } => {
                let note = if *fallback_written { " (original content used)" } else { "" };
                let _ = writeln!(out, "  \u{26A0} {path}{note}");
                for issue in issues {
                    match IssueKind::of(issue) {
                        Some(kind) => {
                            let _ = writeln!(out, "    - [{kind}] {issue}");
                        }
                        None => {
                            let _ = writeln!(out, "    - {issue}");
                        }
                    }
                }
                Ok(())
            }
            FileOutcome::Errored { path, error } => writeln!(out, "  \u{2717} {path}: {error}"),
        };
    }
}

/// Per-bucket counts, as exported to CI step outputs and the JSON summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub synced_count: usize,
    pub skipped_count: usize,
    pub not_mapped_count: usize,
    pub classified_out_count: usize,
    pub validation_failed_count: usize,
    pub error_count: usize,
}

impl RunSummary {
    /// `key=value` lines for a CI step-output file.
    pub fn step_outputs(&self) -> String {
        format!(
            "synced_count={}\nskipped_count={}\nnot_mapped_count={}\nclassified_out_count={}\nvalidation_failed_count={}\nerror_count={}\n",
            self.synced_count,
            self.skipped_count,
            self.not_mapped_count,
            self.classified_out_count,
            self.validation_failed_count,
            self.error_count,
        )
    }
}

/// Accumulated outcomes of one orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub dry_run: bool,
    pub outcomes: Vec<FileOutcome>,
}

impl SyncReport {
    pub fn new(direction: SyncDirection, dry_run: bool) -> Self {
        Self {
            direction,
            dry_run,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn in_bucket(&self, bucket: Bucket) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(move |o| o.bucket() == bucket)
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.in_bucket(bucket).count()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            synced_count: self.count(Bucket::Synced),
            skipped_count: self.count(Bucket::Skipped),
            not_mapped_count: self.count(Bucket::NotMapped),
            classified_out_count: self.count(Bucket::ClassifiedOut),
            validation_failed_count: self.count(Bucket::ValidationFailed),
            error_count: self.count(Bucket::Errored),
        }
    }

    /// Any file errored or failed validation.
    pub fn has_failures(&self) -> bool {
        self.count(Bucket::Errored) > 0 || self.count(Bucket::ValidationFailed) > 0
    }

    /// Target paths written to or removed from the local checkout, in processing order.
    pub fn written_targets(&self) -> Vec<&str> {
        self.outcomes.iter().filter_map(FileOutcome::written_target).collect()
    }

    /// Machine-readable summary: counts plus every outcome.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct SummaryDocument<'a> {
            direction: SyncDirection,
            dry_run: bool,
            counts: RunSummary,
            files: &'a [FileOutcome],
        }
        serde_json::to_string_pretty(&SummaryDocument {
            direction: self.direction,
            dry_run: self.dry_run,
            counts: self.summary(),
            files: &self.outcomes,
        })
    }

    /// Human-readable per-bucket listing.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let direction = match self.direction {
            SyncDirection::Forward => "forward",
            SyncDirection::Backward => "backward",
        };
        let dry_run = if self.dry_run { " [DRY RUN]" } else { "" };
        let _ = writeln!(out, "=== Results ({direction}){dry_run} ===");
        for bucket in Bucket::ALL {
            let _ = writeln!(out, "\n{}: {}", bucket.heading(), self.count(bucket));
            for outcome in self.in_bucket(bucket) {
                outcome.render_line(&mut out);
            }
        }
        out
    }
}
