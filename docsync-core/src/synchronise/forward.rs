use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::identical_content;
use crate::cache::{ClassificationCache, ClassificationVerdict};
use crate::contract::TextGenerator;
use crate::document::{Dialect, Direction, Document};
use crate::error::{Result, SyncError};
use crate::mapping::MappingTable;
use crate::report::{FileOutcome, SyncDirection, SyncReport};
use crate::stages::classifier::PREVIEW_CHARS;
use crate::stages::Stages;

const SOURCE_LABEL: &str = "Markdown (public repo)";
const TARGET_LABEL: &str = "GitBook (docs repo)";

/// Public repo -> docs repo, writing into a local docs checkout.
pub struct ForwardSync<'a, G: ?Sized> {
    pub table: &'a MappingTable,
    pub stages: &'a Stages,
    pub generator: &'a G,
    /// Root of the public repo checkout.
    pub public_repo: PathBuf,
    /// Root of the docs repo checkout.
    pub docs_repo: PathBuf,
    pub dry_run: bool,
}

impl<'a, G> ForwardSync<'a, G>
where
    G: TextGenerator + ?Sized,
{
    /// Process every changed public path in order.
    ///
    /// New classifications are recorded into `cache`; persisting it is the
    /// caller's job.
    pub async fn run(&self, changed: &[String], cache: &mut ClassificationCache) -> SyncReport {
        info!(
            files = changed.len(),
            public_repo = %self.public_repo.display(),
            docs_repo = %self.docs_repo.display(),
            dry_run = self.dry_run,
            "[FORWARD] Starting forward sync"
        );
        let mut report = SyncReport::new(SyncDirection::Forward, self.dry_run);
        for path in changed {
            let outcome = self.sync_file(path, cache).await;
            report.record(outcome);
        }
        info!(summary = ?report.summary(), "[FORWARD] Forward sync finished");
        report
    }

    /// Process one public path. Never fails: errors become an errored outcome.
    pub async fn sync_file(&self, path: &str, cache: &mut ClassificationCache) -> FileOutcome {
        info!(path, "[FORWARD] Processing");
        match self.try_sync_file(path, cache).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(path, error = %e, "[FORWARD][ERROR] File failed");
                FileOutcome::errored(path, e)
            }
        }
    }

    async fn try_sync_file(&self, path: &str, cache: &mut ClassificationCache) -> Result<FileOutcome> {
        let Some(mapping) = self.table.resolve_forward(path) else {
            info!(path, "  -> Not mapped, skipping");
            return Ok(FileOutcome::NotMapped { path: path.to_string() });
        };
        let target_path = mapping.target_path;
        info!(path, target = %target_path, "  -> Maps to docs path");

        if let Some(verdict) = cache.publish_blocker(path) {
            return Ok(classified_out(path, verdict));
        }

        let target_full = self.docs_repo.join(&target_path);
        let Some(source) = read_optional(&self.public_repo.join(path))? else {
            return self.propagate_deletion(path, &target_path, &target_full);
        };
        let source = Document::new(path, Dialect::SourcePlain, source);

        let verdict = match cache.lookup(path) {
            Some(verdict) => verdict.clone(),
            None => {
                let verdict = self
                    .stages
                    .classifier
                    .classify(self.generator, path, source.preview(PREVIEW_CHARS))
                    .await;
                cache.record(path, verdict.clone());
                verdict
            }
        };
        if !verdict.publish {
            return Ok(classified_out(path, &verdict));
        }

        let existing = read_optional(&target_full)?;
        match &existing {
            Some(target) => {
                if let Some(reason) = identical_content(
                    self.stages,
                    self.generator,
                    (source.content(), SOURCE_LABEL),
                    (target.as_str(), TARGET_LABEL),
                )
                .await
                {
                    return Ok(FileOutcome::skipped(path, Some(target_path), reason));
                }
            }
            None => info!(target = %target_path, "  -> Target not found in docs repo, will create"),
        }

        if self.dry_run {
            info!(path, "  -> [DRY RUN] Would convert and write file");
            return Ok(FileOutcome::Synced {
                path: path.to_string(),
                target: target_path,
                dry_run: true,
                pull_request: None,
                note: None,
            });
        }

        let result = self
            .stages
            .convert_and_validate(self.generator, &source, &target_path, Direction::ToDialect, existing.as_deref())
            .await?;

        if result.validation_passed {
            write_file(&target_full, result.content.content())?;
            info!(target = %target_path, "  -> Converted and written");
            Ok(FileOutcome::Synced {
                path: path.to_string(),
                target: target_path,
                dry_run: false,
                pull_request: None,
                note: None,
            })
        } else {
            warn!(path, issues = ?result.issues, "  -> Conversion validation failed, writing original content");
            write_file(&target_full, source.content())?;
            Ok(FileOutcome::ValidationFailed {
                path: path.to_string(),
                target: target_path,
                issues: result.issues,
                fallback_written: true,
            })
        }
    }

    fn propagate_deletion(&self, path: &str, target_path: &str, target_full: &Path) -> Result<FileOutcome> {
        if !target_full.exists() {
            info!(path, "  -> Source and target both absent, nothing to do");
            return Ok(FileOutcome::skipped(path, None, "source missing and no target to delete"));
        }
        if self.dry_run {
            info!(path, target = %target_path, "  -> [DRY RUN] Source deleted upstream, would delete target");
        } else {
            std::fs::remove_file(target_full).map_err(|e| SyncError::io(target_full, e))?;
            info!(path, target = %target_path, "  -> Source deleted upstream, target removed");
        }
        Ok(FileOutcome::deleted_upstream(path, target_path, self.dry_run))
    }
}

pub(super) fn classified_out(path: &str, verdict: &ClassificationVerdict) -> FileOutcome {
    info!(path, reason = %verdict.reason, "  -> Classified out, skipping");
    FileOutcome::ClassifiedOut {
        path: path.to_string(),
        reason: verdict.reason.clone(),
    }
}

/// Read a UTF-8 file, `None` when it does not exist.
pub(super) fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| SyncError::io(path, e))
}
