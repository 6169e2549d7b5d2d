use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::forward::{classified_out, read_optional};
use super::identical_content;
use crate::cache::ClassificationCache;
use crate::contract::{
    FileCommit, FileDeletion, FileLocation, NewBranch, NewPullRequest, RepoHost, TextGenerator,
};
use crate::document::{Dialect, Direction, Document};
use crate::error::Result;
use crate::mapping::{MappingTable, RepoRef};
use crate::report::{FileOutcome, SyncDirection, SyncReport};
use crate::stages::Stages;

const SOURCE_LABEL: &str = "GitBook (docs repo)";
const TARGET_LABEL: &str = "Markdown (private repo)";

/// Docs repo -> private repos, proposing each change as a pull request.
///
/// The remote is treated as authoritative: file state is fetched again
/// right before every mutating call instead of being reused.
pub struct BackwardSync<'a, G: ?Sized, H: ?Sized> {
    pub table: &'a MappingTable,
    pub stages: &'a Stages,
    pub generator: &'a G,
    pub host: &'a H,
    /// Root of the docs repo checkout.
    pub docs_repo: PathBuf,
    pub dry_run: bool,
    /// Date stamped into branch names.
    pub date: NaiveDate,
}

impl<'a, G, H> BackwardSync<'a, G, H>
where
    G: TextGenerator + ?Sized,
    H: RepoHost + ?Sized,
{
    pub async fn run(&self, changed: &[String], cache: &ClassificationCache) -> SyncReport {
        info!(
            files = changed.len(),
            docs_repo = %self.docs_repo.display(),
            dry_run = self.dry_run,
            "[BACKWARD] Starting backward sync"
        );
        let mut report = SyncReport::new(SyncDirection::Backward, self.dry_run);
        for path in changed {
            let outcome = self.sync_file(path, cache).await;
            report.record(outcome);
        }
        info!(summary = ?report.summary(), "[BACKWARD] Backward sync finished");
        report
    }

    /// Process one docs path. Never fails: errors become an errored outcome.
    pub async fn sync_file(&self, path: &str, cache: &ClassificationCache) -> FileOutcome {
        info!(path, "[BACKWARD] Processing");
        match self.try_sync_file(path, cache).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(path, error = %e, "[BACKWARD][ERROR] File failed");
                FileOutcome::errored(path, e)
            }
        }
    }

    async fn try_sync_file(&self, path: &str, cache: &ClassificationCache) -> Result<FileOutcome> {
        let Some(mapping) = self.table.resolve_backward(path) else {
            info!(path, "  -> Not mapped, skipping");
            return Ok(FileOutcome::NotMapped { path: path.to_string() });
        };
        let Some(repo) = mapping.repository else {
            warn!(path, "  -> Mapping has no repository, skipping");
            return Ok(FileOutcome::NotMapped { path: path.to_string() });
        };
        let target_path = mapping.target_path;
        info!(
            path,
            repo = %repo.full_name(),
            target = %target_path,
            base = %repo.default_branch,
            "  -> Maps to private path"
        );

        if let Some(verdict) = cache.sync_back_blocker(path, self.table) {
            return Ok(classified_out(path, verdict));
        }

        let Some(docs_content) = read_optional(&self.docs_repo.join(path))? else {
            return self.propagate_deletion(path, &repo, &target_path).await;
        };
        let source = Document::new(path, Dialect::DocsDialect, docs_content);

        let existing = self
            .host
            .get_file(location(&repo, &target_path, &repo.default_branch))
            .await?;
        match &existing {
            Some(remote) => {
                if let Some(reason) = identical_content(
                    self.stages,
                    self.generator,
                    (source.content(), SOURCE_LABEL),
                    (remote.content.as_str(), TARGET_LABEL),
                )
                .await
                {
                    return Ok(FileOutcome::skipped(path, Some(target_path), reason));
                }
            }
            None => info!(target = %target_path, "  -> File not found in private repo, will create"),
        }

        if self.dry_run {
            info!(path, "  -> [DRY RUN] Would convert and create PR");
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
            .convert_and_validate(self.generator, &source, &target_path, Direction::ToPlain, None)
            .await?;
        if !result.validation_passed {
            warn!(path, issues = ?result.issues, "  -> Validation failed, skipping PR creation");
            return Ok(FileOutcome::ValidationFailed {
                path: path.to_string(),
                target: target_path,
                issues: result.issues,
                fallback_written: false,
            });
        }

        let branch = self.branch_name(path);
        self.host
            .create_branch(NewBranch {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                branch: branch.clone(),
                base: repo.default_branch.clone(),
            })
            .await?;

        let sha = self
            .host
            .get_file(location(&repo, &target_path, &branch))
            .await?
            .map(|remote| remote.sha);
        self.host
            .put_file(FileCommit {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                path: target_path.clone(),
                branch: branch.clone(),
                message: commit_message(path),
                content: result.content.into_content(),
                sha,
            })
            .await?;
        info!(target = %target_path, branch = %branch, "  -> Committed converted file");

        let pull_request = self
            .host
            .open_pull_request(NewPullRequest {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                title: pr_title(path),
                body: pr_body(path, &target_path),
                head: branch.clone(),
                base: repo.default_branch.clone(),
            })
            .await?;
        let note = match &pull_request {
            Some(url) => {
                info!(url = %url, "  -> Created PR");
                None
            }
            None => {
                info!(branch = %branch, "  -> PR already exists");
                Some("PR may already exist".to_string())
            }
        };

        Ok(FileOutcome::Synced {
            path: path.to_string(),
            target: target_path,
            dry_run: false,
            pull_request,
            note,
        })
    }

    async fn propagate_deletion(&self, path: &str, repo: &RepoRef, target_path: &str) -> Result<FileOutcome> {
        let existing = self
            .host
            .get_file(location(repo, target_path, &repo.default_branch))
            .await?;
        if existing.is_none() {
            info!(path, "  -> Deleted in docs repo and absent in private repo, nothing to do");
            return Ok(FileOutcome::skipped(path, None, "source missing and no target to delete"));
        }
        if self.dry_run {
            info!(path, target = %target_path, "  -> [DRY RUN] Deleted in docs repo, would delete private file");
            return Ok(FileOutcome::deleted_upstream(path, target_path, true));
        }

        let branch = self.branch_name(path);
        self.host
            .create_branch(NewBranch {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                branch: branch.clone(),
                base: repo.default_branch.clone(),
            })
            .await?;
        let Some(current) = self.host.get_file(location(repo, target_path, &branch)).await? else {
            info!(target = %target_path, branch = %branch, "  -> Already deleted on branch");
            return Ok(FileOutcome::deleted_upstream(path, target_path, false));
        };
        self.host
            .delete_file(FileDeletion {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                path: target_path.to_string(),
                branch: branch.clone(),
                message: format!("docs: remove {target_path} (deleted in docs repo: {path})"),
                sha: current.sha,
            })
            .await?;
        self.host
            .open_pull_request(NewPullRequest {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                title: format!("[Sync Back] Remove {} (deleted in docs repo)", file_name(path)),
                body: format!(
                    "## Summary\n\n`{path}` was deleted in the docs repo.\n\n\
                     This PR removes the corresponding file `{target_path}` from this repo."
                ),
                head: branch,
                base: repo.default_branch.clone(),
            })
            .await?;
        info!(path, target = %target_path, "  -> Deleted in docs repo, removal proposed");
        Ok(FileOutcome::deleted_upstream(path, target_path, false))
    }

    /// `sync-back/<YYYYMMDD>/<file stem>`
    pub fn branch_name(&self, docs_path: &str) -> String {
        let stem = Path::new(docs_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(docs_path);
        format!("sync-back/{}/{stem}", self.date.format("%Y%m%d"))
    }
}

fn location(repo: &RepoRef, path: &str, reference: &str) -> FileLocation {
    FileLocation {
        owner: repo.owner.clone(),
        repo: repo.repo.clone(),
        path: path.to_string(),
        reference: reference.to_string(),
    }
}

fn file_name(docs_path: &str) -> &str {
    Path::new(docs_path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(docs_path)
}

fn commit_message(docs_path: &str) -> String {
    format!("docs: sync from docs repo ({docs_path})")
}

fn pr_title(docs_path: &str) -> String {
    format!("[Sync Back] Update {} from docs repo", file_name(docs_path))
}

fn pr_body(docs_path: &str, target_path: &str) -> String {
    format!(
        "## Summary\n\n\
         This PR syncs changes from the docs repo back to the private repo.\n\n\
         **Source file:** `{docs_path}` (docs repo)\n\
         **Target file:** `{target_path}` (this repo)\n\n\
         ### Conversion\n\n\
         - GitBook syntax converted to pure Markdown\n\
         - Conversion validated (content integrity verified)\n\n\
         ---\n\n\
         This PR was automatically created by the sync-back workflow."
    )
}
