//! # contract: seams between the sync pipeline and the outside world
//!
//! The pipeline talks to exactly two external services:
//!
//! - a text-generation service, reached through [`TextTransport`] (one raw
//!   request/response exchange) and [`TextGenerator`] (the retrying client
//!   every LLM-backed stage calls);
//! - a remote repository host, reached through [`RepoHost`] (file reads,
//!   branch creation, file commits, pull requests).
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; with the `test-export-mocks`
//!   feature the generated `Mock*` types are available to integration tests
//!   and downstream crates.
//! - Methods take owned request values so expectations can match on them
//!   without lifetime plumbing.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::Result;

/// One request to the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// System instructions.
    pub system: String,
    /// User content.
    pub user: String,
    /// Model identifier.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// A single, non-retrying exchange with the text-generation service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextTransport: Send + Sync {
    /// Send one request and return the generated text.
    ///
    /// Failures must be reported as [`crate::error::SyncError::Transport`]
    /// carrying the HTTP status (if one was received) so the caller can
    /// decide whether to retry.
    async fn send(&self, request: GenerationRequest) -> Result<String>;
}

/// The capability every LLM-backed stage depends on: prompt in, text out,
/// possibly after retry.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: GenerationRequest) -> Result<String>;
}

/// Identifies a file in a remote repository at a ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
    /// Branch name or commit-ish.
    pub reference: String,
}

/// File content and blob id as fetched from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBranch {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Branch the new one is cut from.
    pub base: String,
}

/// Create or update a file on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: String,
    pub message: String,
    pub content: String,
    /// Blob id of the file being replaced; `None` creates a new file.
    pub sha: Option<String>,
}

/// Delete a file on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDeletion {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: String,
    pub message: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub body: String,
    /// Source branch.
    pub head: String,
    /// Target branch.
    pub base: String,
}

/// A remote repository host treated as a key-value-and-ref store.
///
/// Implementations must make branch and pull-request creation idempotent:
/// an "already exists" answer from the host is success.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Fetch a file; `Ok(None)` when the file does not exist at that ref.
    async fn get_file(&self, location: FileLocation) -> Result<Option<RemoteFile>>;

    async fn create_branch(&self, request: NewBranch) -> Result<()>;

    async fn put_file(&self, request: FileCommit) -> Result<()>;

    async fn delete_file(&self, request: FileDeletion) -> Result<()>;

    /// Open a pull request. Returns its URL, or `None` if one already exists
    /// for the same head and base.
    async fn open_pull_request(&self, request: NewPullRequest) -> Result<Option<String>>;
}
