//! # GitHub integration (CLI <-> Core)
//!
//! Implements the core [`RepoHost`] contract against the GitHub REST API so
//! backward sync can read private-repo files, cut branches, commit files and
//! open pull requests.
//!
//! - Construct [`GitHubClient`] with a token (see [`GitHubClient::new`]).
//! - Branch and pull-request creation are idempotent: GitHub's "already
//!   exists" answers are success.
//! - Failures are reported as [`SyncError::Transport`] with service `github`
//!   and are not retried.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use docsync_core::contract::{
    FileCommit, FileDeletion, FileLocation, NewBranch, NewPullRequest, RemoteFile, RepoHost,
};
use docsync_core::{Result, SyncError};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const SERVICE: &str = "github";
const USER_AGENT: &str = concat!("docsync/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_url: Url,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    html_url: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    pub fn with_api_url(token: impl Into<String>, api_url: &str) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| SyncError::FatalConfig(format!("Invalid GitHub API URL {api_url:?}: {e}")))?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SyncError::FatalConfig(format!("Failed to build HTTP client: {e}")))?;
        tracing::info!(api_url = %api_url, "Initialized GitHubClient");
        Ok(Self {
            http,
            token: token.into(),
            api_url,
        })
    }

    fn endpoint(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url> {
        endpoint(&self.api_url, owner, repo, rest)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<(StatusCode, String)> {
        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::transport(SERVICE, None, e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(SERVICE, Some(status.as_u16()), e.to_string()))?;
        Ok((status, body))
    }
}

fn endpoint(api_url: &Url, owner: &str, repo: &str, rest: &[&str]) -> Result<Url> {
    let mut url = api_url.clone();
    url.path_segments_mut()
        .map_err(|_| SyncError::FatalConfig(format!("GitHub API URL cannot be a base: {api_url}")))?
        .pop_if_empty()
        .extend(["repos", owner, repo])
        .extend(rest.iter().flat_map(|segment| segment.split('/')));
    Ok(url)
}

fn failure(status: StatusCode, body: String) -> SyncError {
    SyncError::transport(SERVICE, Some(status.as_u16()), body)
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| SyncError::Parse(format!("Unexpected GitHub response: {e}")))
}

/// GitHub returns base64 wrapped at 60 columns.
fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| SyncError::Parse(format!("Invalid base64 file content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| SyncError::Parse(format!("File content is not UTF-8: {e}")))
}

fn already_exists(status: StatusCode, body: &str, marker: &str) -> bool {
    status == StatusCode::UNPROCESSABLE_ENTITY && body.contains(marker)
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn get_file(&self, location: FileLocation) -> Result<Option<RemoteFile>> {
        let mut url = self.endpoint(&location.owner, &location.repo, &["contents", &location.path])?;
        url.query_pairs_mut().append_pair("ref", &location.reference);
        tracing::debug!(path = %location.path, reference = %location.reference, "Fetching file from GitHub");

        let (status, body) = self.send(self.request(Method::GET, url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::error!(status = %status, path = %location.path, "Failed to fetch file");
            return Err(failure(status, body));
        }
        let contents: ContentsResponse = parse(&body)?;
        Ok(Some(RemoteFile {
            content: decode_content(&contents.content)?,
            sha: contents.sha,
        }))
    }

    async fn create_branch(&self, request: NewBranch) -> Result<()> {
        let base_ref = format!("heads/{}", request.base);
        let url = self.endpoint(&request.owner, &request.repo, &["git", "ref", &base_ref])?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;
        if !status.is_success() {
            tracing::error!(status = %status, base = %request.base, "Failed to resolve base branch");
            return Err(failure(status, body));
        }
        let base: RefResponse = parse(&body)?;

        let url = self.endpoint(&request.owner, &request.repo, &["git", "refs"])?;
        let payload = json!({
            "ref": format!("refs/heads/{}", request.branch),
            "sha": base.object.sha,
        });
        let (status, body) = self.send(self.request(Method::POST, url).json(&payload)).await?;
        if status.is_success() {
            tracing::info!(branch = %request.branch, base = %request.base, "Created branch");
            return Ok(());
        }
        if already_exists(status, &body, "Reference already exists") {
            tracing::info!(branch = %request.branch, "Branch already exists");
            return Ok(());
        }
        tracing::error!(status = %status, branch = %request.branch, "Failed to create branch");
        Err(failure(status, body))
    }

    async fn put_file(&self, request: FileCommit) -> Result<()> {
        let url = self.endpoint(&request.owner, &request.repo, &["contents", &request.path])?;
        let payload = PutContents {
            message: &request.message,
            content: STANDARD.encode(request.content.as_bytes()),
            branch: &request.branch,
            sha: request.sha.as_deref(),
        };
        let (status, body) = self.send(self.request(Method::PUT, url).json(&payload)).await?;
        if !status.is_success() {
            tracing::error!(status = %status, path = %request.path, "Failed to commit file");
            return Err(failure(status, body));
        }
        tracing::info!(path = %request.path, branch = %request.branch, "Committed file");
        Ok(())
    }

    async fn delete_file(&self, request: FileDeletion) -> Result<()> {
        let url = self.endpoint(&request.owner, &request.repo, &["contents", &request.path])?;
        let payload = json!({
            "message": request.message,
            "sha": request.sha,
            "branch": request.branch,
        });
        let (status, body) = self.send(self.request(Method::DELETE, url).json(&payload)).await?;
        if !status.is_success() {
            tracing::error!(status = %status, path = %request.path, "Failed to delete file");
            return Err(failure(status, body));
        }
        tracing::info!(path = %request.path, branch = %request.branch, "Deleted file");
        Ok(())
    }

    async fn open_pull_request(&self, request: NewPullRequest) -> Result<Option<String>> {
        let url = self.endpoint(&request.owner, &request.repo, &["pulls"])?;
        let payload = json!({
            "title": request.title,
            "body": request.body,
            "head": request.head,
            "base": request.base,
        });
        let (status, body) = self.send(self.request(Method::POST, url).json(&payload)).await?;
        if status.is_success() {
            let pull: PullResponse = parse(&body)?;
            return Ok(Some(pull.html_url));
        }
        if already_exists(status, &body, "A pull request already exists") {
            tracing::info!(head = %request.head, "Pull request already exists");
            return Ok(None);
        }
        tracing::error!(status = %status, head = %request.head, "Failed to open pull request");
        Err(failure(status, body))
    }
}
