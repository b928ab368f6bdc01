//! GitHub backend: screenshots are committed to an orphan `pr-assets` branch
//! of the current repository via the contents API and served from
//! raw.githubusercontent.com, which preserves full quality and opens inline
//! in the browser.
//!
//! The branch is history-disconnected: its root commit has no parents, so it
//! can never be merged into the main history by accident.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;
use tracing::{debug, info};

use super::{Backend, UploadError};
use crate::compress::Compressor;
use crate::exec::{CommandRunner, Invocation};
use crate::ids::IdSource;

/// The GitHub contents API rejects files above 50 MiB outright.
pub const CEILING: u64 = 50 * 1024 * 1024;
pub const ASSETS_BRANCH: &str = "pr-assets";

const BRANCH_README: &str = "# PR Assets\n\nScreenshots hosted here for PR descriptions. \
**Never merge this branch** - it shares no history with the main branches.\n";

/// Result of a provisioning attempt, so callers can report what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    Created,
    AlreadyExists,
}

pub struct GitHubBackend {
    runner: Arc<dyn CommandRunner>,
    ids: Arc<dyn IdSource>,
    compressor: Compressor,
}

impl GitHubBackend {
    pub fn new(runner: Arc<dyn CommandRunner>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            compressor: Compressor::new(runner.clone()),
            runner,
            ids,
        }
    }

    /// Resolve the ambient repository as `owner/name` via the gh CLI.
    pub async fn current_repo(&self) -> Result<String, UploadError> {
        let outcome = self
            .runner
            .run(Invocation::new(
                "gh",
                &[
                    "repo",
                    "view",
                    "--json",
                    "nameWithOwner",
                    "-q",
                    ".nameWithOwner",
                ],
            ))
            .await?;
        if !outcome.success {
            return Err(UploadError::Rejected {
                host: "GitHub",
                message: format!(
                    "could not determine the current repo; make sure `gh` is authenticated \
                     (`gh auth status`): {}",
                    outcome.stderr.trim()
                ),
            });
        }
        Ok(outcome.stdout.trim().to_string())
    }

    pub async fn branch_exists(&self, repo: &str) -> Result<bool, UploadError> {
        let outcome = self
            .runner
            .run(Invocation::new(
                "gh",
                &["api", &format!("/repos/{repo}/branches/{ASSETS_BRANCH}")],
            ))
            .await?;
        Ok(outcome.success)
    }

    /// Provision the orphan branch if absent. Checking existence first makes
    /// the call idempotent: "already exists" is success, not an error.
    pub async fn provision(&self) -> Result<Provisioning, UploadError> {
        let repo = self.current_repo().await?;
        if self.branch_exists(&repo).await? {
            debug!(repo = %repo, branch = ASSETS_BRANCH, "assets branch already present");
            return Ok(Provisioning::AlreadyExists);
        }
        self.bootstrap_branch(&repo).await?;
        Ok(Provisioning::Created)
    }

    /// `gh api` call with a JSON payload on stdin, returning the parsed
    /// response. Any failure surfaces the remote error and aborts the caller.
    async fn api(
        &self,
        method: &str,
        endpoint: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, UploadError> {
        let outcome = self
            .runner
            .run(
                Invocation::new("gh", &["api", "--method", method, endpoint, "--input", "-"])
                    .with_stdin(payload.to_string()),
            )
            .await?;
        if !outcome.success {
            return Err(UploadError::Rejected {
                host: "GitHub",
                message: format!(
                    "gh api {method} {endpoint} failed: {}",
                    outcome.stderr.trim()
                ),
            });
        }
        serde_json::from_str(&outcome.stdout).map_err(|_| UploadError::MalformedResponse {
            host: "GitHub",
            body: outcome.stdout.clone(),
        })
    }

    /// Orphan-branch bootstrap: blob, then a tree referencing it, then a root
    /// commit with no parents, then the branch ref. Each step's sha feeds the
    /// next; the first failure aborts the whole bootstrap.
    async fn bootstrap_branch(&self, repo: &str) -> Result<(), UploadError> {
        info!(repo = %repo, branch = ASSETS_BRANCH, "creating orphan assets branch");

        let blob = self
            .api(
                "POST",
                &format!("/repos/{repo}/git/blobs"),
                json!({
                    "content": BASE64.encode(BRANCH_README),
                    "encoding": "base64",
                }),
            )
            .await?;
        let blob_sha = sha_field(&blob)?;

        let tree = self
            .api(
                "POST",
                &format!("/repos/{repo}/git/trees"),
                json!({
                    "tree": [{
                        "path": "README.md",
                        "mode": "100644",
                        "type": "blob",
                        "sha": blob_sha,
                    }],
                }),
            )
            .await?;
        let tree_sha = sha_field(&tree)?;

        // No "parents" key: the commit is a root, disconnected from history.
        let commit = self
            .api(
                "POST",
                &format!("/repos/{repo}/git/commits"),
                json!({
                    "message": format!("chore: init {ASSETS_BRANCH} branch for PR screenshots"),
                    "tree": tree_sha,
                }),
            )
            .await?;
        let commit_sha = sha_field(&commit)?;

        self.api(
            "POST",
            &format!("/repos/{repo}/git/refs"),
            json!({
                "ref": format!("refs/heads/{ASSETS_BRANCH}"),
                "sha": commit_sha,
            }),
        )
        .await?;

        info!(branch = ASSETS_BRANCH, "assets branch created");
        Ok(())
    }
}

fn sha_field(value: &serde_json::Value) -> Result<String, UploadError> {
    value
        .get("sha")
        .and_then(|sha| sha.as_str())
        .map(str::to_string)
        .ok_or_else(|| UploadError::MalformedResponse {
            host: "GitHub",
            body: value.to_string(),
        })
}

#[async_trait]
impl Backend for GitHubBackend {
    fn ceiling(&self) -> u64 {
        CEILING
    }

    async fn ensure_ready(&self) -> Result<(), UploadError> {
        self.provision().await.map(|_| ())
    }

    async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let repo = self.current_repo().await?;
        if !self.branch_exists(&repo).await? {
            info!(repo = %repo, "assets branch missing; creating it before upload");
            self.bootstrap_branch(&repo).await?;
        }

        let prepared = self.compressor.fit_under(path, CEILING).await?;

        // Filename keeps the original stem and extension; the short suffix
        // guarantees no collision with files already on the branch.
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "screenshot".to_string());
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let filename = format!("{stem}-{}{extension}", self.ids.short_id());

        let bytes = fs::read(prepared.path()).map_err(|source| UploadError::ReadAsset {
            path: prepared.path().to_path_buf(),
            source,
        })?;

        self.api(
            "PUT",
            &format!("/repos/{repo}/contents/{filename}"),
            json!({
                "message": format!("chore: add PR screenshot {filename}"),
                "content": BASE64.encode(&bytes),
                "branch": ASSETS_BRANCH,
            }),
        )
        .await?;

        // The URL is derived, not queried: raw.githubusercontent.com serves
        // the committed path directly.
        let url = format!("https://raw.githubusercontent.com/{repo}/{ASSETS_BRANCH}/{filename}");
        info!(url = %url, "screenshot committed to the assets branch");
        Ok(url)
    }
}
