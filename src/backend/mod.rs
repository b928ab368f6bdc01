//! Interchangeable image-hosting backends.
//!
//! Every backend exposes the same capability: a byte ceiling, an idempotent
//! readiness check, and `upload(path) -> URL`. Remote calls go through the
//! [`CommandRunner`](crate::exec::CommandRunner) capability (`curl`, `gh`)
//! so transport failures can be simulated in tests. An upload is
//! all-or-nothing per image: any non-success outcome aborts with the remote
//! message surfaced, and there is no retry.

pub mod github;
pub mod imgbb;
pub mod imgur;

pub use github::GitHubBackend;
pub use imgbb::ImgBbBackend;
pub use imgur::ImgurBackend;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::compress::CompressError;
use crate::exec::ExecError;

/// Extensions the image hosts are known to accept.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Precondition failure, reported before any external call is attempted.
    #[error("{0}")]
    MissingCredential(String),
    /// The transport tool itself failed to deliver the request.
    #[error("{tool} failed: {stderr}")]
    Transport { tool: &'static str, stderr: String },
    /// The remote answered with something that is not the expected JSON.
    #[error("unexpected response from {host}: {body}")]
    MalformedResponse { host: &'static str, body: String },
    /// The remote reported an explicit failure; its message is passed through.
    #[error("{host}: {message}")]
    Rejected { host: &'static str, message: String },
    #[error("cannot read {path}: {source}")]
    ReadAsset {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Compress(#[from] CompressError),
}

/// A hosting backend that can receive one image and hand back a public URL.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Largest file the host accepts; larger inputs are degraded first.
    fn ceiling(&self) -> u64;

    /// Idempotent precondition setup: credentials present, storage
    /// provisioned. Safe to call repeatedly.
    async fn ensure_ready(&self) -> Result<(), UploadError>;

    /// Upload the file and return its public URL.
    async fn upload(&self, path: &Path) -> Result<String, UploadError>;
}

/// Warn when the extension is one the hosts may not accept. Not fatal; the
/// remote gets the final say.
pub(crate) fn warn_unusual_extension(path: &Path) {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        warn!(
            extension = %extension,
            supported = ?SUPPORTED_EXTENSIONS,
            "file extension may not be supported by the image host"
        );
    }
}

/// Extract a human-readable message from a remote error payload, which may be
/// an object with a `message` field, a bare string, or absent entirely.
pub(crate) fn remote_message(error: Option<serde_json::Value>) -> String {
    match error {
        Some(serde_json::Value::Object(map)) => match map.get("message").and_then(|m| m.as_str()) {
            Some(message) => message.to_string(),
            None => serde_json::Value::Object(map).to_string(),
        },
        Some(serde_json::Value::String(message)) => message,
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    }
}
