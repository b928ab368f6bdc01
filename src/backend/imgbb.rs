//! ImgBB backend: a single multipart POST with an API key.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{remote_message, warn_unusual_extension, Backend, UploadError};
use crate::compress::Compressor;
use crate::config::CredentialSource;
use crate::exec::{CommandRunner, Invocation};

/// ImgBB rejects anything above 32 MiB.
pub const CEILING: u64 = 32 * 1024 * 1024;

pub struct ImgBbBackend {
    runner: Arc<dyn CommandRunner>,
    credentials: Arc<dyn CredentialSource>,
    compressor: Compressor,
}

impl ImgBbBackend {
    pub fn new(runner: Arc<dyn CommandRunner>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            compressor: Compressor::new(runner.clone()),
            runner,
            credentials,
        }
    }

    fn api_key(&self) -> Result<String, UploadError> {
        self.credentials.imgbb_api_key().ok_or_else(|| {
            UploadError::MissingCredential(
                "no ImgBB API key configured; run `pr-screenshots configure --imgbb-api-key <key>` \
                 or set IMGBB_API_KEY (get a free key at https://api.imgbb.com/)"
                    .to_string(),
            )
        })
    }
}

#[derive(Deserialize)]
struct ImgBbResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgBbData>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ImgBbData {
    display_url: String,
}

#[async_trait]
impl Backend for ImgBbBackend {
    fn ceiling(&self) -> u64 {
        CEILING
    }

    async fn ensure_ready(&self) -> Result<(), UploadError> {
        self.api_key().map(|_| ())
    }

    async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let api_key = self.api_key()?;
        warn_unusual_extension(path);

        let prepared = self.compressor.fit_under(path, CEILING).await?;
        let outcome = self
            .runner
            .run(Invocation::new(
                "curl",
                &[
                    "-s",
                    "-X",
                    "POST",
                    &format!("https://api.imgbb.com/1/upload?key={api_key}"),
                    "-F",
                    &format!("image=@{}", prepared.path().display()),
                ],
            ))
            .await?;

        if !outcome.success {
            return Err(UploadError::Transport {
                tool: "curl",
                stderr: outcome.stderr,
            });
        }

        let response: ImgBbResponse =
            serde_json::from_str(&outcome.stdout).map_err(|_| UploadError::MalformedResponse {
                host: "ImgBB",
                body: outcome.stdout.clone(),
            })?;

        if !response.success {
            return Err(UploadError::Rejected {
                host: "ImgBB",
                message: remote_message(response.error),
            });
        }

        let url = response
            .data
            .map(|data| data.display_url)
            .ok_or_else(|| UploadError::MalformedResponse {
                host: "ImgBB",
                body: outcome.stdout.clone(),
            })?;
        info!(url = %url, "image uploaded to ImgBB");
        Ok(url)
    }
}
