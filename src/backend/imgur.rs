//! Imgur backend: file content is base64-encoded and POSTed as a form field
//! with a Client-ID credential.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use tracing::info;

use super::{warn_unusual_extension, Backend, UploadError};
use crate::compress::Compressor;
use crate::config::CredentialSource;
use crate::exec::{CommandRunner, Invocation};

/// Imgur's upload limit for static images.
pub const CEILING: u64 = 10 * 1024 * 1024;

pub struct ImgurBackend {
    runner: Arc<dyn CommandRunner>,
    credentials: Arc<dyn CredentialSource>,
    compressor: Compressor,
}

impl ImgurBackend {
    pub fn new(runner: Arc<dyn CommandRunner>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            compressor: Compressor::new(runner.clone()),
            runner,
            credentials,
        }
    }

    fn client_id(&self) -> Result<String, UploadError> {
        self.credentials.imgur_client_id().ok_or_else(|| {
            UploadError::MissingCredential(
                "no Imgur client ID configured; run `pr-screenshots configure \
                 --imgur-client-id <id>` or set IMGUR_CLIENT_ID"
                    .to_string(),
            )
        })
    }
}

#[derive(Deserialize)]
struct ImgurResponse {
    #[serde(default)]
    success: bool,
    data: Option<serde_json::Value>,
}

#[async_trait]
impl Backend for ImgurBackend {
    fn ceiling(&self) -> u64 {
        CEILING
    }

    async fn ensure_ready(&self) -> Result<(), UploadError> {
        self.client_id().map(|_| ())
    }

    async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let client_id = self.client_id()?;
        warn_unusual_extension(path);

        let prepared = self.compressor.fit_under(path, CEILING).await?;
        let bytes = fs::read(prepared.path()).map_err(|source| UploadError::ReadAsset {
            path: prepared.path().to_path_buf(),
            source,
        })?;
        let encoded = BASE64.encode(&bytes);

        let outcome = self
            .runner
            .run(Invocation::new(
                "curl",
                &[
                    "--silent",
                    "--request",
                    "POST",
                    "--url",
                    "https://api.imgur.com/3/image",
                    "--header",
                    &format!("Authorization: Client-ID {client_id}"),
                    "--form",
                    &format!("image={encoded}"),
                    "--form",
                    "type=base64",
                ],
            ))
            .await?;

        if !outcome.success {
            return Err(UploadError::Transport {
                tool: "curl",
                stderr: outcome.stderr,
            });
        }

        let response: ImgurResponse =
            serde_json::from_str(&outcome.stdout).map_err(|_| UploadError::MalformedResponse {
                host: "Imgur",
                body: outcome.stdout.clone(),
            })?;

        if !response.success {
            let message = response
                .data
                .as_ref()
                .and_then(|data| data.get("error"))
                .and_then(|error| error.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(UploadError::Rejected {
                host: "Imgur",
                message,
            });
        }

        let url = response
            .data
            .as_ref()
            .and_then(|data| data.get("link"))
            .and_then(|link| link.as_str())
            .map(str::to_string)
            .ok_or_else(|| UploadError::MalformedResponse {
                host: "Imgur",
                body: outcome.stdout.clone(),
            })?;
        info!(url = %url, "image uploaded to Imgur");
        Ok(url)
    }
}
