//! Credential and configuration persistence.
//!
//! Credentials are consumed through the [`CredentialSource`] trait so backends
//! never touch the filesystem or environment directly; tests inject a mock.
//! The concrete [`FileCredentials`] store keeps a small JSON file and falls
//! back to environment variables per credential.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Env var that overrides the config file location.
pub const CONFIG_PATH_VAR: &str = "PR_SCREENSHOTS_CONFIG";
pub const IMGBB_KEY_VAR: &str = "IMGBB_API_KEY";
pub const IMGUR_CLIENT_ID_VAR: &str = "IMGUR_CLIENT_ID";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine a config location: HOME is not set and {CONFIG_PATH_VAR} is empty")]
    NoLocation,
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where hosting-backend credentials come from.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
pub trait CredentialSource: Send + Sync {
    fn imgbb_api_key(&self) -> Option<String>;
    fn imgur_client_id(&self) -> Option<String>;
}

/// On-disk shape of the config file. Absent keys are omitted when saving.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imgbb_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imgur_client_id: Option<String>,
}

/// JSON-file-backed credential store with env-var fallback.
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$PR_SCREENSHOTS_CONFIG` if set, else `$HOME/.config/pr-screenshots.json`.
    pub fn from_default_location() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
            if !path.is_empty() {
                return Ok(Self::new(path));
            }
        }
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoLocation)?;
        Ok(Self::new(
            Path::new(&home).join(".config").join("pr-screenshots.json"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config file, treating a missing or unparsable file as empty.
    fn read(&self) -> ConfigFile {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "config file is not valid JSON; ignoring it"
                    );
                    ConfigFile::default()
                }
            },
            Err(_) => {
                debug!(path = %self.path.display(), "no config file found");
                ConfigFile::default()
            }
        }
    }

    fn write(&self, config: &ConfigFile) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "config file saved");
        Ok(())
    }

    /// Persist an ImgBB API key, keeping other stored credentials intact.
    pub fn save_imgbb_api_key(&self, key: &str) -> Result<(), ConfigError> {
        let mut config = self.read();
        config.imgbb_api_key = Some(key.to_string());
        self.write(&config)
    }

    /// Persist an Imgur client ID, keeping other stored credentials intact.
    pub fn save_imgur_client_id(&self, client_id: &str) -> Result<(), ConfigError> {
        let mut config = self.read();
        config.imgur_client_id = Some(client_id.to_string());
        self.write(&config)
    }
}

impl CredentialSource for FileCredentials {
    fn imgbb_api_key(&self) -> Option<String> {
        self.read()
            .imgbb_api_key
            .or_else(|| std::env::var(IMGBB_KEY_VAR).ok().filter(|v| !v.is_empty()))
    }

    fn imgur_client_id(&self) -> Option<String> {
        self.read().imgur_client_id.or_else(|| {
            std::env::var(IMGUR_CLIENT_ID_VAR)
                .ok()
                .filter(|v| !v.is_empty())
        })
    }
}
