//! Publishing merged Screenshots sections into PR descriptions via the gh CLI.
//!
//! The fetch-modify-write sequence is last-writer-wins: no optimistic
//! concurrency check runs between reading and writing the body, so callers
//! needing stronger guarantees must serialize access externally.

use std::fs;
use std::sync::Arc;

use tracing::info;

use crate::exec::{CommandRunner, ExecError, Invocation};
use crate::section::{self, ScreenshotEntry};

#[derive(Debug, thiserror::Error)]
pub enum PrError {
    #[error("could not fetch PR #{number}: {message}")]
    Fetch { number: String, message: String },
    #[error("could not update PR #{number}: {message}")]
    Edit { number: String, message: String },
    #[error("failed to stage the updated description: {0}")]
    Stage(#[from] std::io::Error),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

pub struct PrUpdater {
    runner: Arc<dyn CommandRunner>,
}

impl PrUpdater {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Fetch the current PR body, splice in the entries, and write it back.
    pub async fn update(&self, number: &str, entries: &[ScreenshotEntry]) -> Result<(), PrError> {
        let outcome = self
            .runner
            .run(Invocation::new(
                "gh",
                &["pr", "view", number, "--json", "body", "-q", ".body"],
            ))
            .await?;
        if !outcome.success {
            return Err(PrError::Fetch {
                number: number.to_string(),
                message: outcome.stderr.trim().to_string(),
            });
        }

        let updated = section::merge(&outcome.stdout, entries);

        // gh reads the new body from a file so the markdown survives shell
        // quoting; the temp file is removed when `staged` drops.
        let staged = tempfile::Builder::new().suffix(".md").tempfile()?;
        fs::write(staged.path(), &updated)?;

        let outcome = self
            .runner
            .run(Invocation::new(
                "gh",
                &[
                    "pr",
                    "edit",
                    number,
                    "--body-file",
                    &staged.path().to_string_lossy(),
                ],
            ))
            .await?;
        if !outcome.success {
            return Err(PrError::Edit {
                number: number.to_string(),
                message: outcome.stderr.trim().to_string(),
            });
        }

        info!(pr = number, entries = entries.len(), "PR description updated");
        Ok(())
    }
}
