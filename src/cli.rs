//! CLI surface: argument parsing and the async `run` entrypoint, split out of
//! `main` so integration tests can drive it directly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::backend::{Backend, GitHubBackend, ImgBbBackend, ImgurBackend};
use crate::backend::github::Provisioning;
use crate::config::FileCredentials;
use crate::exec::{CommandRunner, SystemRunner};
use crate::ids::UuidIds;
use crate::pr::PrUpdater;
use crate::section::ScreenshotEntry;

/// CLI for pr-screenshots: host screenshots and publish them into PR
/// descriptions.
#[derive(Parser)]
#[clap(
    name = "pr-screenshots",
    version,
    about = "Upload screenshots to a hosting backend and publish them into GitHub PR descriptions"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// ImgBB multipart API (requires an API key)
    Imgbb,
    /// Imgur base64 API (requires a client ID)
    Imgur,
    /// Orphan pr-assets branch of the current repo, via the gh CLI
    Github,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload one image and print its hosted URL as JSON
    Upload {
        /// Image file to upload
        file: PathBuf,
        /// Hosting backend to use
        #[clap(long, value_enum, default_value_t = BackendKind::Github)]
        backend: BackendKind,
    },
    /// Insert or refresh the "## Screenshots" section of a PR description
    UpdatePr {
        /// PR number (anything `gh pr view` accepts)
        number: String,
        /// Label + URL pair; repeat for multiple screenshots
        #[clap(
            long = "entry",
            num_args = 2,
            value_names = ["LABEL", "URL"],
            action = clap::ArgAction::Append,
            required = true
        )]
        entries: Vec<String>,
    },
    /// Create the orphan pr-assets branch in the current repo (safe to rerun)
    Setup,
    /// Persist hosting credentials to the config file
    Configure {
        /// ImgBB API key to save
        #[clap(long)]
        imgbb_api_key: Option<String>,
        /// Imgur client ID to save
        #[clap(long)]
        imgur_client_id: Option<String>,
    },
}

/// Async CLI logic entrypoint for integration tests and main().
pub async fn run(cli: Cli) -> Result<()> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

    match cli.command {
        Commands::Upload { file, backend } => {
            if !file.exists() {
                bail!("file not found: {}", file.display());
            }
            let backend: Box<dyn Backend> = match backend {
                BackendKind::Imgbb => {
                    let credentials = Arc::new(FileCredentials::from_default_location()?);
                    Box::new(ImgBbBackend::new(runner.clone(), credentials))
                }
                BackendKind::Imgur => {
                    let credentials = Arc::new(FileCredentials::from_default_location()?);
                    Box::new(ImgurBackend::new(runner.clone(), credentials))
                }
                BackendKind::Github => {
                    Box::new(GitHubBackend::new(runner.clone(), Arc::new(UuidIds)))
                }
            };
            backend.ensure_ready().await?;
            let url = backend.upload(&file).await?;
            println!("{}", serde_json::json!({ "url": url }));
        }

        Commands::UpdatePr { number, entries } => {
            let entries = pair_entries(&entries)?;
            PrUpdater::new(runner).update(&number, &entries).await?;
            println!(
                "PR #{number} description updated with {} screenshot(s).",
                entries.len()
            );
        }

        Commands::Setup => {
            let backend = GitHubBackend::new(runner, Arc::new(UuidIds));
            let repo = backend.current_repo().await?;
            match backend.provision().await? {
                Provisioning::AlreadyExists => println!(
                    "Branch '{}' already exists in {repo}. Nothing to do.",
                    crate::backend::github::ASSETS_BRANCH
                ),
                Provisioning::Created => println!(
                    "Branch '{}' created in {repo}.",
                    crate::backend::github::ASSETS_BRANCH
                ),
            }
        }

        Commands::Configure {
            imgbb_api_key,
            imgur_client_id,
        } => {
            if imgbb_api_key.is_none() && imgur_client_id.is_none() {
                bail!("nothing to save; pass --imgbb-api-key and/or --imgur-client-id");
            }
            let store = FileCredentials::from_default_location()?;
            if let Some(key) = imgbb_api_key {
                store
                    .save_imgbb_api_key(&key)
                    .context("saving ImgBB API key")?;
            }
            if let Some(client_id) = imgur_client_id {
                store
                    .save_imgur_client_id(&client_id)
                    .context("saving Imgur client ID")?;
            }
            println!("Credentials saved to {}", store.path().display());
        }
    }

    Ok(())
}

/// Turn the flat `--entry LABEL URL` argument stream into entries. clap
/// guarantees pairs via `num_args = 2`, but a stray odd value is still an
/// error rather than a silent drop.
fn pair_entries(values: &[String]) -> Result<Vec<ScreenshotEntry>> {
    if values.len() % 2 != 0 {
        bail!("--entry takes LABEL and URL; got an unpaired value");
    }
    Ok(values
        .chunks_exact(2)
        .map(|pair| ScreenshotEntry::new(&pair[0], &pair[1]))
        .collect())
}
