//! Size-budget compression: degrade an oversized image until it fits under a
//! backend's byte ceiling.
//!
//! The pipeline is staged and irreversible: first a lossy requantization at
//! quality 70, then (only if still too large) a downscale so the longer edge
//! is at most 1920px. A failed stage never aborts the upload; the best result
//! so far is uploaded and a warning is emitted. Each stage writes into a
//! fresh temp file and never overwrites its input.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::exec::{CommandRunner, Invocation};

/// Fixed requantization quality for the first stage.
const JPEG_QUALITY: &str = "70";
/// Longer-edge cap for the second stage.
const MAX_LONG_EDGE: &str = "1920";

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to allocate a temporary file: {0}")]
    TempFile(std::io::Error),
}

/// The file an upload call should send, plus guards that delete any
/// intermediate stage files once the upload attempt (success or failure)
/// is over. Dropping the asset releases the temp files.
pub struct PreparedAsset {
    path: PathBuf,
    _stages: Vec<TempPath>,
}

impl PreparedAsset {
    fn original(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            _stages: Vec::new(),
        }
    }

    fn derived(path: PathBuf, stages: Vec<TempPath>) -> Self {
        Self {
            path,
            _stages: stages,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when compression produced a new file instead of passing the
    /// original through.
    pub fn is_derived(&self) -> bool {
        !self._stages.is_empty()
    }
}

/// Brings images under a byte ceiling via `sips`, invoked through the
/// injected [`CommandRunner`].
pub struct Compressor {
    runner: Arc<dyn CommandRunner>,
}

impl Compressor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Return a file whose size is `<= ceiling` whenever achievable, else the
    /// smallest attainable result with a warning. Never fails the upload over
    /// a compression problem.
    pub async fn fit_under(
        &self,
        source: &Path,
        ceiling: u64,
    ) -> Result<PreparedAsset, CompressError> {
        let size = fs::metadata(source)
            .map_err(|e| CompressError::Stat {
                path: source.to_path_buf(),
                source: e,
            })?
            .len();

        if size <= ceiling {
            debug!(path = %source.display(), size, ceiling, "image already under the limit");
            return Ok(PreparedAsset::original(source));
        }

        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        // Re-encoding an animated GIF would break its animation.
        if extension == "gif" {
            warn!(
                size_mib = mib(size),
                ceiling_mib = mib(ceiling),
                "GIF exceeds the size limit; uploading as-is, the host may reject it"
            );
            return Ok(PreparedAsset::original(source));
        }

        // Stage 1: lossy requantization at a fixed quality.
        let stage1 = self.stage_file(&extension)?;
        let outcome = self
            .runner
            .run(Invocation::new(
                "sips",
                &[
                    "--setProperty",
                    "formatOptions",
                    JPEG_QUALITY,
                    &source.to_string_lossy(),
                    "--out",
                    &stage1.to_string_lossy(),
                ],
            ))
            .await;
        if !stage_succeeded(&outcome, &stage1) {
            warn!("quality compression failed; uploading the original");
            return Ok(PreparedAsset::original(source));
        }

        let stage1_size = file_size(&stage1);
        if stage1_size <= ceiling {
            debug!(size = stage1_size, ceiling, "quality reduction was enough");
            let path = stage1.to_path_buf();
            return Ok(PreparedAsset::derived(path, vec![stage1]));
        }

        // Stage 2: downscale the stage-1 output, not the original.
        let stage2 = self.stage_file(&extension)?;
        let outcome = self
            .runner
            .run(Invocation::new(
                "sips",
                &[
                    "--resampleHeightWidthMax",
                    MAX_LONG_EDGE,
                    &stage1.to_string_lossy(),
                    "--out",
                    &stage2.to_string_lossy(),
                ],
            ))
            .await;
        if !stage_succeeded(&outcome, &stage2) {
            warn!("resize failed; uploading the quality-compressed version");
            let path = stage1.to_path_buf();
            return Ok(PreparedAsset::derived(path, vec![stage1]));
        }

        let final_size = file_size(&stage2);
        if final_size > ceiling {
            warn!(
                size_mib = mib(final_size),
                ceiling_mib = mib(ceiling),
                "image is still over the limit after compression; the host may reject it"
            );
        }
        let path = stage2.to_path_buf();
        Ok(PreparedAsset::derived(path, vec![stage1, stage2]))
    }

    /// Pre-allocate a stage output file carrying the source's extension, so
    /// the encoder picks the right container format.
    fn stage_file(&self, extension: &str) -> Result<TempPath, CompressError> {
        let suffix = if extension.is_empty() {
            String::new()
        } else {
            format!(".{extension}")
        };
        let file = tempfile::Builder::new()
            .prefix("pr-screenshot-")
            .suffix(&suffix)
            .tempfile()
            .map_err(CompressError::TempFile)?;
        Ok(file.into_temp_path())
    }
}

/// A stage counts as successful only if the tool ran, exited zero, and wrote
/// a non-empty output file.
fn stage_succeeded(
    outcome: &Result<crate::exec::CommandOutcome, crate::exec::ExecError>,
    output: &Path,
) -> bool {
    matches!(outcome, Ok(o) if o.success) && file_size(output) > 0
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
