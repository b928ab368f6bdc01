//! Narrow capability for running external commands.
//!
//! The compressor and every backend depend on this trait instead of spawning
//! processes directly, so tests can simulate tool failures without invoking
//! real binaries. The trait is annotated for `mockall` so consumers can
//! generate deterministic mocks.

use async_trait::async_trait;
use tracing::debug;

/// A single external command invocation. Fully owned so mocks can inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Payload piped to the child's stdin, if any.
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, payload: String) -> Self {
        self.stdin = Some(payload);
        self
    }

    /// True when `flag` appears anywhere in the argument list.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn succeeded(stdout: &str) -> Self {
        Self {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: &str) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("failed to write stdin for `{program}`: {source}")]
    Stdin {
        program: String,
        source: std::io::Error,
    },
    #[error("failed to collect output of `{program}`: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// Trait for running one command to completion and capturing its output.
///
/// Implementations block until the child exits; there is no timeout here.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: Invocation) -> Result<CommandOutcome, ExecError>;
}

/// Runs commands via `std::process::Command`, blocking the current task.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: Invocation) -> Result<CommandOutcome, ExecError> {
        use std::io::Write;
        use std::process::{Command, Stdio};

        debug!(
            program = %invocation.program,
            args = ?invocation.args,
            "running external command"
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        if let Some(payload) = &invocation.stdin {
            // Taking the handle closes the pipe when it drops, signalling EOF.
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(payload.as_bytes())
                    .map_err(|source| ExecError::Stdin {
                        program: invocation.program.clone(),
                        source,
                    })?;
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| ExecError::Wait {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(CommandOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
