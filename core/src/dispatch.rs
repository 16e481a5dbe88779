//! Print dispatch through an external utility.
//!
//! The `CommandDispatcher` runs the configured print utility in the working
//! directory and captures what it prints. The exit status is reported but
//! callers treat the file as handled either way.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{PrintCommand, ServiceConfig};
use crate::error::{Result, WatcherError};

/// Sends one file to one printer.
#[async_trait]
pub trait PrintDispatcher: Send + Sync {
    /// Print `file_name`, which is relative to the working directory.
    async fn dispatch(&self, file_name: &str, printer: &str) -> Result<DispatchOutput>;
}

/// Result of running the print utility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutput {
    /// Whether the utility exited with status zero.
    pub success: bool,

    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,

    /// Number of times the utility was run.
    pub attempts: u32,

    /// Wall time across all attempts in milliseconds.
    pub duration_ms: u64,
}

/// Runs the print utility as a subprocess.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    command: PrintCommand,
    work_dir: PathBuf,
    retries: u32,
}

impl CommandDispatcher {
    /// Create a dispatcher that runs `command` inside `work_dir`.
    pub fn new(command: PrintCommand, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            work_dir: work_dir.into(),
            retries: 0,
        }
    }

    /// Build a dispatcher from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.print_command.clone(), &config.work_dir)
            .with_retries(config.dispatch_retries)
    }

    /// Retry after a spawn failure or non-zero exit.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    async fn run_once(&self, file_name: &str, printer: &str) -> std::io::Result<std::process::Output> {
        Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(file_name)
            .arg(printer)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .output()
            .await
    }
}

#[async_trait]
impl PrintDispatcher for CommandDispatcher {
    async fn dispatch(&self, file_name: &str, printer: &str) -> Result<DispatchOutput> {
        let start = Instant::now();
        let max_attempts = self.retries.saturating_add(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(
                "Running {} for {file_name} on {printer} (attempt {attempts}/{max_attempts})",
                self.command.program
            );

            match self.run_once(file_name, printer).await {
                Ok(output) => {
                    let dispatched = DispatchOutput {
                        success: output.status.success(),
                        exit_code: output.status.code(),
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                        attempts,
                        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    };

                    if !dispatched.stdout.is_empty() {
                        info!("{}", dispatched.stdout.trim_end());
                    }
                    if !dispatched.stderr.is_empty() {
                        debug!("{}", dispatched.stderr.trim_end());
                    }

                    if dispatched.success || attempts >= max_attempts {
                        return Ok(dispatched);
                    }
                    warn!(
                        "Print utility exited with {:?} for {file_name}, retrying",
                        dispatched.exit_code
                    );
                }
                Err(e) if attempts < max_attempts => {
                    warn!("Failed to run {}: {e}, retrying", self.command.program);
                }
                Err(e) => {
                    return Err(WatcherError::Dispatch(format!(
                        "{}: {e}",
                        self.command.program
                    )));
                }
            }
        }
    }
}
