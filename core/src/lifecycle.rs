//! Copy, print, record and archive for each qualifying file.
//!
//! Every step is attempted even when an earlier one failed. Failures are
//! collected into the file's [`FileOutcome`] and logged, and the pass moves
//! on to the next file.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{ServiceConfig, WatchConfiguration};
use crate::dispatch::{DispatchOutput, PrintDispatcher};
use crate::error::Result;
use crate::exclusion::ExclusionStore;
use crate::filter::select_candidates;

/// One step of a file's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStep {
    /// Copy into the working directory.
    Copy,

    /// Run the print utility.
    Dispatch,

    /// Append to the exclusion store.
    Record,

    /// Move into the archive directory.
    Archive,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Copy => "copy",
            Self::Dispatch => "dispatch",
            Self::Record => "record",
            Self::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// A step that failed for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: LifecycleStep,
    pub message: String,
}

/// What happened to one file during a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Base file name.
    pub file_name: String,

    /// Path in the watched directory.
    pub source: PathBuf,

    /// A copy was written to the working directory.
    pub copied: bool,

    /// Print utility result, when it could be run.
    pub dispatch: Option<DispatchOutput>,

    /// The name was added to the exclusion store by this pass.
    pub recorded: bool,

    /// The file was moved into the archive by this pass.
    pub archived: bool,

    /// Steps that failed, in execution order.
    pub failures: Vec<StepFailure>,
}

impl FileOutcome {
    fn new(file_name: String, source: PathBuf) -> Self {
        Self {
            file_name,
            source,
            copied: false,
            dispatch: None,
            recorded: false,
            archived: false,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, step: LifecycleStep, message: impl Into<String>) {
        let message = message.into();
        error!("{step} failed for {}: {message}", self.file_name);
        self.failures.push(StepFailure { step, message });
    }

    /// Every step completed without error.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether `step` failed.
    pub fn failed(&self, step: LifecycleStep) -> bool {
        self.failures.iter().any(|f| f.step == step)
    }
}

/// Aggregate result of one lifecycle pass over a watched directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    /// Configuration the pass ran for.
    pub config_id: Uuid,

    /// Directory that was scanned.
    pub directory: PathBuf,

    /// When the pass started.
    pub started_at: DateTime<Utc>,

    /// Time taken in milliseconds.
    pub duration_ms: u64,

    /// One entry per candidate, in processing order.
    pub outcomes: Vec<FileOutcome>,
}

impl PassReport {
    /// Number of candidates processed.
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of candidates with at least one failed step.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Runs the per-file lifecycle for a watched directory.
pub struct FileLifecycleManager {
    exclusions: Arc<Mutex<ExclusionStore>>,
    dispatcher: Arc<dyn PrintDispatcher>,
    work_dir: PathBuf,
    archive_dir_name: String,
}

impl FileLifecycleManager {
    /// Create a manager that copies into `work_dir`.
    pub fn new(
        exclusions: Arc<Mutex<ExclusionStore>>,
        dispatcher: Arc<dyn PrintDispatcher>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            exclusions,
            dispatcher,
            work_dir: work_dir.into(),
            archive_dir_name: "archive".to_string(),
        }
    }

    /// Create a manager using the working and archive directories from `config`.
    pub fn from_config(
        config: &ServiceConfig,
        exclusions: Arc<Mutex<ExclusionStore>>,
        dispatcher: Arc<dyn PrintDispatcher>,
    ) -> Self {
        Self::new(exclusions, dispatcher, &config.work_dir)
            .with_archive_dir_name(&config.archive_dir_name)
    }

    /// Set the name of the archive subdirectory.
    pub fn with_archive_dir_name(mut self, name: impl Into<String>) -> Self {
        self.archive_dir_name = name.into();
        self
    }

    /// Process every qualifying file in the configuration's directory.
    ///
    /// Fails only when the directory itself cannot be listed.
    pub async fn run_pass(&self, config: &WatchConfiguration) -> Result<PassReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        debug!("Scanning for files in {}", config.path.display());
        let excluded = self.exclusions.lock().await.as_set().clone();
        let candidates = select_candidates(&config.path, &excluded, &config.include_words).await?;

        let mut outcomes = Vec::with_capacity(candidates.len());
        for source in candidates {
            outcomes.push(self.process_file(&source, &config.printer_id).await);
        }

        let report = PassReport {
            config_id: config.id,
            directory: config.path.clone(),
            started_at,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcomes,
        };

        if report.processed() > 0 {
            info!(
                "Processed {} files in {} ({} with failures) in {}ms",
                report.processed(),
                report.directory.display(),
                report.failed(),
                report.duration_ms
            );
        }

        Ok(report)
    }

    /// Copy, print, record and archive a single file.
    pub async fn process_file(&self, source: &Path, printer: &str) -> FileOutcome {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut outcome = FileOutcome::new(file_name.clone(), source.to_path_buf());

        info!("Printing file: {file_name} - {}", source.display());

        match self.copy_to_work_dir(source, &file_name).await {
            Ok(copied) => outcome.copied = copied,
            Err(e) => outcome.fail(LifecycleStep::Copy, e.to_string()),
        }

        match self.dispatcher.dispatch(&file_name, printer).await {
            Ok(output) => outcome.dispatch = Some(output),
            Err(e) => outcome.fail(LifecycleStep::Dispatch, e.to_string()),
        }

        match self.exclusions.lock().await.add(&file_name).await {
            Ok(recorded) => outcome.recorded = recorded,
            Err(e) => outcome.fail(LifecycleStep::Record, e.to_string()),
        }

        match self.archive(source, &file_name).await {
            Ok(archived) => outcome.archived = archived,
            Err(e) => outcome.fail(LifecycleStep::Archive, e.to_string()),
        }

        outcome
    }

    /// Returns `false` when a file of that name already exists at the destination.
    async fn copy_to_work_dir(&self, source: &Path, file_name: &str) -> std::io::Result<bool> {
        let dest = self.work_dir.join(file_name);
        debug!("Copying file to: {}", dest.display());

        if fs::try_exists(&dest).await? {
            debug!("File already exists, ignoring: {}", dest.display());
            return Ok(false);
        }

        fs::copy(source, &dest).await?;
        Ok(true)
    }

    /// Returns `false` when the source was already gone. An existing file in
    /// the archive is never replaced.
    async fn archive(&self, source: &Path, file_name: &str) -> std::io::Result<bool> {
        let archive_dir = source
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.archive_dir_name);
        fs::create_dir_all(&archive_dir).await?;

        let dest = archive_dir.join(file_name);
        if fs::try_exists(&dest).await? {
            if !fs::try_exists(source).await? {
                debug!("File already moved: {}", source.display());
                return Ok(false);
            }
            return Err(std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            ));
        }

        match fs::rename(source, &dest).await {
            Ok(()) => {
                debug!("Archived {} to {}", source.display(), dest.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("File already moved: {}", source.display());
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
