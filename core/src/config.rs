//! Configuration types for watched directories and the service itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WatcherError};

/// Default file name for the service configuration.
pub const DEFAULT_CONFIG_FILE: &str = "autoprint.toml";

/// A watched directory paired with a destination printer and a word filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfiguration {
    /// Stable identifier used by start/stop commands.
    pub id: Uuid,

    /// Printer name, passed through unchanged to the print utility.
    pub printer_id: String,

    /// Directory to monitor.
    pub path: PathBuf,

    /// A file qualifies if its name contains at least one of these.
    pub include_words: Vec<String>,

    /// Whether the directory is enrolled in periodic scheduling.
    pub active: bool,
}

impl WatchConfiguration {
    /// Create a new, inactive configuration.
    pub fn new(
        printer_id: impl Into<String>,
        path: impl Into<PathBuf>,
        include_words: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            printer_id: printer_id.into(),
            path: path.into(),
            include_words,
            active: false,
        }
    }

    /// Create a configuration from the comma-separated word list a user types.
    pub fn from_word_list(
        printer_id: impl Into<String>,
        path: impl Into<PathBuf>,
        words: &str,
    ) -> Self {
        Self::new(printer_id, path, parse_include_words(words))
    }
}

/// Split a comma-separated word list.
///
/// Tokens are kept exactly as typed: surrounding whitespace is not trimmed
/// and leading or inner empty tokens survive. Trailing empty tokens are
/// dropped, so `"ACME,"` is `["ACME"]` and `","` matches nothing. Input
/// without any comma is a single token, even when empty.
pub fn parse_include_words(words: &str) -> Vec<String> {
    if words.is_empty() {
        return vec![String::new()];
    }

    let mut tokens: Vec<String> = words.split(',').map(String::from).collect();
    while tokens.last().is_some_and(String::is_empty) {
        tokens.pop();
    }
    tokens
}

/// External print utility invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintCommand {
    /// Program to run.
    pub program: String,

    /// Arguments placed before the file name and printer name.
    pub args: Vec<String>,
}

impl Default for PrintCommand {
    fn default() -> Self {
        Self {
            program: "acrowrap.exe".to_string(),
            args: vec!["/acceptlicense".to_string(), "/t".to_string()],
        }
    }
}

/// Service-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Where `directories.json` and `excluded_files.json` live.
    pub state_dir: PathBuf,

    /// Files are copied here before printing; the print utility runs here.
    pub work_dir: PathBuf,

    /// Seconds between lifecycle passes.
    pub scan_interval_secs: u64,

    /// Name of the archive subdirectory beneath each watched directory.
    pub archive_dir_name: String,

    /// How to invoke the print utility.
    pub print_command: PrintCommand,

    /// Extra dispatch attempts after a spawn failure or non-zero exit.
    pub dispatch_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("."),
            work_dir: PathBuf::from("."),
            scan_interval_secs: 2,
            archive_dir_name: "archive".to_string(),
            print_command: PrintCommand::default(),
            dispatch_retries: 0,
        }
    }
}

impl ServiceConfig {
    /// Load the configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| WatcherError::Config(format!("{}: {e}", path.display())))
    }

    /// Interval between lifecycle passes.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Set the state directory.
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Set the working directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }
}
