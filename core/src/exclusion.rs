//! Durable record of filenames that have already been dispatched.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::store::ListFile;

/// File name of the exclusion list inside the state directory.
pub const EXCLUSION_FILE: &str = "excluded_files.json";

/// Process-wide set of base filenames that must not be printed again.
///
/// Names are only ever appended. Matching is exact equality on the bare
/// filename, so a same-named file in another watched directory is skipped
/// too.
#[derive(Debug)]
pub struct ExclusionStore {
    file: ListFile<String>,
    index: HashSet<String>,
}

impl ExclusionStore {
    /// Load the store from the state directory.
    pub async fn load(state_dir: &Path) -> Result<Self> {
        Self::open(&state_dir.join(EXCLUSION_FILE)).await
    }

    /// Load the store from an explicit file.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = ListFile::load(path).await?;
        let index = file.items().iter().cloned().collect();
        Ok(Self { file, index })
    }

    /// Record a name and persist the whole list.
    ///
    /// Returns `false` when the name was already present; nothing is written
    /// in that case.
    pub async fn add(&mut self, name: &str) -> Result<bool> {
        if self.index.contains(name) {
            return Ok(false);
        }

        self.index.insert(name.to_string());
        self.file.push(name.to_string()).await?;
        debug!("Excluded {name} ({} total)", self.index.len());
        Ok(true)
    }

    /// Whether a name has been recorded.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Recorded names in insertion order.
    pub fn names(&self) -> &[String] {
        self.file.items()
    }

    /// Recorded names as a set, for filtering.
    pub fn as_set(&self) -> &HashSet<String> {
        &self.index
    }

    /// Number of recorded names.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
