//! JSON-backed ordered lists.
//!
//! Both persisted collections are whole-file JSON arrays that are rewritten
//! on every mutation.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, StorageError};

/// An ordered collection mirrored to a single file.
#[derive(Debug)]
pub(crate) struct ListFile<T> {
    path: PathBuf,
    items: Vec<T>,
}

impl<T> ListFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Load the list from `path`. A missing file is an empty list.
    pub(crate) async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;
        if !exists {
            debug!("No state file at {}, starting empty", path.display());
            return Ok(Self {
                path,
                items: Vec::new(),
            });
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;
        let items: Vec<T> = serde_json::from_str(&content)?;

        debug!("Loaded {} entries from {}", items.len(), path.display());
        Ok(Self { path, items })
    }

    /// Write the full list to disk.
    pub(crate) async fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.items)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    StorageError::CreateDirectory(format!("{}: {e}", parent.display()))
                })?;
            }
        }

        // Write atomically
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", self.path.display())))?;

        Ok(())
    }

    /// Append an item and save immediately.
    ///
    /// The item stays in memory even when the save fails.
    pub(crate) async fn push(&mut self, item: T) -> Result<()> {
        self.items.push(item);
        self.save().await
    }

    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
