//! Durable list of watch configurations.

use std::path::Path;

use tracing::info;
use uuid::Uuid;

use crate::config::WatchConfiguration;
use crate::error::{Result, WatcherError};
use crate::store::ListFile;

/// File name of the registry inside the state directory.
pub const REGISTRY_FILE: &str = "directories.json";

/// Registered watch configurations, in the order they were added.
#[derive(Debug)]
pub struct DirectoryRegistry {
    file: ListFile<WatchConfiguration>,
}

impl DirectoryRegistry {
    /// Load the registry from the state directory.
    pub async fn load(state_dir: &Path) -> Result<Self> {
        Self::open(&state_dir.join(REGISTRY_FILE)).await
    }

    /// Load the registry from an explicit file.
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: ListFile::load(path).await?,
        })
    }

    /// Register a configuration and persist the registry.
    pub async fn add(&mut self, config: WatchConfiguration) -> Result<()> {
        info!(
            "Registering {} for printer {} (words: {:?})",
            config.path.display(),
            config.printer_id,
            config.include_words
        );
        self.file.push(config).await
    }

    /// Set the active flag of a configuration and persist the registry.
    pub async fn set_active(&mut self, id: Uuid, active: bool) -> Result<WatchConfiguration> {
        let config = self
            .file
            .items_mut()
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(WatcherError::UnknownConfiguration(id))?;

        config.active = active;
        let updated = config.clone();
        self.file.save().await?;
        Ok(updated)
    }

    /// Look up a configuration by id.
    pub fn get(&self, id: Uuid) -> Option<&WatchConfiguration> {
        self.file.items().iter().find(|c| c.id == id)
    }

    /// All configurations.
    pub fn list(&self) -> &[WatchConfiguration] {
        self.file.items()
    }

    /// Configurations currently enrolled in scheduling.
    pub fn active(&self) -> impl Iterator<Item = &WatchConfiguration> {
        self.file.items().iter().filter(|c| c.active)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_registry_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let config = WatchConfiguration::from_word_list("Office", "/scans", "ACME, BETA");

        {
            let mut registry = DirectoryRegistry::load(temp_dir.path()).await.unwrap();
            assert!(registry.list().is_empty());
            registry.add(config.clone()).await.unwrap();
        }

        let registry = DirectoryRegistry::load(temp_dir.path()).await.unwrap();
        assert_eq!(registry.list(), [config]);
    }

    #[tokio::test]
    async fn test_set_active_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config = WatchConfiguration::from_word_list("Office", "/scans", "ACME");
        let id = config.id;

        let mut registry = DirectoryRegistry::load(temp_dir.path()).await.unwrap();
        registry.add(config).await.unwrap();
        registry.set_active(id, true).await.unwrap();

        let reloaded = DirectoryRegistry::load(temp_dir.path()).await.unwrap();
        assert!(reloaded.get(id).unwrap().active);
        assert_eq!(reloaded.active().count(), 1);
    }

    #[tokio::test]
    async fn test_set_active_unknown_id() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = DirectoryRegistry::load(temp_dir.path()).await.unwrap();

        let result = registry.set_active(Uuid::new_v4(), true).await;
        assert!(matches!(result, Err(WatcherError::UnknownConfiguration(_))));
    }
}
