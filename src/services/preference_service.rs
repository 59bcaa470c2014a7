use crate::constants::{CONFIG_DIR_NAME, PREFERENCES_FILE_NAME};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Failed to load preferences: {0}")]
    LoadFailed(String),
    #[error("Failed to save preferences: {0}")]
    SaveFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// String preferences kept as one JSON object on disk.
pub struct JsonPreferenceStore {
    path: PathBuf,
    // serialises read-modify-write cycles
    lock: RwLock<()>,
}

impl JsonPreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: RwLock::new(()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|config_dir| config_dir.join(CONFIG_DIR_NAME).join(PREFERENCES_FILE_NAME))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, PreferenceError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| PreferenceError::LoadFailed(format!("{}: {}", self.path.display(), e)))?;
        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait::async_trait]
impl PreferenceStore for JsonPreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let _guard = self.lock.read().await;
        let mut values = self.read_all().await?;
        Ok(values.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _guard = self.lock.write().await;

        let mut values = match self.read_all().await {
            Ok(values) => values,
            Err(PreferenceError::Serialization(e)) => {
                tracing::warn!("Preferences file is corrupt, starting fresh: {}", e);
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value.to_string());

        // Ensure config directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    PreferenceError::SaveFailed(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let data = serde_json::to_string_pretty(&values)?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| PreferenceError::SaveFailed(format!("Failed to write preferences: {}", e)))?;

        tracing::debug!("Preference '{}' saved to {:?}", key, self.path);
        Ok(())
    }
}

/// Session-only store, used when the platform has no config directory.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonPreferenceStore::new(dir.path().join("preferences.json"));
        assert_eq!(store.get("parameters").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_store_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let store = JsonPreferenceStore::new(path.clone());
        store.set("parameters", "-c:v libx265").await.unwrap();
        store.set("other", "value").await.unwrap();
        store.set("parameters", "-c:v libx264").await.unwrap();

        // A fresh store reads what the first one wrote
        let reopened = JsonPreferenceStore::new(path);
        assert_eq!(
            reopened.get("parameters").await.unwrap().as_deref(),
            Some("-c:v libx264")
        );
        assert_eq!(reopened.get("other").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_json_store_recovers_from_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonPreferenceStore::new(path);
        assert!(store.get("parameters").await.is_err());

        store.set("parameters", "-an").await.unwrap();
        assert_eq!(store.get("parameters").await.unwrap().as_deref(), Some("-an"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryPreferenceStore::new();
        assert_eq!(store.get("parameters").await.unwrap(), None);
        store.set("parameters", "-an").await.unwrap();
        assert_eq!(store.get("parameters").await.unwrap().as_deref(), Some("-an"));
    }
}
