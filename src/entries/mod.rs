//! Config entries - one per 17track account
//!
//! Kept in memory and mirrored to a JSON file so an imported or user-created
//! account survives restarts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{AccountCredentials, AccountOptions, EntrySource};

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("Account {0} is already configured")]
    AlreadyConfigured(String),

    #[error("Entry storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entry storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    /// Account id reported by the 17track sign-in
    pub unique_id: String,
    pub title: String,
    pub source: EntrySource,
    pub data: AccountCredentials,
    pub options: AccountOptions,
    pub created_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(
        unique_id: impl Into<String>,
        data: AccountCredentials,
        options: AccountOptions,
        source: EntrySource,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            unique_id: unique_id.into(),
            title: data.username.clone(),
            source,
            data,
            options,
            created_at: Utc::now(),
        }
    }
}

/// Entry as returned by the HTTP API (no password)
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub entry_id: String,
    pub unique_id: String,
    pub title: String,
    pub source: EntrySource,
    pub username: String,
    pub options: AccountOptions,
    pub created_at: DateTime<Utc>,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl EntryView {
    /// View of an entry that is not loaded
    pub fn new(entry: &ConfigEntry) -> Self {
        Self {
            entry_id: entry.entry_id.clone(),
            unique_id: entry.unique_id.clone(),
            title: entry.title.clone(),
            source: entry.source,
            username: entry.data.username.clone(),
            options: entry.options,
            created_at: entry.created_at,
            loaded: false,
            last_update_success: None,
            last_updated: None,
            last_error: None,
        }
    }
}

pub struct ConfigEntries {
    path: Option<PathBuf>,
    entries: RwLock<Vec<ConfigEntry>>,
}

impl ConfigEntries {
    /// Store without a backing file
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Load entries from `path`; a missing file is an empty store
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EntryError> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No entry file at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
        })
    }

    async fn persist(&self, entries: &[ConfigEntry]) -> Result<(), EntryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn list(&self) -> Vec<ConfigEntry> {
        self.entries.read().await.clone()
    }

    pub async fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.entry_id == entry_id)
            .cloned()
    }

    pub async fn find_by_unique_id(&self, unique_id: &str) -> Option<ConfigEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.unique_id == unique_id)
            .cloned()
    }

    /// Add an entry; accounts are unique by `unique_id`
    pub async fn add(&self, entry: ConfigEntry) -> Result<(), EntryError> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.unique_id == entry.unique_id) {
            return Err(EntryError::AlreadyConfigured(entry.unique_id));
        }

        entries.push(entry);
        if let Err(e) = self.persist(&entries).await {
            entries.pop();
            return Err(e);
        }
        Ok(())
    }

    pub async fn remove(&self, entry_id: &str) -> Result<Option<ConfigEntry>, EntryError> {
        let mut entries = self.entries.write().await;
        let Some(index) = entries.iter().position(|e| e.entry_id == entry_id) else {
            return Ok(None);
        };

        let removed = entries.remove(index);
        if let Err(e) = self.persist(&entries).await {
            entries.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    pub async fn update_options(
        &self,
        entry_id: &str,
        options: AccountOptions,
    ) -> Result<Option<ConfigEntry>, EntryError> {
        let mut entries = self.entries.write().await;
        let Some(index) = entries.iter().position(|e| e.entry_id == entry_id) else {
            return Ok(None);
        };

        let previous = std::mem::replace(&mut entries[index].options, options);
        if let Err(e) = self.persist(&entries).await {
            entries[index].options = previous;
            return Err(e);
        }
        let updated = entries[index].clone();
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(unique_id: &str) -> ConfigEntry {
        ConfigEntry::new(
            unique_id,
            AccountCredentials {
                username: format!("{}@example.com", unique_id),
                password: "secret".to_string(),
            },
            AccountOptions::default(),
            EntrySource::User,
        )
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("seventeentrack-{}", uuid::Uuid::new_v4()))
            .join("entries.json")
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_account() {
        let store = ConfigEntries::in_memory();
        store.add(entry("111")).await.unwrap();

        let err = store.add(entry("111")).await.unwrap_err();
        assert!(matches!(err, EntryError::AlreadyConfigured(id) if id == "111"));
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_and_remove() {
        let store = ConfigEntries::in_memory();
        let e = entry("222");
        let id = e.entry_id.clone();
        store.add(e).await.unwrap();

        assert!(store.get(&id).await.is_some());
        assert_eq!(store.find_by_unique_id("222").await.unwrap().entry_id, id);

        let removed = store.remove(&id).await.unwrap().unwrap();
        assert_eq!(removed.unique_id, "222");
        assert!(store.get(&id).await.is_none());
        assert!(store.remove(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_options() {
        let store = ConfigEntries::in_memory();
        let e = entry("333");
        let id = e.entry_id.clone();
        store.add(e).await.unwrap();

        let options = AccountOptions {
            show_archived: true,
            show_delivered: false,
        };
        let updated = store.update_options(&id, options).await.unwrap().unwrap();
        assert!(updated.options.show_archived);
        assert!(store.update_options("missing", options).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_loads() {
        let path = temp_path();

        let store = ConfigEntries::load(&path).await.unwrap();
        assert!(store.list().await.is_empty());
        store.add(entry("444")).await.unwrap();

        let reloaded = ConfigEntries::load(&path).await.unwrap();
        let entries = reloaded.list().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].unique_id, "444");
        assert_eq!(entries[0].data.password, "secret");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_and_disk_in_step() {
        let path = temp_path();
        let store = ConfigEntries::load(&path).await.unwrap();
        let e = entry("666");
        let id = e.entry_id.clone();
        store.add(e).await.unwrap();

        // A directory where the temp file goes makes every write fail
        std::fs::create_dir_all(path.with_extension("json.tmp")).unwrap();

        let options = AccountOptions {
            show_archived: true,
            show_delivered: true,
        };
        assert!(store.update_options(&id, options).await.is_err());
        assert_eq!(store.get(&id).await.unwrap().options, AccountOptions::default());

        assert!(store.remove(&id).await.is_err());
        assert!(store.get(&id).await.is_some());

        let on_disk = ConfigEntries::load(&path).await.unwrap().list().await;
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].options, AccountOptions::default());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_view_omits_password() {
        let view = EntryView::new(&entry("555"));
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("555@example.com"));
        assert!(!json.contains("last_error"));
    }
}
