//! JSON file campaign store
//!
//! Features:
//! - Versioned file schema; a mismatch fails loudly instead of degrading
//! - Atomic writes (unique temp file + rename)
//! - Read-modify-write cycles hold an exclusive lock on `<path>.lock`, so the
//!   CLI and a running daemon can share one file
//! - Every operation re-reads the file, so several processes see each other's writes

use super::{CampaignStore, sort_oldest_first};
use crate::core::campaign::{Campaign, CampaignUpdate};
use crate::core::error::CampaignError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    schema_version: u32,
    campaigns: Vec<Campaign>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct StoreHeader {
    #[serde(default)]
    schema_version: u32,
}

/// Exclusive advisory lock on the sidecar lock file; released on drop
struct FileLock {
    _file: std::fs::File,
}

/// Store persisting all campaigns in one JSON document
pub struct JsonFileCampaignStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileCampaignStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file guarding writers across processes
    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Block until no other writer, in this or another process, holds the file
    async fn lock_file(&self) -> Result<FileLock, CampaignError> {
        fs::create_dir_all(self.parent_dir())
            .await
            .map_err(CampaignError::persistence)?;

        let lock_path = self.lock_path();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(CampaignError::persistence)?
        .map_err(|e| {
            CampaignError::persistence(format!(
                "failed to lock {}: {}",
                self.lock_path().display(),
                e
            ))
        })?;

        Ok(FileLock { _file: file })
    }

    async fn load(&self) -> Result<Vec<Campaign>, CampaignError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CampaignError::persistence(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let header: StoreHeader = serde_json::from_str(&content).map_err(|e| {
            CampaignError::persistence(format!("failed to parse {}: {}", self.path.display(), e))
        })?;
        if header.schema_version != SCHEMA_VERSION {
            return Err(CampaignError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: header.schema_version,
            });
        }

        let file: StoreFile = serde_json::from_str(&content).map_err(|e| {
            CampaignError::persistence(format!("failed to parse {}: {}", self.path.display(), e))
        })?;

        Ok(file.campaigns)
    }

    /// Caller must hold the file lock
    async fn save(&self, campaigns: Vec<Campaign>) -> Result<(), CampaignError> {
        let file = StoreFile {
            schema_version: SCHEMA_VERSION,
            campaigns,
            last_updated: Some(Utc::now()),
        };
        let json = serde_json::to_string_pretty(&file).map_err(CampaignError::persistence)?;

        // Atomic write: unique temp file in the same directory, then rename
        let dir = self.parent_dir();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp = NamedTempFile::new_in(&dir)?;
            temp.write_all(json.as_bytes())?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(CampaignError::persistence)?
        .map_err(|e| {
            CampaignError::persistence(format!("failed to write {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), "campaign store written");
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for JsonFileCampaignStore {
    async fn create(&self, campaign: Campaign) -> Result<Campaign, CampaignError> {
        let _guard = self.write_lock.lock().await;
        let _lock = self.lock_file().await?;
        let mut campaigns = self.load().await?;

        if campaigns.iter().any(|c| c.id == campaign.id) {
            return Err(CampaignError::persistence(format!(
                "campaign {} already exists",
                campaign.id
            )));
        }

        campaigns.push(campaign.clone());
        self.save(campaigns).await?;
        Ok(campaign)
    }

    async fn get(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        self.load()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(CampaignError::NotFound { id })
    }

    async fn update(&self, id: Uuid, update: CampaignUpdate) -> Result<Campaign, CampaignError> {
        let _guard = self.write_lock.lock().await;
        let _lock = self.lock_file().await?;
        let mut campaigns = self.load().await?;

        let campaign = campaigns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CampaignError::NotFound { id })?;
        campaign.apply_update(update)?;
        let updated = campaign.clone();

        self.save(campaigns).await?;
        Ok(updated)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Campaign>, CampaignError> {
        let mut owned: Vec<Campaign> = self
            .load()
            .await?
            .into_iter()
            .filter(|c| c.owner_id == owner_id)
            .collect();
        sort_oldest_first(&mut owned);
        Ok(owned)
    }

    async fn list_all(&self) -> Result<Vec<Campaign>, CampaignError> {
        let mut all = self.load().await?;
        sort_oldest_first(&mut all);
        Ok(all)
    }

    async fn delete(&self, id: Uuid) -> Result<(), CampaignError> {
        let _guard = self.write_lock.lock().await;
        let _lock = self.lock_file().await?;
        let mut campaigns = self.load().await?;

        let before = campaigns.len();
        campaigns.retain(|c| c.id != id);
        if campaigns.len() == before {
            return Err(CampaignError::NotFound { id });
        }

        self.save(campaigns).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::campaign::ExecutionProgress;
    use crate::core::state_machine::CampaignStatus;
    use crate::test_support::sample_campaign;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileCampaignStore {
        JsonFileCampaignStore::new(dir.path().join("nested").join("campaigns.json"))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_survive_a_new_instance() {
        let dir = TempDir::new().unwrap();
        let campaign = store_in(&dir)
            .create(sample_campaign("user-1"))
            .await
            .unwrap();

        store_in(&dir)
            .update(
                campaign.id,
                CampaignUpdate {
                    status: Some(CampaignStatus::Active),
                    started_at: Some(Utc::now()),
                    execution_progress: Some(Some(ExecutionProgress::new(2, Utc::now()))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = store_in(&dir).get(campaign.id).await.unwrap();
        assert_eq!(reloaded.status, CampaignStatus::Active);
        assert_eq!(reloaded.execution_progress.unwrap().total_platforms, 2);
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create(sample_campaign("user-1")).await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["campaigns.json", "campaigns.json.lock"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_instances_on_one_file_keep_every_update() {
        let dir = TempDir::new().unwrap();
        let first = Arc::new(store_in(&dir));
        let second = Arc::new(store_in(&dir));
        let campaign = first.create(sample_campaign("user-1")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..40 {
            let store = if i % 2 == 0 {
                first.clone()
            } else {
                second.clone()
            };
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        campaign.id,
                        CampaignUpdate {
                            add_site_used: Some(format!("site-{}.example", i)),
                            ..Default::default()
                        },
                    )
                    .await
            }));
        }

        let mut errors = 0;
        for handle in handles {
            if handle.await.unwrap().is_err() {
                errors += 1;
            }
        }

        assert_eq!(errors, 0);
        let stored = second.get(campaign.id).await.unwrap();
        assert_eq!(stored.target_sites_used.len(), 40);
    }

    #[tokio::test]
    async fn test_unreadable_path_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let store = JsonFileCampaignStore::new(blocker.join("campaigns.json"));

        assert!(matches!(
            store.list_all().await,
            Err(CampaignError::Persistence { .. })
        ));
    }

    #[tokio::test]
    async fn test_schema_mismatch_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"schema_version": 7, "campaigns": []}"#).unwrap();

        let result = store.list_all().await;
        assert_eq!(
            result.unwrap_err(),
            CampaignError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: 7
            }
        );
    }

    #[tokio::test]
    async fn test_unversioned_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"campaigns": []}"#).unwrap();

        assert!(matches!(
            store.list_all().await,
            Err(CampaignError::SchemaMismatch { found: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(CampaignError::Persistence { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_and_list_by_owner() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let first = store.create(sample_campaign("user-1")).await.unwrap();
        store.create(sample_campaign("user-1")).await.unwrap();
        store.create(sample_campaign("user-2")).await.unwrap();

        store.delete(first.id).await.unwrap();

        assert_eq!(store.list_by_owner("user-1").await.unwrap().len(), 1);
        assert_eq!(
            store.get(first.id).await.unwrap_err(),
            CampaignError::NotFound { id: first.id }
        );
    }
}
