//! JSON file store.
//!
//! One pretty-printed JSON file per record:
//!
//! ```text
//! <root>/teams/<team_id>.json
//! <root>/users/<user_id>.json
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{Result, StorageError};
use crate::store::BotStorage;
use crate::types::{TeamRecord, UserRecord};

pub const TEAMS_DIR: &str = "teams";
pub const USERS_DIR: &str = "users";

/// File-backed [`BotStorage`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. Nothing is touched until [`init`](Self::init).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the collection directories.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(TEAMS_DIR)).await?;
        fs::create_dir_all(self.root.join(USERS_DIR)).await?;
        info!(root = %self.root.display(), "JSON file store initialized");
        Ok(())
    }

    fn record_path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(collection).join(format!("{}.json", id)))
    }

    async fn read_record<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let path = self.record_path(collection, id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a record and fsync it before returning.
    async fn write_record<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<()> {
        let path = self.record_path(collection, id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(record)?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        file.write_all(&content).await?;
        file.flush().await?;
        file.sync_all().await?;

        debug!(collection, id, "Record saved");
        Ok(())
    }

    async fn read_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let dir = self.root.join(collection);
        let mut records = Vec::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match fs::read(&path).await {
                    Ok(bytes) => match serde_json::from_slice(&bytes) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "Skipping unreadable record")
                        }
                    },
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to read record"),
                }
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl BotStorage for JsonFileStore {
    async fn get_team(&self, id: &str) -> Result<Option<TeamRecord>> {
        self.read_record(TEAMS_DIR, id).await
    }

    async fn save_team(&self, team: &TeamRecord) -> Result<()> {
        self.write_record(TEAMS_DIR, &team.id, team).await
    }

    async fn all_teams(&self) -> Result<Vec<TeamRecord>> {
        let mut teams: Vec<TeamRecord> = self.read_collection(TEAMS_DIR).await?;
        teams.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(teams)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        self.read_record(USERS_DIR, id).await
    }

    async fn save_user(&self, user: &UserRecord) -> Result<()> {
        self.write_record(USERS_DIR, &user.id, user).await
    }
}

/// Ids become file names, so only plain identifier characters are allowed.
fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !id.contains("..");
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_team_crud() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.init().await.unwrap();

        assert!(store.get_team("T1").await.unwrap().is_none());

        let team = TeamRecord::new("T1").installed("UBOT", "xoxb-1", Some("U1".to_string()));
        store.save_team(&team).await.unwrap();

        let loaded = store.get_team("T1").await.unwrap().unwrap();
        assert_eq!(loaded, team);
        assert!(dir.path().join("teams").join("T1.json").exists());

        store.save_team(&TeamRecord::new("T0")).await.unwrap();
        let ids: Vec<_> = store
            .all_teams()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["T0", "T1"]);
    }

    #[tokio::test]
    async fn test_upsert_team_merges() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.init().await.unwrap();

        let installed = TeamRecord::new("T1").installed("UBOT", "xoxb-1", None);
        store.save_team(&installed).await.unwrap();

        let mut seen = TeamRecord::new("T1");
        seen.name = Some("Acme".to_string());
        let merged = store.upsert_team(seen).await.unwrap();

        assert_eq!(merged.name.as_deref(), Some("Acme"));
        assert_eq!(merged.bot_token.as_deref(), Some("xoxb-1"));
        assert_eq!(store.get_team("T1").await.unwrap().unwrap(), merged);
    }

    #[tokio::test]
    async fn test_user_roundtrip() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.init().await.unwrap();

        let user = UserRecord::new("U1", Some("T1".to_string()));
        store.save_user(&user).await.unwrap();
        assert_eq!(store.get_user("U1").await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_all_teams_without_init() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("missing"));
        assert!(store.all_teams().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_teams_skips_corrupt_files() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.init().await.unwrap();
        store.save_team(&TeamRecord::new("T1")).await.unwrap();
        std::fs::write(dir.path().join("teams").join("broken.json"), "{not json").unwrap();

        let teams = store.all_teams().await.unwrap();
        assert_eq!(teams.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        for id in ["../escape", "a/b", "", ".."] {
            let err = store.get_team(id).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidId(_)), "id {:?}", id);
        }
    }
}
