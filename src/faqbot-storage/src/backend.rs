//! Backend selection.
//!
//! A hosted document store is chosen when `MONGOLAB_URI` is set; otherwise
//! records go to a JSON file store whose directory depends on how the bot
//! was started, so an app and a custom integration never share state.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::error::{Result, StorageError};
use crate::json_store::JsonFileStore;
use crate::store::BotStorage;

/// Environment variable naming the hosted document store.
pub const HOSTED_URI_ENV: &str = "MONGOLAB_URI";

/// JSON store directory for custom integrations.
pub const CUSTOM_INTEGRATION_DIR: &str = "./db_slack_bot_ci/";

/// JSON store directory for apps.
pub const APP_DIR: &str = "./db_slack_bot_a/";

/// Which persistence backend to use.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// One JSON file per record under `dir`.
    JsonFile { dir: PathBuf },
    /// Hosted document store reached through `uri`.
    Hosted { uri: String },
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::JsonFile { dir } => {
                f.debug_struct("JsonFile").field("dir", dir).finish()
            }
            // Connection strings carry credentials.
            StorageBackend::Hosted { .. } => {
                f.debug_struct("Hosted").field("uri", &"[REDACTED]").finish()
            }
        }
    }
}

impl StorageBackend {
    /// Pick a backend from `hosted_uri` and the bootstrap mode.
    pub fn resolve(hosted_uri: Option<String>, custom_integration: bool) -> Self {
        match hosted_uri.filter(|uri| !uri.trim().is_empty()) {
            Some(uri) => StorageBackend::Hosted { uri },
            None => StorageBackend::JsonFile {
                dir: PathBuf::from(if custom_integration {
                    CUSTOM_INTEGRATION_DIR
                } else {
                    APP_DIR
                }),
            },
        }
    }

    /// Open the backend.
    ///
    /// Only the JSON file store ships with faqbot; a hosted store has to be
    /// provided by implementing [`BotStorage`].
    pub async fn open(&self) -> Result<Arc<dyn BotStorage>> {
        match self {
            StorageBackend::JsonFile { dir } => {
                let store = JsonFileStore::new(dir.clone());
                store.init().await?;
                Ok(Arc::new(store))
            }
            StorageBackend::Hosted { .. } => {
                info!("Hosted document store requested via {}", HOSTED_URI_ENV);
                Err(StorageError::Unsupported(format!(
                    "hosted document store ({} is set); unset it to use the JSON file store",
                    HOSTED_URI_ENV
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_json_dirs() {
        assert_eq!(
            StorageBackend::resolve(None, true),
            StorageBackend::JsonFile {
                dir: PathBuf::from("./db_slack_bot_ci/")
            }
        );
        assert_eq!(
            StorageBackend::resolve(None, false),
            StorageBackend::JsonFile {
                dir: PathBuf::from("./db_slack_bot_a/")
            }
        );
        assert_eq!(
            StorageBackend::resolve(Some("  ".to_string()), false),
            StorageBackend::JsonFile {
                dir: PathBuf::from("./db_slack_bot_a/")
            }
        );
    }

    #[test]
    fn test_resolve_hosted_and_redact() {
        let backend = StorageBackend::resolve(Some("mongodb://user:pw@host/db".to_string()), true);
        assert!(matches!(backend, StorageBackend::Hosted { .. }));
        assert!(!format!("{:?}", backend).contains("pw@host"));
    }

    #[tokio::test]
    async fn test_open_json_store() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StorageBackend::JsonFile {
            dir: dir.path().join("store"),
        };
        let store = backend.open().await.unwrap();
        assert!(store.all_teams().await.unwrap().is_empty());
        assert!(dir.path().join("store").join("teams").is_dir());
    }

    #[tokio::test]
    async fn test_open_hosted_is_unsupported() {
        let backend = StorageBackend::Hosted {
            uri: "mongodb://localhost/bot".to_string(),
        };
        let result = backend.open().await;
        assert!(matches!(result, Err(StorageError::Unsupported(_))));
    }
}
