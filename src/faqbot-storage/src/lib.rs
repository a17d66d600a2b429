//! faqbot storage - persistence for workspaces and installers.
//!
//! # Features
//!
//! - [`BotStorage`] trait shared by all backends
//! - [`JsonFileStore`]: one JSON file per record, fsynced on write
//! - [`StorageBackend`]: picks the backend from the environment and the
//!   bootstrap mode
//!
//! # Usage
//!
//! ```rust,no_run
//! use faqbot_storage::{BotStorage, JsonFileStore, TeamRecord};
//!
//! #[tokio::main]
//! async fn main() -> faqbot_storage::Result<()> {
//!     let store = JsonFileStore::new("./db_slack_bot_a/");
//!     store.init().await?;
//!
//!     store.save_team(&TeamRecord::new("T024BE7LD")).await?;
//!     let teams = store.all_teams().await?;
//!     println!("Found {} teams", teams.len());
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod json_store;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use backend::StorageBackend;
pub use error::{Result, StorageError};
pub use json_store::JsonFileStore;
pub use store::BotStorage;
pub use types::{TeamRecord, UserRecord};
