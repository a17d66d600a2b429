//! Storage trait implemented by every persistence backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{TeamRecord, UserRecord};

/// Persistence for the records the bot keeps about workspaces and users.
#[async_trait]
pub trait BotStorage: Send + Sync {
    /// Get a team by ID.
    async fn get_team(&self, id: &str) -> Result<Option<TeamRecord>>;

    /// Insert or replace a team.
    async fn save_team(&self, team: &TeamRecord) -> Result<()>;

    /// All stored teams.
    async fn all_teams(&self) -> Result<Vec<TeamRecord>>;

    /// Get a user by ID.
    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>>;

    /// Insert or replace a user.
    async fn save_user(&self, user: &UserRecord) -> Result<()>;

    /// Merge `team` into the stored record (creating it if absent).
    async fn upsert_team(&self, team: TeamRecord) -> Result<TeamRecord> {
        let merged = match self.get_team(&team.id).await? {
            Some(mut stored) => {
                stored.merge(team);
                stored
            }
            None => team,
        };
        self.save_team(&merged).await?;
        Ok(merged)
    }
}
