//! Stored record types.
//!
//! - `TeamRecord` - a workspace the bot is connected to or installed in
//! - `UserRecord` - a user who installed the bot

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A Slack workspace known to the bot.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Team ID (T...).
    pub id: String,
    /// Team name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The bot's own user ID in this team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_user_id: Option<String>,
    /// Bot token obtained through OAuth (app mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// User who installed the bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Installation timestamp (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<i64>,
    /// Last successful RTM connection (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<i64>,
}

impl std::fmt::Debug for TeamRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("bot_user_id", &self.bot_user_id)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("created_by", &self.created_by)
            .field("installed_at", &self.installed_at)
            .field("last_connected_at", &self.last_connected_at)
            .finish()
    }
}

impl TeamRecord {
    /// Create a record for a team ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Record an OAuth installation.
    pub fn installed(
        mut self,
        bot_user_id: impl Into<String>,
        bot_token: impl Into<String>,
        created_by: Option<String>,
    ) -> Self {
        self.bot_user_id = Some(bot_user_id.into());
        self.bot_token = Some(bot_token.into());
        self.created_by = created_by;
        self.installed_at = Some(Utc::now().timestamp());
        self
    }

    /// Stamp the record with the current time as last connection.
    pub fn touch_connected(&mut self) {
        self.last_connected_at = Some(Utc::now().timestamp());
    }

    /// Merge fields from `other` that are set, keeping ours otherwise.
    pub fn merge(&mut self, other: TeamRecord) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.bot_user_id.is_some() {
            self.bot_user_id = other.bot_user_id;
        }
        if other.bot_token.is_some() {
            self.bot_token = other.bot_token;
        }
        if other.created_by.is_some() {
            self.created_by = other.created_by;
        }
        if other.installed_at.is_some() {
            self.installed_at = other.installed_at;
        }
        if other.last_connected_at.is_some() {
            self.last_connected_at = other.last_connected_at;
        }
    }
}

/// A user the bot has seen install it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID (U...).
    pub id: String,
    /// Team the user belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, team_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            team_id,
            created_at: Utc::now().timestamp(),
        }
    }
}
