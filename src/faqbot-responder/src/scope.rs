//! Delivery contexts a message can arrive in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResponderError;

/// The context a message was delivered in.
///
/// Rules list the scopes they listen in; a message only reaches rules whose
/// scope set contains its own scope.
///
/// Rule files and the command line accept the same spellings: snake_case or
/// kebab-case, in any letter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Scope {
    /// Direct message to the bot.
    DirectMessage,
    /// Channel message that starts with a mention of the bot.
    DirectMention,
    /// Channel message that mentions the bot somewhere after the start.
    Mention,
    /// Channel message that does not mention the bot.
    Ambient,
    /// The bot itself joined a channel.
    ChannelJoin,
}

impl Scope {
    /// All scopes, in declaration order.
    pub const ALL: [Scope; 5] = [
        Scope::DirectMessage,
        Scope::DirectMention,
        Scope::Mention,
        Scope::Ambient,
        Scope::ChannelJoin,
    ];

    /// Canonical tag for this scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::DirectMessage => "direct_message",
            Scope::DirectMention => "direct_mention",
            Scope::Mention => "mention",
            Scope::Ambient => "ambient",
            Scope::ChannelJoin => "channel_join",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ResponderError;

    /// Parse a scope tag. Accepts snake_case and kebab-case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "direct_message" => Ok(Scope::DirectMessage),
            "direct_mention" => Ok(Scope::DirectMention),
            "mention" => Ok(Scope::Mention),
            "ambient" => Ok(Scope::Ambient),
            "channel_join" | "bot_channel_join" => Ok(Scope::ChannelJoin),
            _ => Err(ResponderError::UnknownScope(s.to_string())),
        }
    }
}

impl TryFrom<String> for Scope {
    type Error = ResponderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
