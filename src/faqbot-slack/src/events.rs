//! RTM events and message classification.
//!
//! The RTM socket delivers JSON events tagged by `type`. The bot cares about:
//! - `hello` - the connection is ready
//! - `message` - something was posted where the bot can see it
//! - `goodbye` - the server is about to close the socket
//! - `pong` - answer to our keep-alive ping
//! - `error` - a socket-level error report
//!
//! Everything else decodes as [`RtmEvent::Unknown`].

use faqbot_responder::{IncomingMessage, Scope};
use serde::{Deserialize, Serialize};

use crate::error::{SlackError, SlackResult};

/// Subtypes posted when someone joins a channel or private group.
const JOIN_SUBTYPES: &[&str] = &["channel_join", "group_join"];

/// Events received over the RTM socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RtmEvent {
    /// Connection established.
    Hello,
    /// Server is closing the connection.
    Goodbye,
    /// A message was posted.
    Message(MessageEvent),
    /// Reply to a ping we sent.
    Pong {
        #[serde(default)]
        reply_to: Option<u64>,
    },
    /// Socket-level error.
    Error {
        #[serde(default)]
        error: Option<serde_json::Value>,
    },
    /// Unknown event type (for forward compatibility).
    #[serde(other)]
    Unknown,
}

/// Event payload for messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEvent {
    /// User who sent the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Text of the message.
    #[serde(default)]
    pub text: String,
    /// Channel where the message was sent.
    #[serde(default)]
    pub channel: String,
    /// Channel type (im, channel, group, mpim).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    /// Timestamp of the message.
    #[serde(default)]
    pub ts: String,
    /// Thread timestamp (if in a thread).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Event timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_ts: Option<String>,
    /// Subtype of message (e.g., "bot_message").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Bot ID (if message is from a bot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// Check if this is a direct message.
    pub fn is_direct_message(&self) -> bool {
        self.channel.starts_with('D') || self.channel_type.as_deref() == Some("im")
    }

    /// Check if this is a bot message (should be ignored).
    pub fn is_bot_message(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message")
    }

    /// Check if this announces someone joining the channel.
    pub fn is_join(&self) -> bool {
        self.subtype
            .as_deref()
            .is_some_and(|s| JOIN_SUBTYPES.contains(&s))
    }

    /// Check if this was posted by `user_id`.
    pub fn is_from(&self, user_id: &str) -> bool {
        self.user.as_deref() == Some(user_id)
    }
}

/// Decode one RTM frame.
///
/// Acknowledgements of our own sends carry `reply_to` but no `type`; those
/// return `Ok(None)`.
pub fn parse_rtm_event(text: &str) -> SlackResult<Option<RtmEvent>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("type").is_none() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| SlackError::InvalidPayload(format!("RTM event: {}", e)))
}

/// Strip a leading `<@bot_user_id>` mention, plus an optional `:` and the
/// whitespace after it.
///
/// Returns `None` when the text does not start with a mention of the bot.
///
/// ```rust
/// use faqbot_slack::events::strip_leading_mention;
///
/// assert_eq!(strip_leading_mention("<@U1>: hello", "U1"), Some("hello"));
/// assert_eq!(strip_leading_mention("<@U1|faqbot> hi", "U1"), Some("hi"));
/// assert_eq!(strip_leading_mention("hello <@U1>", "U1"), None);
/// ```
pub fn strip_leading_mention<'a>(text: &'a str, bot_user_id: &str) -> Option<&'a str> {
    let rest = text.trim_start().strip_prefix("<@")?;
    let end = rest.find('>')?;
    let id = rest[..end].split('|').next().unwrap_or_default();
    if id != bot_user_id {
        return None;
    }
    let rest = &rest[end + 1..];
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(rest.trim_start())
}

/// Check if `text` mentions `bot_user_id` anywhere.
pub fn mentions(text: &str, bot_user_id: &str) -> bool {
    text.contains(&format!("<@{}>", bot_user_id)) || text.contains(&format!("<@{}|", bot_user_id))
}

/// Turn a message event into the responder's input.
///
/// Returns `None` for messages the bot must not answer: other bots, the
/// bot's own messages, edits, deletions and other subtypes, and joins by
/// anyone but the bot.
pub fn classify(event: &MessageEvent, bot_user_id: &str) -> Option<IncomingMessage> {
    if event.is_bot_message() {
        return None;
    }

    let user = event.user.as_deref()?;

    let (scope, text) = if event.is_join() {
        if user != bot_user_id {
            return None;
        }
        (Scope::ChannelJoin, event.text.as_str())
    } else if event.subtype.is_some() || user == bot_user_id {
        return None;
    } else if event.is_direct_message() {
        let text = strip_leading_mention(&event.text, bot_user_id).unwrap_or(&event.text);
        (Scope::DirectMessage, text)
    } else if let Some(text) = strip_leading_mention(&event.text, bot_user_id) {
        (Scope::DirectMention, text)
    } else if mentions(&event.text, bot_user_id) {
        (Scope::Mention, event.text.as_str())
    } else {
        (Scope::Ambient, event.text.as_str())
    };

    let mut message = IncomingMessage::new(scope, text)
        .in_channel(&event.channel)
        .by_user(user)
        .at(&event.ts);
    if let Some(thread_ts) = &event.thread_ts {
        message = message.in_thread(thread_ts);
    }
    Some(message)
}
