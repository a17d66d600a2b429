//! Outgoing message content.

use faqbot_responder::Reply;
use serde::{Deserialize, Serialize};

/// First line sent to the user who installed the bot.
pub const INSTALL_GREETING: &str = "I am a bot that has just joined your team";

/// Second line sent to the installer.
pub const INSTALL_INVITE_HINT: &str =
    "You must now /invite me to a channel so that I can be of use!";

/// Slack message content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessageContent {
    /// Message text.
    pub text: String,
    /// Thread timestamp (for replies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl SlackMessageContent {
    /// Create a new message content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set thread timestamp (for replies).
    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    /// Build the `chat.postMessage` body for `channel`.
    pub fn to_payload(&self, channel: &str) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "channel": channel,
            "text": self.text,
        });

        if let Some(thread_ts) = &self.thread_ts {
            payload["thread_ts"] = serde_json::json!(thread_ts);
        }

        payload
    }
}

impl From<&Reply> for SlackMessageContent {
    fn from(reply: &Reply) -> Self {
        let content = SlackMessageContent::new().with_text(&reply.text);
        match reply.thread_ts() {
            Some(thread_ts) => content.in_thread(thread_ts),
            None => content,
        }
    }
}

/// Messages sent to the installer right after an OAuth installation.
pub fn installation_greeting() -> Vec<SlackMessageContent> {
    vec![
        SlackMessageContent::new().with_text(INSTALL_GREETING),
        SlackMessageContent::new().with_text(INSTALL_INVITE_HINT),
    ]
}

#[cfg(test)]
mod tests {
    use faqbot_responder::{DeliveryMode, MessageRef};
    use pretty_assertions::assert_eq;

    use super::*;

    fn reply(mode: DeliveryMode, thread_ts: Option<&str>) -> Reply {
        Reply {
            target: MessageRef {
                channel: "C1".to_string(),
                ts: "1700000000.000100".to_string(),
                thread_ts: thread_ts.map(str::to_string),
            },
            text: "Hello!".to_string(),
            mode,
        }
    }

    #[test]
    fn test_plain_reply_goes_to_channel() {
        let content = SlackMessageContent::from(&reply(DeliveryMode::Plain, None));
        assert_eq!(content.thread_ts, None);
        assert_eq!(
            content.to_payload("C1"),
            serde_json::json!({"channel": "C1", "text": "Hello!"})
        );
    }

    #[test]
    fn test_plain_reply_stays_in_thread() {
        let content = SlackMessageContent::from(&reply(DeliveryMode::Plain, Some("1699.1")));
        assert_eq!(content.thread_ts.as_deref(), Some("1699.1"));
    }

    #[test]
    fn test_threaded_reply_payload() {
        let content = SlackMessageContent::from(&reply(DeliveryMode::Threaded, None));
        assert_eq!(
            content.to_payload("C1"),
            serde_json::json!({
                "channel": "C1",
                "text": "Hello!",
                "thread_ts": "1700000000.000100"
            })
        );
    }

    #[test]
    fn test_installation_greeting() {
        let lines: Vec<String> = installation_greeting().into_iter().map(|m| m.text).collect();
        assert_eq!(
            lines,
            vec![
                "I am a bot that has just joined your team".to_string(),
                "You must now /invite me to a channel so that I can be of use!".to_string(),
            ]
        );
    }
}
