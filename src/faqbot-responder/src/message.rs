//! Inbound messages and the replies rendered for them.

use serde::{Deserialize, Serialize};

use crate::rule::DeliveryMode;
use crate::scope::Scope;

/// A message handed to the responder by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Message text, with any leading bot mention already stripped.
    pub text: String,
    /// Delivery context.
    pub scope: Scope,
    /// Channel the message was posted in.
    pub channel: String,
    /// Sender.
    pub user: String,
    /// Message timestamp.
    pub ts: String,
    /// Parent thread timestamp, when the message is itself in a thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl IncomingMessage {
    /// Create a message with the given scope and text.
    pub fn new(scope: Scope, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scope,
            channel: String::new(),
            user: String::new(),
            ts: String::new(),
            thread_ts: None,
        }
    }

    /// Set the channel.
    pub fn in_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Set the sender.
    pub fn by_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the message timestamp.
    pub fn at(mut self, ts: impl Into<String>) -> Self {
        self.ts = ts.into();
        self
    }

    /// Mark the message as part of a thread.
    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

/// The message a reply answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl From<&IncomingMessage> for MessageRef {
    fn from(message: &IncomingMessage) -> Self {
        Self {
            channel: message.channel.clone(),
            ts: message.ts.clone(),
            thread_ts: message.thread_ts.clone(),
        }
    }
}

/// A reply directive produced by the responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Message being answered.
    pub target: MessageRef,
    /// Body text.
    pub text: String,
    /// Plain or threaded delivery.
    pub mode: DeliveryMode,
}

impl Reply {
    /// Thread the reply should be posted in, if any.
    ///
    /// Threaded replies open a thread on the target message unless it is
    /// already in one. Plain replies stay in the target's thread when there
    /// is one and go to the channel otherwise.
    pub fn thread_ts(&self) -> Option<&str> {
        match self.mode {
            DeliveryMode::Threaded => Some(
                self.target
                    .thread_ts
                    .as_deref()
                    .unwrap_or(self.target.ts.as_str()),
            ),
            DeliveryMode::Plain => self.target.thread_ts.as_deref(),
        }
    }

    /// Channel the reply goes to.
    pub fn channel(&self) -> &str {
        &self.target.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_reply(mode: DeliveryMode, thread_ts: Option<&str>) -> Reply {
        Reply {
            target: MessageRef {
                channel: "C123".to_string(),
                ts: "1700000000.000100".to_string(),
                thread_ts: thread_ts.map(str::to_string),
            },
            text: "answer".to_string(),
            mode,
        }
    }

    #[test]
    fn test_threaded_reply_starts_thread_on_message() {
        let reply = make_reply(DeliveryMode::Threaded, None);
        assert_eq!(reply.thread_ts(), Some("1700000000.000100"));
    }

    #[test]
    fn test_threaded_reply_keeps_existing_thread() {
        let reply = make_reply(DeliveryMode::Threaded, Some("1699999999.000001"));
        assert_eq!(reply.thread_ts(), Some("1699999999.000001"));
    }

    #[test]
    fn test_plain_reply_goes_to_channel() {
        let reply = make_reply(DeliveryMode::Plain, None);
        assert_eq!(reply.thread_ts(), None);
        assert_eq!(reply.channel(), "C123");

        let in_thread = make_reply(DeliveryMode::Plain, Some("1699999999.000001"));
        assert_eq!(in_thread.thread_ts(), Some("1699999999.000001"));
    }

    #[test]
    fn test_message_ref_from_incoming() {
        let message = IncomingMessage::new(Scope::Mention, "hi")
            .in_channel("C1")
            .by_user("U1")
            .at("1.0")
            .in_thread("0.5");
        let target = MessageRef::from(&message);
        assert_eq!(target.channel, "C1");
        assert_eq!(target.ts, "1.0");
        assert_eq!(target.thread_ts.as_deref(), Some("0.5"));
    }
}
