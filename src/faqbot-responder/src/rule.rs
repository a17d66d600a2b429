//! Rules: triggers, scopes and the response they produce.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ResponderError, ResponderResult};
use crate::message::{IncomingMessage, MessageRef, Reply};
use crate::scope::Scope;
use crate::trigger::Trigger;

/// How a reply is posted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Posted to the channel (or the thread the message is already in).
    #[default]
    Plain,
    /// Posted as a thread reply to the message.
    Threaded,
}

/// A canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub mode: DeliveryMode,
}

impl Response {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: DeliveryMode::Plain,
        }
    }

    pub fn threaded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: DeliveryMode::Threaded,
        }
    }

    /// Render this response as a reply to `message`.
    pub fn render(&self, message: &IncomingMessage) -> Reply {
        Reply {
            target: MessageRef::from(message),
            text: self.text.clone(),
            mode: self.mode,
        }
    }
}

/// A single entry of the rule table.
///
/// A rule matches a message when the message's scope is one of the rule's
/// scopes and at least one trigger is found in the text. Rules cannot be
/// changed once built.
#[derive(Debug, Clone)]
pub struct Rule {
    name: Option<String>,
    triggers: Vec<Trigger>,
    scopes: BTreeSet<Scope>,
    response: Response,
}

impl Rule {
    /// Create a rule. Fails when `triggers` or `scopes` is empty.
    pub fn new(
        triggers: Vec<Trigger>,
        scopes: impl IntoIterator<Item = Scope>,
        response: Response,
    ) -> ResponderResult<Self> {
        if triggers.is_empty() {
            return Err(ResponderError::NoTriggers);
        }
        let scopes: BTreeSet<Scope> = scopes.into_iter().collect();
        if scopes.is_empty() {
            return Err(ResponderError::NoScopes);
        }
        Ok(Self {
            name: None,
            triggers,
            scopes,
            response,
        })
    }

    /// Attach a name, used in logs and diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn scopes(&self) -> &BTreeSet<Scope> {
        &self.scopes
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Check whether the rule listens in `scope`.
    pub fn applies_to(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    /// Check whether the rule matches `message`.
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        self.applies_to(message.scope) && self.triggers.iter().any(|t| t.is_match(&message.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greeting() -> Rule {
        Rule::new(
            vec![
                Trigger::pattern("hello").unwrap(),
                Trigger::pattern("hi").unwrap(),
            ],
            [Scope::Mention, Scope::DirectMessage],
            Response::plain("Hello!"),
        )
        .unwrap()
        .named("greeting")
    }

    #[test]
    fn test_rule_matches_scope_and_trigger() {
        let rule = greeting();
        assert!(rule.matches(&IncomingMessage::new(Scope::DirectMessage, "hi")));
        assert!(rule.matches(&IncomingMessage::new(Scope::Mention, "oh hello")));
        assert!(!rule.matches(&IncomingMessage::new(Scope::ChannelJoin, "hi")));
        assert!(!rule.matches(&IncomingMessage::new(Scope::DirectMessage, "bye")));
    }

    #[test]
    fn test_rule_requires_triggers_and_scopes() {
        let err = Rule::new(vec![], [Scope::Mention], Response::plain("x")).unwrap_err();
        assert!(matches!(err, ResponderError::NoTriggers));

        let err = Rule::new(
            vec![Trigger::literal("x").unwrap()],
            Vec::<Scope>::new(),
            Response::plain("x"),
        )
        .unwrap_err();
        assert!(matches!(err, ResponderError::NoScopes));
    }

    #[test]
    fn test_rule_deduplicates_scopes() {
        let rule = Rule::new(
            vec![Trigger::literal("x").unwrap()],
            [Scope::Mention, Scope::Mention, Scope::Ambient],
            Response::plain("x"),
        )
        .unwrap();
        assert_eq!(rule.scopes().len(), 2);
        assert_eq!(rule.name(), None);
    }

    #[test]
    fn test_response_render() {
        let message = IncomingMessage::new(Scope::DirectMessage, "hi")
            .in_channel("D1")
            .at("1.0");
        let reply = Response::threaded("Hello!").render(&message);
        assert_eq!(reply.text, "Hello!");
        assert_eq!(reply.mode, DeliveryMode::Threaded);
        assert_eq!(reply.target.channel, "D1");
        assert_eq!(reply.thread_ts(), Some("1.0"));
    }
}
