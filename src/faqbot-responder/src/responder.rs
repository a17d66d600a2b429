//! The responder: first-match-wins evaluation of the rule table.
//!
//! The responder is built once at startup and never mutated afterwards. It
//! holds no interior state, so a single instance can be shared through an
//! `Arc` by every connection the bot runs.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::debug;

use crate::error::{ResponderError, ResponderResult};
use crate::message::{IncomingMessage, Reply};
use crate::rule::{Response, Rule};
use crate::scope::Scope;
use crate::trigger::Trigger;

/// Pattern for "this looks like a question": ends with `?`, optionally
/// followed by spaces or more question marks.
pub const DEFAULT_FALLBACK_PATTERN: &str = r".*[?][ ?]*$";

/// Answer given to unanswered direct-message questions.
pub const DEFAULT_FALLBACK_TEXT: &str = "Sorry I do not know the answer to that!!\n\
I am very curious to know the answer as well so I can help the next time.\n\
<!here> can someone answer this.";

/// Reply used when no rule matches.
#[derive(Debug, Clone)]
pub struct Fallback {
    pattern: Regex,
    scopes: BTreeSet<Scope>,
    response: Response,
}

impl Fallback {
    /// Create a fallback that answers messages in `scopes` matching `pattern`.
    pub fn new(
        pattern: &str,
        scopes: impl IntoIterator<Item = Scope>,
        response: Response,
    ) -> ResponderResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| ResponderError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(e),
        })?;
        let scopes: BTreeSet<Scope> = scopes.into_iter().collect();
        if scopes.is_empty() {
            return Err(ResponderError::NoScopes);
        }
        Ok(Self {
            pattern,
            scopes,
            response,
        })
    }

    /// The "I don't know" fallback for direct-message questions.
    pub fn standard() -> ResponderResult<Self> {
        Self::new(
            DEFAULT_FALLBACK_PATTERN,
            [Scope::DirectMessage],
            Response::threaded(DEFAULT_FALLBACK_TEXT),
        )
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn scopes(&self) -> &BTreeSet<Scope> {
        &self.scopes
    }

    /// Check whether the fallback answers `message`.
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        self.scopes.contains(&message.scope) && self.pattern.is_match(&message.text)
    }
}

/// Ordered rule table plus an optional fallback.
#[derive(Debug, Clone, Default)]
pub struct Responder {
    rules: Vec<Rule>,
    fallback: Option<Fallback>,
}

impl Responder {
    /// Start building a responder.
    pub fn builder() -> ResponderBuilder {
        ResponderBuilder::default()
    }

    /// Compile the built-in FAQ table.
    pub fn builtin() -> ResponderResult<Self> {
        crate::config::RuleSet::builtin()?.compile()
    }

    /// Registered rules, in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    /// First rule that matches `message`, if any.
    pub fn find_rule(&self, message: &IncomingMessage) -> Option<&Rule> {
        if message.text.is_empty() {
            return None;
        }
        self.rules.iter().find(|rule| rule.matches(message))
    }

    /// Produce the reply for `message`, or `None` when nothing should be said.
    ///
    /// Rules are tried in registration order and the first match wins. When
    /// no rule matches, the fallback (if any) gets a chance. The call has no
    /// side effects; sending the reply is up to the caller.
    pub fn match_message(&self, message: &IncomingMessage) -> Option<Reply> {
        if message.text.is_empty() {
            return None;
        }

        if let Some(rule) = self.find_rule(message) {
            debug!(
                rule = rule.name().unwrap_or("<unnamed>"),
                scope = %message.scope,
                "Rule matched"
            );
            return Some(rule.response().render(message));
        }

        let fallback = self.fallback.as_ref()?;
        if fallback.matches(message) {
            debug!(scope = %message.scope, "Fallback matched");
            return Some(fallback.response().render(message));
        }

        None
    }
}

/// Builder for [`Responder`]. Rules keep the order they are added in.
#[derive(Debug, Default)]
pub struct ResponderBuilder {
    rules: Vec<Rule>,
    fallback: Option<Fallback>,
}

impl ResponderBuilder {
    /// Append a prebuilt rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append a rule listening for `triggers` in `scopes`.
    pub fn hears(
        self,
        triggers: Vec<Trigger>,
        scopes: impl IntoIterator<Item = Scope>,
        response: Response,
    ) -> ResponderResult<Self> {
        let rule = Rule::new(triggers, scopes, response)?;
        Ok(self.rule(rule))
    }

    /// Set (or clear) the fallback.
    pub fn fallback(mut self, fallback: Option<Fallback>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn build(self) -> Responder {
        Responder {
            rules: self.rules,
            fallback: self.fallback,
        }
    }
}
