//! Rule tables as configuration.
//!
//! A rule table is a TOML document:
//!
//! ```toml
//! [[rule]]
//! name = "greeting"
//! triggers = ['(?i)\bhello\b', { literal = "good morning" }]
//! scopes = ["direct_mention", "mention", "direct_message"]
//! response = "Hello!"
//!
//! [fallback]
//! scopes = ["direct_message"]
//! mode = "threaded"
//! ```
//!
//! A bare string trigger is a regular expression, `{ literal = "..." }` is
//! a plain substring and `{ pattern = "..." }` spells out a regex. The
//! `[fallback]` table is optional; every field has a default and
//! `enabled = false` turns it off.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ResponderError, ResponderResult};
use crate::responder::{DEFAULT_FALLBACK_PATTERN, DEFAULT_FALLBACK_TEXT, Fallback, Responder};
use crate::rule::{DeliveryMode, Response, Rule};
use crate::scope::Scope;
use crate::trigger::Trigger;

/// The rule table shipped with the bot.
const BUILTIN_RULES: &str = include_str!("../rules/default.toml");

/// Trigger as written in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerSpec {
    /// Bare string, compiled as a regular expression.
    Bare(String),
    /// Literal substring.
    Literal { literal: String },
    /// Regular expression.
    Pattern { pattern: String },
}

impl TriggerSpec {
    /// Compile into a [`Trigger`].
    pub fn compile(&self) -> ResponderResult<Trigger> {
        match self {
            TriggerSpec::Bare(pattern) | TriggerSpec::Pattern { pattern } => {
                Trigger::pattern(pattern)
            }
            TriggerSpec::Literal { literal } => Trigger::literal(literal.clone()),
        }
    }
}

/// A rule as written in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Optional name, shown in logs and `faqbot check`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub triggers: Vec<TriggerSpec>,
    pub scopes: Vec<Scope>,
    pub response: String,
    #[serde(default)]
    pub mode: DeliveryMode,
}

impl RuleSpec {
    /// Compile into a [`Rule`].
    pub fn compile(&self) -> ResponderResult<Rule> {
        let triggers = self
            .triggers
            .iter()
            .map(TriggerSpec::compile)
            .collect::<ResponderResult<Vec<_>>>()?;

        let response = Response {
            text: self.response.clone(),
            mode: self.mode,
        };
        let rule = Rule::new(triggers, self.scopes.iter().copied(), response)?;

        Ok(match &self.name {
            Some(name) => rule.named(name.clone()),
            None => rule,
        })
    }
}

/// Fallback section of a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSpec {
    pub enabled: bool,
    pub pattern: String,
    pub scopes: Vec<Scope>,
    pub response: String,
    pub mode: DeliveryMode,
}

impl Default for FallbackSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            pattern: DEFAULT_FALLBACK_PATTERN.to_string(),
            scopes: vec![Scope::DirectMessage],
            response: DEFAULT_FALLBACK_TEXT.to_string(),
            mode: DeliveryMode::Threaded,
        }
    }
}

impl FallbackSpec {
    /// Compile into a [`Fallback`], or `None` when disabled.
    pub fn compile(&self) -> ResponderResult<Option<Fallback>> {
        if !self.enabled {
            return Ok(None);
        }
        let response = Response {
            text: self.response.clone(),
            mode: self.mode,
        };
        Fallback::new(&self.pattern, self.scopes.iter().copied(), response).map(Some)
    }
}

/// A complete rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub fallback: FallbackSpec,
}

impl RuleSet {
    /// Parse a rule table from TOML.
    pub fn from_toml_str(source: &str) -> ResponderResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a rule table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ResponderResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ResponderError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let set = Self::from_toml_str(&source)?;
        debug!(path = %path.display(), rules = set.rules.len(), "Loaded rule file");
        Ok(set)
    }

    /// The rule table shipped with the bot.
    pub fn builtin() -> ResponderResult<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    /// Compile every rule and the fallback.
    ///
    /// Fails on the first rule that does not compile; the error names the
    /// rule's position and name.
    pub fn compile(&self) -> ResponderResult<Responder> {
        let mut builder = Responder::builder();

        for (index, spec) in self.rules.iter().enumerate() {
            let rule = spec.compile().map_err(|e| ResponderError::Rule {
                rule: rule_label(index, spec.name.as_deref()),
                source: Box::new(e),
            })?;
            builder = builder.rule(rule);
        }

        let fallback = self
            .fallback
            .compile()
            .map_err(|e| ResponderError::Fallback(Box::new(e)))?;

        Ok(builder.fallback(fallback).build())
    }
}

fn rule_label(index: usize, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("#{} ({})", index + 1, name),
        None => format!("#{}", index + 1),
    }
}
