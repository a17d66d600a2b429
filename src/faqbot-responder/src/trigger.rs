//! Triggers: the text a rule listens for.

use regex::Regex;

use crate::error::{ResponderError, ResponderResult};

/// A trigger, compiled once at registration time.
///
/// Matching is a case-sensitive search: a trigger fires when it is found
/// anywhere in the message text. Patterns only match the whole text when
/// they are anchored with `^`/`$`.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Plain substring.
    Literal(String),
    /// Regular expression.
    Pattern(Regex),
}

impl Trigger {
    /// Create a literal substring trigger.
    pub fn literal(text: impl Into<String>) -> ResponderResult<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(ResponderError::EmptyTrigger);
        }
        Ok(Trigger::Literal(text))
    }

    /// Compile a regular-expression trigger.
    pub fn pattern(pattern: &str) -> ResponderResult<Self> {
        if pattern.is_empty() {
            return Err(ResponderError::EmptyTrigger);
        }
        let regex = Regex::new(pattern).map_err(|e| ResponderError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(e),
        })?;
        Ok(Trigger::Pattern(regex))
    }

    /// Check whether the trigger is found in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Trigger::Literal(literal) => text.contains(literal.as_str()),
            Trigger::Pattern(regex) => regex.is_match(text),
        }
    }

    /// Source text of the trigger.
    pub fn as_str(&self) -> &str {
        match self {
            Trigger::Literal(literal) => literal,
            Trigger::Pattern(regex) => regex.as_str(),
        }
    }

    /// Whether this is a literal or a pattern trigger.
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Literal(_) => "literal",
            Trigger::Pattern(_) => "pattern",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_substring_search() {
        let trigger = Trigger::literal("How are you?").unwrap();
        assert!(trigger.is_match("Hey, How are you? Long time"));
        assert!(!trigger.is_match("how are you?"));
        assert!(!trigger.is_match("How are yo"));
    }

    #[test]
    fn test_pattern_is_unanchored_search() {
        let trigger = Trigger::pattern("hello").unwrap();
        assert!(trigger.is_match("well hello there"));
        assert!(!trigger.is_match("Hello"));

        let anchored = Trigger::pattern("^hello$").unwrap();
        assert!(anchored.is_match("hello"));
        assert!(!anchored.is_match("well hello there"));
    }

    #[test]
    fn test_pattern_inline_flags() {
        let trigger = Trigger::pattern(r"(?i)\bhi\b").unwrap();
        assert!(trigger.is_match("Hi bot"));
        assert!(!trigger.is_match("this is architecture"));
    }

    #[test]
    fn test_invalid_pattern_fails_fast() {
        let err = Trigger::pattern("([unclosed").unwrap_err();
        assert!(
            matches!(err, ResponderError::InvalidPattern { pattern, .. } if pattern == "([unclosed")
        );
    }

    #[test]
    fn test_empty_triggers_rejected() {
        assert!(matches!(Trigger::literal(""), Err(ResponderError::EmptyTrigger)));
        assert!(matches!(Trigger::pattern(""), Err(ResponderError::EmptyTrigger)));
    }

    #[test]
    fn test_trigger_source_and_kind() {
        let literal = Trigger::literal("save").unwrap();
        assert_eq!(literal.as_str(), "save");
        assert_eq!(literal.kind(), "literal");

        let pattern = Trigger::pattern(r"\bsave\b").unwrap();
        assert_eq!(pattern.as_str(), r"\bsave\b");
        assert_eq!(pattern.kind(), "pattern");
    }
}
