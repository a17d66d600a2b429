//! Error types for rule registration.
//!
//! Every error here is a configuration error: it is raised while the rule
//! table is being built, never while a message is being matched.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a rule table.
#[derive(Error, Debug)]
pub enum ResponderError {
    /// A trigger pattern is not a valid regular expression.
    #[error("Invalid trigger pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: Box<regex::Error>,
    },

    /// A trigger is the empty string.
    #[error("Trigger must not be empty")]
    EmptyTrigger,

    /// A rule was registered without triggers.
    #[error("Rule has no triggers")]
    NoTriggers,

    /// A rule was registered without scopes.
    #[error("Rule has no scopes")]
    NoScopes,

    /// A scope tag is not one of the known delivery contexts.
    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    /// A specific rule in a table failed to compile.
    #[error("Rule {rule}: {source}")]
    Rule {
        /// Position and name of the rule, for diagnostics.
        rule: String,
        /// What went wrong with it.
        #[source]
        source: Box<ResponderError>,
    },

    /// The fallback section failed to compile.
    #[error("Fallback: {0}")]
    Fallback(#[source] Box<ResponderError>),

    /// A rule file could not be read.
    #[error("Failed to read rule file {}: {source}", path.display())]
    Io {
        /// Path of the rule file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A rule file is not valid TOML or does not have the expected shape.
    #[error("Failed to parse rules: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for rule registration.
pub type ResponderResult<T> = std::result::Result<T, ResponderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResponderError::UnknownScope("channel_leave".to_string());
        assert_eq!(err.to_string(), "Unknown scope: channel_leave");

        let err = ResponderError::Rule {
            rule: "#2 (greeting)".to_string(),
            source: Box::new(ResponderError::NoScopes),
        };
        assert_eq!(err.to_string(), "Rule #2 (greeting): Rule has no scopes");
    }

    #[test]
    fn test_invalid_pattern_keeps_source() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let err = ResponderError::InvalidPattern {
            pattern: "(unclosed".to_string(),
            source: Box::new(source),
        };
        assert!(err.to_string().starts_with("Invalid trigger pattern '(unclosed'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
