//! Tracing subscriber setup.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Crates whose logs follow `--log-level`; everything else stays at `warn`.
const FAQBOT_CRATES: &[&str] = &[
    "faqbot_cli",
    "faqbot_responder",
    "faqbot_slack",
    "faqbot_storage",
];

/// Build the filter directive. A non-empty `RUST_LOG` wins over `level`.
pub fn filter_directive(level: LogLevel, rust_log: Option<&str>) -> String {
    if let Some(directive) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        return directive.to_string();
    }

    let mut directive = String::from("warn");
    for krate in FAQBOT_CRATES {
        directive.push(',');
        directive.push_str(krate);
        directive.push('=');
        directive.push_str(level.as_filter_str());
    }
    directive
}

/// Install the global subscriber.
pub fn init_logging(level: LogLevel, json: bool) -> Result<()> {
    let directive = filter_directive(level, std::env::var("RUST_LOG").ok().as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", directive, e))?;

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
