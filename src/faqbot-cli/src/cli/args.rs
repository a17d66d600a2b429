//! CLI argument structures and parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use faqbot_responder::Scope;

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors
    Warn,
    /// Show informational messages, warnings, and errors (default)
    #[default]
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// faqbot - answers frequently asked questions in Slack
///
/// If no subcommand is specified, runs the bot.
#[derive(Debug, Parser)]
#[command(name = "faqbot")]
#[command(version, about = "faqbot - rule-based Slack FAQ bot", long_about = None)]
pub struct Cli {
    /// Log verbosity (RUST_LOG overrides this)
    #[arg(
        long,
        value_enum,
        default_value_t = LogLevel::Info,
        global = true,
        env = "FAQBOT_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "FAQBOT_JSON_LOGS")]
    pub json_logs: bool,

    /// TOML rule file to use instead of the built-in table
    #[arg(long, global = true, env = "FAQBOT_RULES", value_name = "PATH")]
    pub rules: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect to Slack and answer messages (default)
    Run,
    /// Compile the rule table and print a summary
    Check,
    /// Run one message through the rules without connecting to Slack
    Ask(AskArgs),
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Delivery context of the message
    #[arg(long, default_value = "direct_message", value_parser = parse_scope)]
    pub scope: Scope,

    /// Message text
    #[arg(required = true, num_args = 1.., value_name = "TEXT")]
    pub text: Vec<String>,
}

impl AskArgs {
    /// Words of the message joined back together.
    pub fn message(&self) -> String {
        self.text.join(" ")
    }
}

fn parse_scope(s: &str) -> Result<Scope, String> {
    s.parse().map_err(|e: faqbot_responder::ResponderError| e.to_string())
}
