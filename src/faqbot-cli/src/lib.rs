//! faqbot command-line interface.
//!
//! - `cli` - argument parsing and command handlers
//! - `logging` - tracing subscriber setup

pub mod cli;
pub mod logging;
