//! Slack adapter for faqbot.
//!
//! This crate connects the rule-based [`Responder`](faqbot_responder::Responder)
//! to Slack:
//! - Startup configuration for custom integrations and OAuth apps
//! - A small Web API client (`auth.test`, `rtm.connect`, `chat.postMessage`, ...)
//! - An RTM bot that classifies messages, answers them and reconnects
//! - OAuth routes for installing the app into a workspace
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use faqbot_responder::Responder;
//! use faqbot_slack::{BootstrapMode, SlackBot, StartupConfig};
//!
//! let config = StartupConfig::from_env()?;
//! if let BootstrapMode::CustomIntegration { token } = config.mode {
//!     let bot = SlackBot::new(token, Arc::new(Responder::builtin()?))?;
//!     bot.start().await?;
//! }
//! ```
//!
//! # Configuration
//!
//! Custom integration:
//! - `TOKEN` or `SLACK_TOKEN` - Bot token (xoxb-...)
//!
//! App:
//! - `CLIENT_ID`, `CLIENT_SECRET` - OAuth credentials
//! - `PORT` - Port for the install server
//! - `REDIRECT_URI` - Optional OAuth redirect
//!
//! Optional for both:
//! - `MONGOLAB_URI` - Hosted document store instead of JSON files

pub mod api;
pub mod app;
pub mod bot;
pub mod config;
pub mod error;
pub mod events;
pub mod messages;
pub mod oauth;

// Re-export main types
pub use api::SlackApi;
pub use app::{BotRegistry, run_app, run_custom_integration};
pub use bot::{BotOptions, SlackBot};
pub use config::{AppCredentials, BootstrapMode, StartupConfig};
pub use error::{SlackApiError, SlackError, SlackResult};
pub use events::{MessageEvent, RtmEvent, classify};
pub use messages::SlackMessageContent;
