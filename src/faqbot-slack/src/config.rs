//! Startup configuration.
//!
//! The bot runs in one of two bootstrap modes, chosen once from the
//! environment before anything else is constructed:
//!
//! - **Custom integration**: `TOKEN` (or `SLACK_TOKEN`) holds a bot token
//!   for a single workspace.
//! - **App**: `CLIENT_ID`, `CLIENT_SECRET` and `PORT` configure an OAuth app
//!   that can be installed into any number of workspaces. `REDIRECT_URI` is
//!   optional.
//!
//! `MONGOLAB_URI` selects the hosted document store; otherwise a JSON file
//! store is used (see [`StorageBackend`]).

use faqbot_storage::StorageBackend;
use faqbot_storage::backend::HOSTED_URI_ENV;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::{SlackError, SlackResult};

pub const ENV_TOKEN: &str = "TOKEN";
pub const ENV_SLACK_TOKEN: &str = "SLACK_TOKEN";
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const ENV_PORT: &str = "PORT";
pub const ENV_REDIRECT_URI: &str = "REDIRECT_URI";

/// Shown when neither bootstrap mode is configured.
pub const USAGE: &str = "If this is a custom integration, please specify TOKEN in the environment. \
If this is an app, please specify CLIENT_ID, CLIENT_SECRET, and PORT in the environment";

/// OAuth credentials for app mode.
#[derive(Clone)]
pub struct AppCredentials {
    client_id: String,
    client_secret: SecretString,
    port: u16,
    redirect_uri: Option<String>,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("port", &self.port)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl AppCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        port: u16,
        redirect_uri: Option<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into().into()),
            port,
            redirect_uri,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }

    /// Port the install web server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }
}

/// How the bot connects to Slack.
#[derive(Clone)]
pub enum BootstrapMode {
    /// Legacy custom integration with a static bot token.
    CustomIntegration { token: SecretString },
    /// Installable OAuth app.
    App(AppCredentials),
}

impl std::fmt::Debug for BootstrapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapMode::CustomIntegration { .. } => f
                .debug_struct("CustomIntegration")
                .field("token", &"[REDACTED]")
                .finish(),
            BootstrapMode::App(credentials) => f.debug_tuple("App").field(credentials).finish(),
        }
    }
}

impl BootstrapMode {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            BootstrapMode::CustomIntegration { .. } => "custom integration",
            BootstrapMode::App(_) => "app",
        }
    }
}

/// Everything resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub mode: BootstrapMode,
    pub storage: StorageBackend,
}

impl StartupConfig {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> SlackResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through `lookup`.
    ///
    /// Empty values count as unset. A custom-integration token takes
    /// precedence over app credentials.
    pub fn from_lookup<F>(lookup: F) -> SlackResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = if let Some(token) = get(ENV_TOKEN).or_else(|| get(ENV_SLACK_TOKEN)) {
            if !token.starts_with("xoxb-") && !token.starts_with("xoxp-") {
                warn!("Token doesn't start with 'xoxb-' or 'xoxp-', this may be incorrect");
            }
            BootstrapMode::CustomIntegration {
                token: SecretString::new(token.into()),
            }
        } else if let (Some(client_id), Some(client_secret), Some(port)) =
            (get(ENV_CLIENT_ID), get(ENV_CLIENT_SECRET), get(ENV_PORT))
        {
            let port: u16 = port.trim().parse().map_err(|_| {
                SlackError::Config(format!("{} must be a port number, got '{}'", ENV_PORT, port))
            })?;
            BootstrapMode::App(AppCredentials::new(
                client_id,
                client_secret,
                port,
                get(ENV_REDIRECT_URI),
            ))
        } else {
            return Err(SlackError::Config(USAGE.to_string()));
        };

        let custom_integration = matches!(mode, BootstrapMode::CustomIntegration { .. });
        let storage = StorageBackend::resolve(get(HOSTED_URI_ENV), custom_integration);

        debug!(mode = mode.name(), storage = ?storage, "Resolved startup configuration");
        Ok(Self { mode, storage })
    }

    /// Check whether the bot runs as a custom integration.
    pub fn is_custom_integration(&self) -> bool {
        matches!(self.mode, BootstrapMode::CustomIntegration { .. })
    }
}
