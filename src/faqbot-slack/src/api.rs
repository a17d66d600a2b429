//! Slack Web API client.
//!
//! Only the handful of methods the bot needs: `auth.test`, `rtm.connect`,
//! `chat.postMessage`, `conversations.open` and `oauth.access`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{SlackApiError, SlackError, SlackResult};

/// Default Web API base URL.
pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Identity returned by `auth.test`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthIdentity {
    pub user_id: String,
    #[serde(default)]
    pub user: Option<String>,
    pub team_id: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// The bot user as described by `rtm.connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct RtmSelf {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// The team as described by `rtm.connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct RtmTeam {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Result of `rtm.connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct RtmConnectInfo {
    /// WebSocket URL, valid for a short time.
    pub url: String,
    #[serde(rename = "self")]
    pub bot: RtmSelf,
    pub team: RtmTeam,
}

/// Bot credentials granted by an OAuth installation.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthBot {
    pub bot_user_id: String,
    pub bot_access_token: String,
}

/// Result of `oauth.access`.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthAccess {
    /// Installing user.
    #[serde(default)]
    pub user_id: Option<String>,
    pub team_id: String,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub bot: OAuthBot,
}

/// HTTP client for the Slack Web API, bound to one token.
#[derive(Clone)]
pub struct SlackApi {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl std::fmt::Debug for SlackApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackApi")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl SlackApi {
    /// Create a client for `token` with the given request timeout.
    pub fn new(token: SecretString, timeout: Duration) -> SlackResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SlackError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: SLACK_API_BASE.to_string(),
            token,
        })
    }

    /// Point the client at another base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check the token and return who it belongs to.
    pub async fn auth_test(&self) -> SlackResult<AuthIdentity> {
        debug!("Testing Slack authentication...");
        let response = self.api_call("auth.test", &serde_json::json!({})).await;
        match response {
            Ok(identity) => Ok(identity),
            // auth.test failures are always credential problems
            Err(SlackError::Api(msg)) => Err(SlackError::Auth(msg)),
            Err(e) => Err(e),
        }
    }

    /// Ask for an RTM WebSocket URL.
    pub async fn rtm_connect(&self) -> SlackResult<RtmConnectInfo> {
        self.api_call("rtm.connect", &serde_json::json!({})).await
    }

    /// Post a message and return its `ts`.
    pub async fn post_message(&self, payload: &serde_json::Value) -> SlackResult<String> {
        #[derive(Deserialize)]
        struct Posted {
            ts: String,
        }

        let posted: Posted = self.api_call("chat.postMessage", payload).await?;
        Ok(posted.ts)
    }

    /// Open (or reuse) a direct message channel with `user_id`.
    pub async fn open_conversation(&self, user_id: &str) -> SlackResult<String> {
        #[derive(Deserialize)]
        struct Channel {
            id: String,
        }
        #[derive(Deserialize)]
        struct Opened {
            channel: Channel,
        }

        let opened: Opened = self
            .api_call(
                "conversations.open",
                &serde_json::json!({ "users": user_id }),
            )
            .await?;
        Ok(opened.channel.id)
    }

    /// Make an API call to Slack.
    ///
    /// `ok: false` responses become [`SlackApiError`]s mapped onto
    /// [`SlackError`].
    pub async fn api_call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> SlackResult<T> {
        let url = format!("{}/{}", self.base_url, method);
        debug!("Calling {}", method);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header("Content-Type", "application/json; charset=utf-8")
            .json(payload)
            .send()
            .await?;

        read_response(method, response).await
    }
}

/// Exchange an OAuth `code` for bot credentials.
///
/// `oauth.access` authenticates with the client credentials rather than a
/// token, so it lives outside [`SlackApi`].
pub async fn oauth_access(
    client: &reqwest::Client,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: Option<&str>,
) -> SlackResult<OAuthAccess> {
    let url = format!("{}/oauth.access", base_url.trim_end_matches('/'));

    let mut form = vec![
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
    ];
    if let Some(redirect_uri) = redirect_uri {
        form.push(("redirect_uri", redirect_uri));
    }

    let response = client.post(&url).form(&form).send().await?;
    read_response("oauth.access", response).await
}

async fn read_response<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> SlackResult<T> {
    // Check for rate limiting
    if response.status() == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        return Err(SlackError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SlackError::Api(format!("{}: {}", status, body)));
    }

    let json: serde_json::Value = response.json().await?;

    if json.get("ok").and_then(|v| v.as_bool()) != Some(true) {
        return Err(SlackApiError::from_response(method, &json).into());
    }

    serde_json::from_value(json)
        .map_err(|e| SlackError::InvalidPayload(format!("{} response: {}", method, e)))
}
