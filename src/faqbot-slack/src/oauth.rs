//! OAuth flow for Slack workspace installation.
//!
//! Provides HTTP routes for:
//! - `/` - Install page with an "Add to Slack" button
//! - `/login` - Initiate OAuth flow
//! - `/oauth` - Handle OAuth callback
//!
//! RTM needs a classic bot token, so the flow requests the `bot` scope from
//! the classic authorize endpoint and exchanges the code with `oauth.access`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::api::{OAuthAccess, SLACK_API_BASE, oauth_access};
use crate::config::AppCredentials;
use crate::error::SlackResult;

/// Scope requested on installation.
pub const BOT_SCOPE: &str = "bot";

/// Classic OAuth authorize endpoint.
pub const AUTHORIZE_URL: &str = "https://slack.com/oauth/authorize";

/// Callback invoked after a successful installation.
pub type InstallCallback =
    Arc<dyn Fn(OAuthAccess) -> Pin<Box<dyn Future<Output = SlackResult<()>> + Send>> + Send + Sync>;

/// OAuth state for the router.
#[derive(Clone)]
pub struct OAuthState {
    /// Client ID for OAuth.
    pub client_id: String,
    /// Client secret for OAuth.
    client_secret: SecretString,
    /// Redirect URI registered with Slack (optional).
    pub redirect_uri: Option<String>,
    /// Base URL for `oauth.access`.
    pub api_base_url: String,
    /// HTTP client for the code exchange.
    client: reqwest::Client,
    /// Optional callback for storing the installation.
    pub install_callback: Option<InstallCallback>,
}

impl std::fmt::Debug for OAuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthState")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("api_base_url", &self.api_base_url)
            .field("install_callback", &self.install_callback.is_some())
            .finish()
    }
}

impl OAuthState {
    /// Create new OAuth state from app credentials.
    pub fn new(credentials: &AppCredentials) -> Self {
        Self {
            client_id: credentials.client_id().to_string(),
            client_secret: SecretString::new(credentials.client_secret().into()),
            redirect_uri: credentials.redirect_uri().map(str::to_string),
            api_base_url: SLACK_API_BASE.to_string(),
            client: reqwest::Client::new(),
            install_callback: None,
        }
    }

    /// Exchange codes against another Web API base URL.
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Set a callback for storing the installation after successful OAuth.
    pub fn with_install_callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(OAuthAccess) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SlackResult<()>> + Send + 'static,
    {
        self.install_callback = Some(Arc::new(move |access| {
            Box::pin(callback(access)) as Pin<Box<dyn Future<Output = SlackResult<()>> + Send>>
        }));
        self
    }

    /// Slack authorize URL for this app.
    pub fn authorize_url(&self) -> String {
        let mut url = format!(
            "{}?client_id={}&scope={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(BOT_SCOPE),
        );
        if let Some(redirect_uri) = &self.redirect_uri {
            url.push_str("&redirect_uri=");
            url.push_str(&urlencoding::encode(redirect_uri));
        }
        url
    }

    /// Exchange an authorization code for bot credentials.
    async fn exchange_code(&self, code: &str) -> SlackResult<OAuthAccess> {
        oauth_access(
            &self.client,
            &self.api_base_url,
            &self.client_id,
            self.client_secret.expose_secret(),
            code,
            self.redirect_uri.as_deref(),
        )
        .await
    }
}

/// Query parameters for OAuth callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    /// Authorization code from Slack.
    pub code: Option<String>,
    /// Error from Slack (if authorization failed).
    pub error: Option<String>,
    /// State parameter.
    pub state: Option<String>,
}

/// Create OAuth routes for Slack.
pub fn oauth_routes(state: OAuthState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/oauth", get(callback))
        .with_state(state)
}

/// Install page.
async fn index(State(state): State<OAuthState>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>faqbot</title></head>
<body>
<h1>faqbot</h1>
<p>Answers the questions your team keeps asking.</p>
{}
</body>
</html>"#,
        add_to_slack_button(&state.authorize_url())
    ))
}

/// Initiate OAuth flow - redirects to Slack's authorization page.
async fn login(State(state): State<OAuthState>) -> Response {
    let url = state.authorize_url();
    debug!("Initiating OAuth flow, redirecting to: {}", url);
    Redirect::temporary(&url).into_response()
}

/// Handle OAuth callback from Slack.
async fn callback(
    State(state): State<OAuthState>,
    Query(params): Query<OAuthCallbackParams>,
) -> Response {
    // Check for errors
    if let Some(error) = params.error {
        error!("OAuth error from Slack: {}", error);
        return failure_page(&format!("Error: {}", error));
    }

    // Get authorization code
    let Some(code) = params.code else {
        error!("OAuth callback missing code parameter");
        return failure_page("Missing authorization code.");
    };

    let access = match state.exchange_code(&code).await {
        Ok(access) => access,
        Err(e) => {
            error!("Token exchange failed: {}", e);
            return failure_page(&format!("Error exchanging authorization code: {}", e));
        }
    };

    let team_name = access
        .team_name
        .clone()
        .unwrap_or_else(|| "your workspace".to_string());
    info!("OAuth successful for team: {} ({})", team_name, access.team_id);

    // Call install callback if set
    if let Some(callback) = &state.install_callback
        && let Err(e) = callback(access).await
    {
        error!("Install callback failed: {}", e);
        return page(
            "faqbot - Installation Warning",
            &format!(
                "<h1>Installation Partially Complete</h1>\n\
                 <p>faqbot was installed to {}, but there was an error saving the installation: {}</p>\n\
                 <p>You may need to reinstall the bot.</p>",
                escape_html(&team_name),
                escape_html(&e.to_string())
            ),
        );
    }

    page(
        "faqbot - Installation Successful",
        &format!(
            "<h1>faqbot Installed Successfully!</h1>\n\
             <p>faqbot has been installed to <strong>{}</strong>.</p>\n\
             <p>Check your direct messages, then <code>/invite</code> the bot to a channel.</p>",
            escape_html(&team_name)
        ),
    )
}

fn failure_page(detail: &str) -> Response {
    page(
        "faqbot - Installation Failed",
        &format!(
            "<h1>Installation Failed</h1>\n<p>{}</p>",
            escape_html(detail)
        ),
    )
}

fn page(title: &str, body: &str) -> Response {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{}</title></head>
<body>
{}
<p><a href="javascript:window.close()">Close this window</a></p>
</body>
</html>"#,
        title, body
    ))
    .into_response()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Generate the "Add to Slack" button HTML.
pub fn add_to_slack_button(authorize_url: &str) -> String {
    format!(
        r#"<a href="{}">
<img alt="Add to Slack" height="40" width="139" src="https://platform.slack-edge.com/img/add_to_slack.png"
srcSet="https://platform.slack-edge.com/img/add_to_slack.png 1x, https://platform.slack-edge.com/img/add_to_slack@2x.png 2x" />
</a>"#,
        escape_html(authorize_url)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::SlackError;

    fn state() -> OAuthState {
        OAuthState::new(&AppCredentials::new(
            "123.456",
            "shh",
            3000,
            Some("https://bot.example.com/oauth".to_string()),
        ))
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn mock_oauth_access(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/oauth.access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_authorize_url() {
        let url = state().authorize_url();
        assert_eq!(
            url,
            "https://slack.com/oauth/authorize?client_id=123.456&scope=bot\
             &redirect_uri=https%3A%2F%2Fbot.example.com%2Foauth"
        );

        let state = OAuthState::new(&AppCredentials::new("id", "secret", 3000, None));
        assert_eq!(
            state.authorize_url(),
            "https://slack.com/oauth/authorize?client_id=id&scope=bot"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        assert!(!format!("{:?}", state()).contains("shh"));
    }

    #[tokio::test]
    async fn test_login_redirects() {
        let response = oauth_routes(state())
            .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://slack.com/oauth/authorize?client_id=123.456"));
    }

    #[tokio::test]
    async fn test_index_has_button() {
        let (status, body) = get_body(oauth_routes(state()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Add to Slack"));
        assert!(body.contains("scope=bot"));
    }

    #[tokio::test]
    async fn test_callback_error_param() {
        let (_, body) = get_body(oauth_routes(state()), "/oauth?error=access_denied").await;
        assert!(body.contains("Installation Failed"));
        assert!(body.contains("access_denied"));
    }

    #[tokio::test]
    async fn test_callback_missing_code() {
        let (_, body) = get_body(oauth_routes(state()), "/oauth").await;
        assert!(body.contains("Missing authorization code."));
    }

    #[tokio::test]
    async fn test_callback_success_invokes_callback() {
        let server = MockServer::start().await;
        mock_oauth_access(
            &server,
            serde_json::json!({
                "ok": true,
                "user_id": "U1",
                "team_id": "T1",
                "team_name": "Acme",
                "bot": {"bot_user_id": "UBOT", "bot_access_token": "xoxb-new"}
            }),
        )
        .await;

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let state = state()
            .with_api_base_url(server.uri())
            .with_install_callback(move |access: OAuthAccess| {
                let seen = seen_clone.clone();
                async move {
                    seen.lock().unwrap().push(access.team_id);
                    Ok(())
                }
            });

        let (status, body) = get_body(oauth_routes(state), "/oauth?code=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Installed Successfully"));
        assert!(body.contains("Acme"));
        assert_eq!(*seen.lock().unwrap(), vec!["T1".to_string()]);
    }

    #[tokio::test]
    async fn test_callback_exchange_failure() {
        let server = MockServer::start().await;
        mock_oauth_access(
            &server,
            serde_json::json!({"ok": false, "error": "invalid_code"}),
        )
        .await;

        let state = state().with_api_base_url(server.uri());
        let (_, body) = get_body(oauth_routes(state), "/oauth?code=bad").await;
        assert!(body.contains("Installation Failed"));
        assert!(body.contains("invalid_code"));
    }

    #[tokio::test]
    async fn test_callback_install_failure() {
        let server = MockServer::start().await;
        mock_oauth_access(
            &server,
            serde_json::json!({
                "ok": true,
                "team_id": "T1",
                "bot": {"bot_user_id": "UBOT", "bot_access_token": "xoxb-new"}
            }),
        )
        .await;

        let state = state()
            .with_api_base_url(server.uri())
            .with_install_callback(|_access: OAuthAccess| async {
                Err(SlackError::Storage("disk full".to_string()))
            });

        let (_, body) = get_body(oauth_routes(state), "/oauth?code=abc").await;
        assert!(body.contains("Partially Complete"));
        assert!(body.contains("disk full"));
        assert!(body.contains("your workspace"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }
}
