//! Runners for the two bootstrap modes.
//!
//! A custom integration runs a single [`SlackBot`]. An app serves the OAuth
//! install routes and keeps one bot per installed team in a [`BotRegistry`].

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use faqbot_responder::Responder;
use faqbot_storage::{BotStorage, TeamRecord, UserRecord};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::OAuthAccess;
use crate::bot::{BotOptions, SlackBot};
use crate::config::AppCredentials;
use crate::error::{SlackError, SlackResult};
use crate::oauth::{OAuthState, oauth_routes};

/// How long a bot gets to close its socket on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running bot and the token it was started with.
struct RunningBot {
    token: SecretString,
    bot: Arc<SlackBot>,
}

type BotMap = Arc<Mutex<HashMap<String, RunningBot>>>;

/// Running bots, one per team.
pub struct BotRegistry {
    responder: Arc<Responder>,
    storage: Arc<dyn BotStorage>,
    options: BotOptions,
    api_base_url: Option<String>,
    bots: BotMap,
}

impl BotRegistry {
    pub fn new(
        responder: Arc<Responder>,
        storage: Arc<dyn BotStorage>,
        options: BotOptions,
    ) -> Self {
        Self {
            responder,
            storage,
            options,
            api_base_url: None,
            bots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Point every bot at another Web API base URL.
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(base_url.into());
        self
    }

    /// Check whether a bot is running for `team_id`.
    pub async fn is_running(&self, team_id: &str) -> bool {
        self.bots.lock().await.contains_key(team_id)
    }

    /// Teams with a running bot, sorted.
    pub async fn running_teams(&self) -> Vec<String> {
        let mut teams: Vec<String> = self.bots.lock().await.keys().cloned().collect();
        teams.sort();
        teams
    }

    /// Return the bot for `team_id`, spawning one with `token` if none is
    /// running.
    ///
    /// A bot running with a different token (the team reinstalled) is shut
    /// down and replaced.
    pub async fn ensure_bot(
        &self,
        team_id: &str,
        token: SecretString,
    ) -> SlackResult<Arc<SlackBot>> {
        let mut bots = self.bots.lock().await;
        if let Some(running) = bots.get(team_id) {
            if running.token.expose_secret() == token.expose_secret() {
                debug!("Bot for team {} already running", team_id);
                return Ok(running.bot.clone());
            }
            info!("Team {} has a new bot token, replacing its bot", team_id);
            running.bot.shutdown();
        }

        let mut bot =
            SlackBot::with_options(token.clone(), self.responder.clone(), self.options.clone())?
                .with_storage(self.storage.clone());
        if let Some(base_url) = &self.api_base_url {
            bot = bot.with_api_base_url(base_url.clone());
        }
        let bot = Arc::new(bot);
        bots.insert(
            team_id.to_string(),
            RunningBot {
                token,
                bot: bot.clone(),
            },
        );

        let task_bot = bot.clone();
        let registry = self.bots.clone();
        let team = team_id.to_string();
        tokio::spawn(async move {
            info!("Starting bot for team {}", team);
            match task_bot.start().await {
                Ok(()) => info!("Bot for team {} stopped", team),
                Err(e) => error!("Bot for team {} failed: {}", team, e),
            }
            let mut bots = registry.lock().await;
            if bots
                .get(&team)
                .is_some_and(|running| Arc::ptr_eq(&running.bot, &task_bot))
            {
                bots.remove(&team);
            }
        });

        Ok(bot)
    }

    /// Spawn a bot for every stored team that has a token.
    pub async fn start_stored(&self) -> SlackResult<usize> {
        let mut started = 0;
        for team in self.storage.all_teams().await? {
            let Some(token) = team.bot_token.clone() else {
                debug!("Team {} has no bot token, skipping", team.id);
                continue;
            };
            self.ensure_bot(&team.id, SecretString::new(token.into())).await?;
            started += 1;
        }
        info!("Connected to {} stored team(s)", started);
        Ok(started)
    }

    /// Record an OAuth installation, start its bot and greet the installer.
    pub async fn handle_install(&self, access: OAuthAccess) -> SlackResult<()> {
        let mut record = TeamRecord::new(&access.team_id).installed(
            access.bot.bot_user_id.clone(),
            access.bot.bot_access_token.clone(),
            access.user_id.clone(),
        );
        record.name = access.team_name.clone();
        self.storage.upsert_team(record).await?;

        if let Some(user_id) = &access.user_id {
            let user = UserRecord::new(user_id, Some(access.team_id.clone()));
            self.storage.save_user(&user).await?;
        }

        let bot = self
            .ensure_bot(
                &access.team_id,
                SecretString::new(access.bot.bot_access_token.clone().into()),
            )
            .await?;

        if let Some(user_id) = &access.user_id
            && let Err(e) = bot.greet_installer(user_id).await
        {
            warn!("Failed to greet installer {}: {}", user_id, e);
        }

        Ok(())
    }

    /// Stop every running bot.
    pub async fn shutdown_all(&self) {
        let bots: Vec<Arc<SlackBot>> = self
            .bots
            .lock()
            .await
            .drain()
            .map(|(_, running)| running.bot)
            .collect();
        info!("Stopping {} bot(s)", bots.len());
        for bot in bots {
            bot.shutdown();
        }
    }
}

/// Run a single bot until `shutdown` resolves.
pub async fn run_custom_integration<S>(bot: SlackBot, shutdown: S) -> SlackResult<()>
where
    S: Future<Output = ()> + Send,
{
    info!("Starting as a custom integration");

    let run = bot.start();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => return result,
        _ = shutdown => {}
    }

    bot.shutdown();
    match tokio::time::timeout(SHUTDOWN_GRACE, run).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Bot did not stop within {:?}", SHUTDOWN_GRACE);
            Ok(())
        }
    }
}

/// Serve the install routes and run one bot per team until `shutdown`
/// resolves.
pub async fn run_app<S>(
    credentials: AppCredentials,
    responder: Arc<Responder>,
    storage: Arc<dyn BotStorage>,
    options: BotOptions,
    shutdown: S,
) -> SlackResult<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    info!("Starting as an app");
    let registry = Arc::new(BotRegistry::new(responder, storage, options));
    registry.start_stored().await?;

    let install_registry = registry.clone();
    let state = OAuthState::new(&credentials).with_install_callback(move |access| {
        let registry = install_registry.clone();
        async move { registry.handle_install(access).await }
    });
    let app = oauth_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], credentials.port()));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SlackError::Network(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Install server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SlackError::Internal(format!("Install server failed: {}", e)))?;

    info!("Install server shutting down, stopping bots...");
    registry.shutdown_all().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use faqbot_storage::JsonFileStore;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::OAuthBot;

    async fn store() -> (TempDir, Arc<JsonFileStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));
        store.init().await.unwrap();
        (dir, store)
    }

    fn registry(storage: Arc<dyn BotStorage>, server: &MockServer) -> BotRegistry {
        let options = BotOptions {
            reconnect_delay: Duration::from_millis(10),
            max_reconnect_attempts: Some(0),
            ..BotOptions::default()
        };
        BotRegistry::new(Arc::new(Responder::builtin().unwrap()), storage, options)
            .with_api_base_url(server.uri())
    }

    async fn mock_ok(server: &MockServer, endpoint: &str, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_ensure_bot_reuses_running_bot() {
        let server = MockServer::start().await;
        // Keep the bot busy so it stays registered
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let (_dir, store) = store().await;
        let registry = registry(store, &server);

        let first = registry
            .ensure_bot("T1", SecretString::new("xoxb-1".into()))
            .await
            .unwrap();
        let second = registry
            .ensure_bot("T1", SecretString::new("xoxb-1".into()))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.running_teams().await, vec!["T1".to_string()]);

        registry.shutdown_all().await;
        assert!(!registry.is_running("T1").await);
    }

    #[tokio::test]
    async fn test_ensure_bot_replaces_bot_with_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let (_dir, store) = store().await;
        let registry = registry(store, &server);

        let old = registry
            .ensure_bot("T1", SecretString::new("xoxb-old".into()))
            .await
            .unwrap();
        let new = registry
            .ensure_bot("T1", SecretString::new("xoxb-new".into()))
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&old, &new));

        let current = registry
            .ensure_bot("T1", SecretString::new("xoxb-new".into()))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&new, &current));
        assert_eq!(registry.running_teams().await, vec!["T1".to_string()]);

        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_reinstall_runs_bot_with_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let (_dir, store) = store().await;
        let registry = registry(store.clone(), &server);

        let before = registry
            .ensure_bot("T1", SecretString::new("xoxb-old".into()))
            .await
            .unwrap();

        let access = OAuthAccess {
            user_id: None,
            team_id: "T1".to_string(),
            team_name: None,
            scope: Some("bot".to_string()),
            bot: OAuthBot {
                bot_user_id: "UBOT".to_string(),
                bot_access_token: "xoxb-new".to_string(),
            },
        };
        registry.handle_install(access).await.unwrap();

        let team = store.get_team("T1").await.unwrap().unwrap();
        assert_eq!(team.bot_token.as_deref(), Some("xoxb-new"));

        let after = registry
            .ensure_bot("T1", SecretString::new("xoxb-new".into()))
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&before, &after));

        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_start_stored_skips_teams_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let (_dir, store) = store().await;
        store
            .save_team(&TeamRecord::new("T1").installed("UBOT", "xoxb-1", None))
            .await
            .unwrap();
        store.save_team(&TeamRecord::new("T2")).await.unwrap();

        let registry = registry(store, &server);
        assert_eq!(registry.start_stored().await.unwrap(), 1);
        assert!(registry.is_running("T1").await);
        assert!(!registry.is_running("T2").await);
        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_failed_bot_leaves_registry() {
        let server = MockServer::start().await;
        mock_ok(
            &server,
            "/auth.test",
            serde_json::json!({"ok": false, "error": "invalid_auth"}),
        )
        .await;

        let (_dir, store) = store().await;
        let registry = registry(store, &server);
        registry
            .ensure_bot("T1", SecretString::new("xoxb-revoked".into()))
            .await
            .unwrap();

        let mut stopped = false;
        for _ in 0..50 {
            if !registry.is_running("T1").await {
                stopped = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(stopped, "bot with revoked token should leave the registry");
    }

    #[tokio::test]
    async fn test_handle_install() {
        let server = MockServer::start().await;
        mock_ok(
            &server,
            "/auth.test",
            serde_json::json!({"ok": false, "error": "invalid_auth"}),
        )
        .await;
        mock_ok(
            &server,
            "/conversations.open",
            serde_json::json!({"ok": true, "channel": {"id": "D1"}}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true, "ts": "1.1"})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let (_dir, store) = store().await;
        let registry = registry(store.clone(), &server);

        let access = OAuthAccess {
            user_id: Some("U1".to_string()),
            team_id: "T1".to_string(),
            team_name: Some("Acme".to_string()),
            scope: Some("bot".to_string()),
            bot: OAuthBot {
                bot_user_id: "UBOT".to_string(),
                bot_access_token: "xoxb-new".to_string(),
            },
        };
        registry.handle_install(access).await.unwrap();

        let team = store.get_team("T1").await.unwrap().unwrap();
        assert_eq!(team.name.as_deref(), Some("Acme"));
        assert_eq!(team.bot_token.as_deref(), Some("xoxb-new"));
        assert_eq!(team.created_by.as_deref(), Some("U1"));

        let user = store.get_user("U1").await.unwrap().unwrap();
        assert_eq!(user.team_id.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_custom_integration_stops_on_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let responder = Arc::new(Responder::builtin().unwrap());
        let bot = SlackBot::new(SecretString::new("xoxb-1".into()), responder)
            .unwrap()
            .with_api_base_url(server.uri());

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            run_custom_integration(bot, async {}),
        )
        .await;
        assert!(result.is_ok(), "runner should return after shutdown");
    }
}
