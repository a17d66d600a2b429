//! RTM bot.
//!
//! The `SlackBot` is the central component that:
//! - Connects to Slack via the RTM API (WebSocket)
//! - Classifies incoming messages and runs them through the [`Responder`]
//! - Posts the replies with `chat.postMessage`
//! - Reconnects when the socket drops
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use faqbot_responder::Responder;
//! use faqbot_slack::SlackBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let responder = Arc::new(Responder::builtin()?);
//!     let bot = SlackBot::new("xoxb-...".to_string().into(), responder)?;
//!
//!     // Runs until shutdown
//!     bot.start().await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use faqbot_responder::{Reply, Responder};
use faqbot_storage::{BotStorage, TeamRecord};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::net::TcpStream;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::api::{RtmConnectInfo, SlackApi};
use crate::error::{SlackError, SlackResult};
use crate::events::{RtmEvent, classify, parse_rtm_event};
use crate::messages::{SlackMessageContent, installation_greeting};

/// Type alias for the WebSocket connection.
type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for bot behavior.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Timeout for API requests.
    pub api_timeout: Duration,
    /// Maximum retries for rate-limited sends.
    pub max_retries: u32,
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Ping interval for WebSocket keep-alive.
    pub ping_interval: Duration,
    /// Consecutive failed connections before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(30),
            max_retries: 3,
            reconnect_delay: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            max_reconnect_attempts: Some(10),
        }
    }
}

/// What to do with one RTM frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    /// Nothing to do.
    Ignore,
    /// The server said hello.
    Connected,
    /// The server is closing the connection.
    Closing,
    /// Post this reply.
    Reply(Reply),
}

/// Decide what an RTM frame calls for.
///
/// Pure: classifies messages against `bot_user_id` and runs them through
/// `responder` without touching the network.
pub fn plan_frame(text: &str, responder: &Responder, bot_user_id: &str) -> FrameAction {
    let event = match parse_rtm_event(text) {
        Ok(Some(event)) => event,
        Ok(None) => return FrameAction::Ignore,
        Err(e) => {
            warn!("Failed to parse RTM event: {}", e);
            return FrameAction::Ignore;
        }
    };

    match event {
        RtmEvent::Hello => FrameAction::Connected,
        RtmEvent::Goodbye => FrameAction::Closing,
        RtmEvent::Message(message) => classify(&message, bot_user_id)
            .and_then(|incoming| responder.match_message(&incoming))
            .map(FrameAction::Reply)
            .unwrap_or(FrameAction::Ignore),
        RtmEvent::Pong { reply_to } => {
            debug!("Pong received for ping {:?}", reply_to);
            FrameAction::Ignore
        }
        RtmEvent::Error { error } => {
            warn!("RTM error event: {:?}", error);
            FrameAction::Ignore
        }
        RtmEvent::Unknown => FrameAction::Ignore,
    }
}

/// Pause before retrying a send that failed with [`SlackError::Unavailable`].
const UNAVAILABLE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Post `content` to `channel`, retrying rate limits and transient Slack
/// failures up to `max_retries` times.
pub async fn post_with_retry(
    api: &SlackApi,
    channel: &str,
    content: &SlackMessageContent,
    max_retries: u32,
) -> SlackResult<String> {
    let payload = content.to_payload(channel);
    let mut attempt = 0;
    loop {
        match api.post_message(&payload).await {
            Err(SlackError::RateLimited { retry_after_secs }) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    "Rate limited posting to {}, retrying in {}s ({}/{})",
                    channel, retry_after_secs, attempt, max_retries
                );
                tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
            }
            Err(SlackError::Unavailable(reason)) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    "Slack unavailable posting to {} ({}), retrying ({}/{})",
                    channel, reason, attempt, max_retries
                );
                tokio::time::sleep(UNAVAILABLE_RETRY_DELAY).await;
            }
            result => return result,
        }
    }
}

/// How long to wait before reconnecting after `error`.
///
/// Rate limits on `rtm.connect` are honoured when they ask for longer than
/// `base`.
pub fn reconnect_delay_after(error: Option<&SlackError>, base: Duration) -> Duration {
    match error {
        Some(SlackError::RateLimited { retry_after_secs }) => {
            base.max(Duration::from_secs(*retry_after_secs))
        }
        _ => base,
    }
}

/// How a single RTM connection ended.
enum ConnectionEnd {
    Shutdown,
    Closed { connected: bool },
}

/// A bot connected to one Slack workspace.
pub struct SlackBot {
    /// Web API client bound to the bot token.
    api: SlackApi,
    /// Shared rule table.
    responder: Arc<Responder>,
    /// Where team records go (optional).
    storage: Option<Arc<dyn BotStorage>>,
    /// Bot options.
    options: BotOptions,
    /// Bot's own user ID (set after authentication).
    bot_user_id: Arc<RwLock<Option<String>>>,
    /// Workspace ID (set after authentication).
    team_id: Arc<RwLock<Option<String>>>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
    /// Message IDs for frames we send.
    next_frame_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for SlackBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackBot")
            .field("api", &self.api)
            .field("rules", &self.responder.rules().len())
            .field("storage", &self.storage.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl SlackBot {
    /// Create a bot for `token` answering with `responder`.
    pub fn new(token: SecretString, responder: Arc<Responder>) -> SlackResult<Self> {
        Self::with_options(token, responder, BotOptions::default())
    }

    /// Create a new bot with custom options.
    pub fn with_options(
        token: SecretString,
        responder: Arc<Responder>,
        options: BotOptions,
    ) -> SlackResult<Self> {
        let api = SlackApi::new(token, options.api_timeout)?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            api,
            responder,
            storage: None,
            options,
            bot_user_id: Arc::new(RwLock::new(None)),
            team_id: Arc::new(RwLock::new(None)),
            shutdown_tx,
            next_frame_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Record the team in `storage` whenever the bot connects.
    pub fn with_storage(mut self, storage: Arc<dyn BotStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Send Web API calls to another base URL.
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api = self.api.with_base_url(base_url);
        self
    }

    /// Web API client used by this bot.
    pub fn api(&self) -> &SlackApi {
        &self.api
    }

    /// Get the bot's user ID (if known).
    pub async fn bot_user_id(&self) -> Option<String> {
        self.bot_user_id.read().await.clone()
    }

    /// Get the workspace ID (if known).
    pub async fn team_id(&self) -> Option<String> {
        self.team_id.read().await.clone()
    }

    /// Start the bot and run until shutdown.
    pub async fn start(&self) -> SlackResult<()> {
        info!("Starting Slack bot...");

        // Subscribe before the first await so an early shutdown is not lost
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.authenticate().await?;
        self.run_rtm(&mut shutdown_rx).await
    }

    /// Shutdown the bot gracefully.
    pub fn shutdown(&self) {
        info!("Shutting down Slack bot...");
        let _ = self.shutdown_tx.send(());
    }

    /// Check the token with `auth.test` and remember who we are.
    pub async fn authenticate(&self) -> SlackResult<()> {
        let identity = self.api.auth_test().await?;
        info!(
            "Authenticated as bot user {} in team {}",
            identity.user_id, identity.team_id
        );
        *self.bot_user_id.write().await = Some(identity.user_id);
        *self.team_id.write().await = Some(identity.team_id);
        Ok(())
    }

    /// DM the installer the post-installation instructions.
    pub async fn greet_installer(&self, user_id: &str) -> SlackResult<()> {
        let channel = self.api.open_conversation(user_id).await?;
        for line in installation_greeting() {
            post_with_retry(&self.api, &channel, &line, self.options.max_retries).await?;
        }
        info!("Greeted installer {}", user_id);
        Ok(())
    }

    /// Run the RTM connection loop.
    async fn run_rtm(&self, shutdown_rx: &mut broadcast::Receiver<()>) -> SlackResult<()> {
        let mut failures: u32 = 0;

        loop {
            let outcome = match self.api.rtm_connect().await {
                Ok(info) => self.connect_and_run(info, shutdown_rx).await,
                Err(e @ SlackError::Auth(_)) => return Err(e),
                Err(e) => Err(e),
            };
            let delay = reconnect_delay_after(outcome.as_ref().err(), self.options.reconnect_delay);

            match outcome {
                Ok(ConnectionEnd::Shutdown) => {
                    info!("RTM api closed");
                    return Ok(());
                }
                Ok(ConnectionEnd::Closed { connected }) => {
                    info!("RTM api closed");
                    if connected {
                        failures = 0;
                    } else {
                        failures += 1;
                    }
                }
                Err(e) => {
                    error!("RTM connection error: {}", e);
                    failures += 1;
                }
            }

            if let Some(max) = self.options.max_reconnect_attempts
                && failures > max
            {
                return Err(SlackError::WebSocket(format!(
                    "Giving up after {} failed connection attempts",
                    failures
                )));
            }

            // Wait before reconnecting
            info!("Reconnecting in {:?}...", delay);
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Connect to WebSocket and run event loop.
    async fn connect_and_run(
        &self,
        info: RtmConnectInfo,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> SlackResult<ConnectionEnd> {
        *self.bot_user_id.write().await = Some(info.bot.id.clone());

        debug!("Connecting to RTM websocket for team {}", info.team.id);
        let (ws_stream, _) = connect_async(info.url.as_str()).await?;
        let (write, read) = ws_stream.split();

        let write = Arc::new(tokio::sync::Mutex::new(write));
        let write_clone = write.clone();

        // Channel for outgoing frames
        let (msg_tx, mut msg_rx) = mpsc::channel::<WsMessage>(100);

        // Spawn write task
        let write_task = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                let mut guard = write_clone.lock().await;
                if let Err(e) = guard.send(msg).await {
                    error!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
        });

        // RTM expects application-level pings
        let ping_tx = msg_tx.clone();
        let ping_interval = self.options.ping_interval;
        let frame_ids = self.next_frame_id.clone();
        let ping_task = tokio::spawn(async move {
            let mut interval = interval(ping_interval);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let ping = serde_json::json!({
                    "id": frame_ids.fetch_add(1, Ordering::Relaxed),
                    "type": "ping",
                });
                if ping_tx.send(WsMessage::Text(ping.to_string())).await.is_err() {
                    break;
                }
            }
        });

        let result = self.process_messages(read, &info, msg_tx, shutdown_rx).await;

        // Cleanup
        ping_task.abort();
        write_task.abort();

        result
    }

    /// Process incoming WebSocket messages.
    async fn process_messages(
        &self,
        mut read: SplitStream<WsConnection>,
        info: &RtmConnectInfo,
        msg_tx: mpsc::Sender<WsMessage>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> SlackResult<ConnectionEnd> {
        let bot_user_id = info.bot.id.as_str();
        let mut connected = false;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    let _ = msg_tx.send(WsMessage::Close(None)).await;
                    return Ok(ConnectionEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            debug!("Received RTM frame: {}", text);
                            match plan_frame(&text, &self.responder, bot_user_id) {
                                FrameAction::Connected => {
                                    connected = true;
                                    info!("RTM api connected");
                                    self.record_connection(info).await;
                                }
                                FrameAction::Closing => {
                                    info!("Received goodbye from Slack");
                                    return Ok(ConnectionEnd::Closed { connected });
                                }
                                FrameAction::Reply(reply) => self.deliver(reply),
                                FrameAction::Ignore => {}
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            let _ = msg_tx.send(WsMessage::Pong(data)).await;
                        }
                        Some(Ok(WsMessage::Close(_))) => {
                            info!("WebSocket closed by server");
                            return Ok(ConnectionEnd::Closed { connected });
                        }
                        Some(Err(e)) => {
                            return Err(SlackError::WebSocket(e.to_string()));
                        }
                        None => {
                            return Ok(ConnectionEnd::Closed { connected });
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Post a reply without holding up the read loop.
    fn deliver(&self, reply: Reply) {
        let api = self.api.clone();
        let max_retries = self.options.max_retries;
        tokio::spawn(async move {
            let content = SlackMessageContent::from(&reply);
            match post_with_retry(&api, reply.channel(), &content, max_retries).await {
                Ok(ts) => debug!("Replied in {} at {}", reply.channel(), ts),
                Err(e) => error!("Failed to send reply to {}: {}", reply.channel(), e),
            }
        });
    }

    /// Upsert the team record after a successful connection.
    async fn record_connection(&self, info: &RtmConnectInfo) {
        *self.team_id.write().await = Some(info.team.id.clone());

        let Some(storage) = &self.storage else {
            return;
        };

        let mut record = TeamRecord::new(&info.team.id);
        record.name = info.team.name.clone();
        record.bot_user_id = Some(info.bot.id.clone());
        record.touch_connected();

        if let Err(e) = storage.upsert_team(record).await {
            warn!("Failed to record team {}: {}", info.team.id, e);
        }
    }
}
