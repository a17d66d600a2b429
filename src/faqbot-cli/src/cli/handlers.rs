//! Command execution handlers.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use faqbot_responder::{DeliveryMode, IncomingMessage, Responder, RuleSet, Scope};
use faqbot_slack::{
    BootstrapMode, BotOptions, SlackBot, StartupConfig, run_app, run_custom_integration,
};
use tokio::signal;
use tracing::{error, info};

use super::args::{AskArgs, Cli, Commands};

/// Dispatch the parsed command line.
pub async fn dispatch_command(cli: Cli) -> Result<()> {
    let rules = cli.rules.as_deref();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(rules).await,
        Commands::Check => {
            let responder = load_responder(rules)?;
            print!("{}", summarize(&responder));
            Ok(())
        }
        Commands::Ask(args) => {
            let responder = load_responder(rules)?;
            println!("{}", answer(&responder, &args));
            Ok(())
        }
    }
}

/// Compile the rule table from `path`, or the built-in one.
pub fn load_responder(path: Option<&Path>) -> Result<Responder> {
    match path {
        Some(path) => {
            let rule_set = RuleSet::load(path)
                .with_context(|| format!("Failed to load rules from {}", path.display()))?;
            rule_set
                .compile()
                .with_context(|| format!("Invalid rules in {}", path.display()))
        }
        None => Responder::builtin().context("Built-in rule table is invalid"),
    }
}

/// Resolve the environment and run the bot until Ctrl+C.
async fn run_bot(rules: Option<&Path>) -> Result<()> {
    let config = StartupConfig::from_env()?;
    info!("Starting faqbot as {}", config.mode.name());

    let responder = Arc::new(load_responder(rules)?);
    info!("Loaded {} rule(s)", responder.rules().len());

    let storage = config
        .storage
        .open()
        .await
        .context("Failed to open storage")?;

    let options = BotOptions::default();
    match config.mode {
        BootstrapMode::CustomIntegration { token } => {
            let bot = SlackBot::with_options(token, responder, options)?.with_storage(storage);
            run_custom_integration(bot, shutdown_signal()).await?;
        }
        BootstrapMode::App(credentials) => {
            run_app(credentials, responder, storage, options, shutdown_signal()).await?;
        }
    }

    info!("faqbot stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

/// Human-readable overview of a compiled rule table.
pub fn summarize(responder: &Responder) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} rule(s)", responder.rules().len());

    for (index, rule) in responder.rules().iter().enumerate() {
        let scopes: Vec<&str> = rule.scopes().iter().map(Scope::as_str).collect();
        let _ = writeln!(
            out,
            "  #{} {}: {} trigger(s), scopes [{}], {}",
            index + 1,
            rule.name().unwrap_or("(unnamed)"),
            rule.triggers().len(),
            scopes.join(", "),
            mode_name(rule.response().mode),
        );
        for trigger in rule.triggers() {
            let _ = writeln!(out, "    {} {}", trigger.kind(), trigger.as_str());
        }
    }

    match responder.fallback() {
        Some(fallback) => {
            let scopes: Vec<&str> = fallback.scopes().iter().map(Scope::as_str).collect();
            let _ = writeln!(out, "fallback: scopes [{}]", scopes.join(", "));
        }
        None => {
            let _ = writeln!(out, "fallback: disabled");
        }
    }

    out
}

/// Answer a single message offline.
pub fn answer(responder: &Responder, args: &AskArgs) -> String {
    let message = IncomingMessage::new(args.scope, args.message())
        .in_channel("cli")
        .by_user("cli")
        .at("0");

    match responder.match_message(&message) {
        Some(reply) => match reply.mode {
            DeliveryMode::Plain => reply.text,
            DeliveryMode::Threaded => format!("[in thread] {}", reply.text),
        },
        None => "no reply".to_string(),
    }
}

fn mode_name(mode: DeliveryMode) -> &'static str {
    match mode {
        DeliveryMode::Plain => "plain",
        DeliveryMode::Threaded => "threaded",
    }
}
