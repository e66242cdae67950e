//! Abbot chat bot - Main entry point.

use abbot::commands::{build_registry, CommandDeps, EventStore};
use abbot::config::Config;
use abbot::dispatcher::{AppContext, Dispatcher};
use abbot::error::AppResult;
use abbot::permissions::{Blacklist, PermissionResolver};
use abbot::transport::ChatTransport;
use anyhow::Context;
use chat_client::{ChatClient, EventReceiver};
use forum_client::ForumClient;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::signal;
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use usage_store::UsageStore;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.bot.log_level);

    info!("Starting Abbot...");

    let store = UsageStore::connect(&config.storage.database_url).await?;

    let chat = ChatClient::new(
        &config.chat.service_url,
        config.chat.token.expose_secret(),
        config.chat.timeout,
    )?;

    if !chat.health_check().await {
        error!("Chat gateway not reachable at {}", config.chat.service_url);
        return Err(anyhow::anyhow!("Chat gateway not reachable").into());
    }
    info!("Chat gateway healthy");

    let bot_user = chat.current_user().await?;
    info!("Logged in as {} ({})", bot_user.tag(), bot_user.id);

    let forum = ForumClient::new(&config.forum.base_url, config.forum.timeout)?;

    let blacklist = Blacklist::load(&config.permissions.blacklist_file)
        .await
        .context("Failed to read blacklist")?;
    let permissions = PermissionResolver::new(&config.permissions.owner_id, &config.groups);

    let transport: Arc<dyn ChatTransport> = Arc::new(chat.clone());
    let events = EventStore::new(
        &config.event.directory,
        &config.event.name,
        config.event.max_participants,
    );

    let registry = build_registry(&CommandDeps {
        transport: transport.clone(),
        store: store.clone(),
        forum,
        subreddits: config.forum.subreddits.clone(),
        events,
        settings: config.bot.clone(),
    })?;
    info!(
        "Registered {} commands: {}",
        registry.len(),
        registry.names().join(", ")
    );

    let dispatcher = Arc::new(Dispatcher::new(
        AppContext {
            transport,
            store: store.clone(),
            permissions,
            blacklist,
            settings: config.bot.clone(),
        },
        registry,
        bot_user,
    ));

    info!(
        "Listening for events (prefix {})...",
        config.bot.command_prefix
    );

    // Start event receiver
    let receiver = EventReceiver::new(chat, config.chat.poll_interval);
    let mut stream = Box::pin(receiver.stream());

    // Main event loop
    loop {
        tokio::select! {
            Some(event) = stream.next() => {
                // One event at a time; a panicking handler only loses its own event.
                let dispatcher = dispatcher.clone();
                let handled = tokio::spawn(async move {
                    dispatcher.handle_event(event).await;
                });
                if let Err(e) = handled.await {
                    error!("Event handler failed: {}", e);
                }
            }
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    store.close().await;
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
