//! Common test utilities for integration tests.

use abbot::commands::{build_registry, CommandDeps, EventStore};
use abbot::config::BotConfig;
use abbot::dispatcher::{AppContext, Dispatcher};
use abbot::permissions::{Blacklist, PermissionResolver};
use abbot::transport::ChatTransport;
use chat_client::{Channel, ChannelKind, ChatClient, ChatMessage, Member, User};
use chrono::Utc;
use forum_client::ForumClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use usage_store::UsageStore;
use wiremock::MockServer;

pub const OWNER_ID: &str = "123456789";

/// Start a mock chat gateway (also serving forum listings).
pub async fn mock_gateway() -> MockServer {
    MockServer::start().await
}

/// Create a chat client configured for a mock server.
pub fn test_chat_client(mock_server: &MockServer) -> ChatClient {
    ChatClient::new(mock_server.uri(), "test-token", Duration::from_secs(5)).unwrap()
}

pub fn bot_user() -> User {
    User {
        id: "999999".into(),
        name: "Abbot".into(),
        discriminator: Some("4242".into()),
        bot: true,
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
        discriminator: Some("0001".into()),
        bot: false,
    }
}

/// A message in server `s1`, channel `c1`.
pub fn message(author: User, content: &str) -> ChatMessage {
    ChatMessage {
        id: format!("msg-{}", content.len()),
        member: Some(Member {
            user: author.clone(),
            nick: None,
            roles: Vec::new(),
            voice_channel_id: None,
            joined_at: None,
        }),
        author,
        server_id: Some("s1".into()),
        channel: Channel {
            id: "c1".into(),
            name: "general".into(),
            kind: ChannelKind::Text,
        },
        content: content.into(),
        timestamp: Utc::now(),
        mentions: Vec::new(),
        channel_mentions: Vec::new(),
        role_mentions: Vec::new(),
    }
}

pub fn test_settings() -> BotConfig {
    BotConfig {
        delete_messages: false,
        dramatic_pause: Duration::ZERO,
        ..BotConfig::default()
    }
}

/// A bot wired to `mock_server`, with its state in a temp directory.
pub struct TestBot {
    pub dispatcher: Dispatcher,
    pub store: UsageStore,
    pub dir: TempDir,
}

pub async fn test_bot(mock_server: &MockServer, settings: BotConfig) -> TestBot {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("usage.sqlite3").display());
    let store = UsageStore::connect(&url).await.unwrap();

    let transport: Arc<dyn ChatTransport> = Arc::new(test_chat_client(mock_server));
    let forum = ForumClient::new(mock_server.uri(), Duration::from_secs(5)).unwrap();

    let registry = build_registry(&CommandDeps {
        transport: transport.clone(),
        store: store.clone(),
        forum,
        subreddits: vec!["jokes".into()],
        events: EventStore::new(dir.path(), "gifter", 50),
        settings: settings.clone(),
    })
    .unwrap();

    let app = AppContext {
        transport,
        store: store.clone(),
        permissions: PermissionResolver::new(OWNER_ID, &HashMap::new()),
        blacklist: Blacklist::default(),
        settings,
    };

    TestBot {
        dispatcher: Dispatcher::new(app, registry, bot_user()),
        store,
        dir,
    }
}
