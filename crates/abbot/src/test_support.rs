//! Fixtures shared by unit tests.

use crate::binder::{bind, BindOutcome, BoundArgs, EventContext};
use crate::commands::{CommandHandler, Invocation};
use crate::permissions::PermissionProfile;
use crate::registry::CommandRegistry;
use chat_client::{Channel, ChannelKind, ChatMessage, Member, User};
use chrono::Utc;
use tempfile::TempDir;
use usage_store::UsageStore;

pub const OWNER_ID: &str = "123456789";

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
        discriminator: Some("0001".into()),
        bot: false,
    }
}

pub fn alice() -> User {
    user("100001", "alice")
}

pub fn owner() -> User {
    user(OWNER_ID, "owner")
}

pub fn bot_user() -> User {
    User {
        id: "999999".into(),
        name: "Abbot".into(),
        discriminator: Some("4242".into()),
        bot: true,
    }
}

/// A message from `author` in server `s1`, channel `c1`.
pub fn message_from(author: User, content: &str) -> ChatMessage {
    ChatMessage {
        id: "m1".into(),
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

pub fn text_message(content: &str) -> ChatMessage {
    message_from(alice(), content)
}

pub fn private_message(author: User, content: &str) -> ChatMessage {
    ChatMessage {
        server_id: None,
        member: None,
        channel: Channel {
            id: "dm1".into(),
            name: String::new(),
            kind: ChannelKind::Private,
        },
        ..message_from(author, content)
    }
}

pub fn bind_for(
    handler: &dyn CommandHandler,
    message: &ChatMessage,
    permissions: &PermissionProfile,
    tokens: &[&str],
) -> BoundArgs {
    let ctx = EventContext {
        message,
        permissions,
    };
    let tokens = tokens.iter().map(|t| t.to_string()).collect();
    match bind(&handler.descriptor(), ctx, tokens) {
        BindOutcome::Bound(args) => args,
        other => panic!("binding failed: {:?}", other),
    }
}

pub async fn temp_store() -> (TempDir, UsageStore) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("usage.sqlite3").display());
    let store = UsageStore::connect(&url).await.unwrap();
    (dir, store)
}

pub fn invocation<'a>(registry: &'a CommandRegistry, bot_user: &'a User) -> Invocation<'a> {
    Invocation {
        registry,
        bot_user,
        command_prefix: "?",
        is_owner: false,
    }
}
