//! Chat gateway API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat account, human or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Mention markup that pings this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// `name#discriminator` when a discriminator is known.
    pub fn tag(&self) -> String {
        match &self.discriminator {
            Some(d) => format!("{}#{}", self.name, d),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Private,
    Voice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn is_private(&self) -> bool {
        self.kind == ChannelKind::Private
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// Server-scoped view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    /// Role ids, highest role first.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub voice_channel_id: Option<String>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.name)
    }
}

/// A message posted in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: User,
    #[serde(default)]
    pub server_id: Option<String>,
    pub channel: Channel,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub channel_mentions: Vec<String>,
    #[serde(default)]
    pub role_mentions: Vec<String>,
    /// Author's membership in `server_id`, absent in private channels.
    #[serde(default)]
    pub member: Option<Member>,
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub user_id: String,
    pub message_id: String,
    pub message_author_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub server_id: Option<String>,
    pub emoji: String,
    /// Reactions on the message after this change.
    #[serde(default)]
    pub message_reaction_count: u32,
    /// Reactions by `user_id` on the message after this change.
    #[serde(default)]
    pub user_reaction_count: u32,
}

/// Events delivered by the gateway bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingEvent {
    Ready { user: User },
    MessageCreate(ChatMessage),
    ReactionAdd(ReactionEvent),
    ReactionRemove(ReactionEvent),
    MemberJoin { server_id: String, member: Member },
    MemberLeave { server_id: String, user: User },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Rich message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub colour: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>, colour: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            colour,
            footer: None,
        }
    }

    pub fn with_footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url: None,
        });
        self
    }
}

/// Outgoing message request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
        }
    }
}

/// Send message response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateUserRequest<'a> {
    pub username: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PresenceRequest<'a> {
    pub status: &'a str,
}
