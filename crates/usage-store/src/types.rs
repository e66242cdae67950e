//! Usage record types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UsageStoreError;

/// Fixed-width timestamp layout; sorts lexicographically in SQL.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, UsageStoreError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| UsageStoreError::InvalidTimestamp(raw.to_string()))
}

/// Row identity shared by every usage family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageKey {
    pub user: String,
    pub server: String,
    pub channel: String,
}

impl UsageKey {
    pub fn new(user: impl Into<String>, server: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
            channel: channel.into(),
        }
    }

    /// Same server and channel, different user.
    pub fn for_user(&self, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: self.server.clone(),
            channel: self.channel.clone(),
        }
    }
}

/// Query filter. `None` dimensions are aggregated over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageScope {
    pub user: Option<String>,
    pub server: Option<String>,
    pub channel: Option<String>,
}

impl UsageScope {
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.server.is_none() && self.channel.is_none()
    }
}

impl From<&UsageKey> for UsageScope {
    fn from(key: &UsageKey) -> Self {
        Self {
            user: Some(key.user.clone()),
            server: Some(key.server.clone()),
            channel: Some(key.channel.clone()),
        }
    }
}

/// Increment applied by one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageDelta {
    pub message_count: i64,
    pub word_count: i64,
    pub character_count: i64,
    pub url_count: i64,
    pub max_message_length: i64,
    pub timestamp: DateTime<Utc>,
}

impl MessageDelta {
    /// Counters contributed by a single message body.
    pub fn from_text(text: &str, timestamp: DateTime<Utc>) -> Self {
        let characters = text.chars().count() as i64;
        let words = text.split_whitespace();
        let (word_count, url_count) = words.fold((0i64, 0i64), |(w, u), word| {
            let is_url = word.starts_with("http://") || word.starts_with("https://");
            (w + 1, u + i64::from(is_url))
        });

        Self {
            message_count: 1,
            word_count,
            character_count: characters,
            url_count,
            max_message_length: characters,
            timestamp,
        }
    }
}

/// Aggregated message usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageUsage {
    pub message_count: i64,
    pub word_count: i64,
    pub character_count: i64,
    pub url_count: i64,
    pub max_message_length: i64,
    pub last_message_timestamp: Option<DateTime<Utc>>,
}

/// Reaction counters, used both as delta and as aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    /// Distinct messages this user reacted to.
    pub messages_reacted: i64,
    /// Reactions this user added.
    pub user_reacted: i64,
    /// Messages by this user that received at least one reaction.
    pub message_reactions_received: i64,
    /// Reactions added to this user's messages.
    pub reactions_received: i64,
}

/// Mention counters, used both as delta and as aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MentionCounts {
    /// Users this user mentioned.
    pub user_mentions: i64,
    /// Times this user was mentioned.
    pub user_mentioned: i64,
    pub channel_mentions: i64,
    pub role_mentions: i64,
}

impl MentionCounts {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Command tallies split by whether the command was accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandCounts {
    pub valid: i64,
    pub invalid: i64,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub user: String,
    pub value: i64,
}

/// An idea-box submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Idea {
    pub id: i64,
    pub user: String,
    pub server: String,
    pub channel: String,
    pub idea: String,
    pub idea_date: DateTime<Utc>,
}

/// Rows moved by an archive run, per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub messages: u64,
    pub reactions: u64,
    pub mentions: u64,
    pub commands: u64,
}

impl ArchiveSummary {
    pub fn total(&self) -> u64 {
        self.messages + self.reactions + self.mentions + self.commands
    }
}
