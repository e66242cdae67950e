//! Rankable metric columns.
//!
//! Ranking never takes caller-provided SQL: each family exposes a closed
//! set of metrics, and each metric knows its table and aggregate.

use std::fmt;
use std::str::FromStr;

use crate::error::UsageStoreError;

/// A column a leaderboard can be computed over.
pub trait Metric: Copy + fmt::Debug + Send + Sync {
    /// Table the metric lives in.
    const TABLE: &'static str;

    /// Aggregate expression over the table's rows for one user.
    fn expression(&self) -> &'static str;

    /// Human readable name.
    fn label(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageMetric {
    Messages,
    Words,
    Characters,
    Urls,
    MaxLength,
}

impl MessageMetric {
    pub fn all() -> &'static [MessageMetric] {
        &[
            MessageMetric::Messages,
            MessageMetric::Words,
            MessageMetric::Characters,
            MessageMetric::Urls,
            MessageMetric::MaxLength,
        ]
    }
}

impl Metric for MessageMetric {
    const TABLE: &'static str = "usage_messages";

    fn expression(&self) -> &'static str {
        match self {
            MessageMetric::Messages => "SUM(message_count)",
            MessageMetric::Words => "SUM(word_count)",
            MessageMetric::Characters => "SUM(character_count)",
            MessageMetric::Urls => "SUM(url_count)",
            // High-water mark; summing across channels would be meaningless.
            MessageMetric::MaxLength => "MAX(max_message_length)",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MessageMetric::Messages => "Messages",
            MessageMetric::Words => "Words",
            MessageMetric::Characters => "Characters",
            MessageMetric::Urls => "Links",
            MessageMetric::MaxLength => "Longest message",
        }
    }
}

impl FromStr for MessageMetric {
    type Err = UsageStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "messages" | "message_count" => Ok(MessageMetric::Messages),
            "words" | "word_count" => Ok(MessageMetric::Words),
            "characters" | "chars" | "character_count" => Ok(MessageMetric::Characters),
            "urls" | "links" | "url_count" => Ok(MessageMetric::Urls),
            "max" | "longest" | "max_message_length" => Ok(MessageMetric::MaxLength),
            other => Err(UsageStoreError::UnknownMetric(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionMetric {
    MessagesReacted,
    UserReacted,
    MessageReactionsReceived,
    ReactionsReceived,
}

impl Metric for ReactionMetric {
    const TABLE: &'static str = "usage_reactions";

    fn expression(&self) -> &'static str {
        match self {
            ReactionMetric::MessagesReacted => "SUM(messages_reacted_count)",
            ReactionMetric::UserReacted => "SUM(user_reacted_count)",
            ReactionMetric::MessageReactionsReceived => "SUM(message_reactions_received_count)",
            ReactionMetric::ReactionsReceived => "SUM(reactions_received_count)",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ReactionMetric::MessagesReacted => "Messages reacted to",
            ReactionMetric::UserReacted => "Reactions given",
            ReactionMetric::MessageReactionsReceived => "Messages with reactions",
            ReactionMetric::ReactionsReceived => "Reactions received",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MentionMetric {
    UserMentions,
    UserMentioned,
    ChannelMentions,
    RoleMentions,
}

impl Metric for MentionMetric {
    const TABLE: &'static str = "usage_mentions";

    fn expression(&self) -> &'static str {
        match self {
            MentionMetric::UserMentions => "SUM(user_mentions)",
            MentionMetric::UserMentioned => "SUM(user_mentioned)",
            MentionMetric::ChannelMentions => "SUM(channel_mentions)",
            MentionMetric::RoleMentions => "SUM(role_mentions)",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MentionMetric::UserMentions => "Mentions made",
            MentionMetric::UserMentioned => "Times mentioned",
            MentionMetric::ChannelMentions => "Channel mentions",
            MentionMetric::RoleMentions => "Role mentions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandMetric {
    Valid,
    Invalid,
}

impl Metric for CommandMetric {
    const TABLE: &'static str = "usage_commands";

    fn expression(&self) -> &'static str {
        match self {
            CommandMetric::Valid => "SUM(CASE WHEN valid = 1 THEN count ELSE 0 END)",
            CommandMetric::Invalid => "SUM(CASE WHEN valid = 0 THEN count ELSE 0 END)",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CommandMetric::Valid => "Commands",
            CommandMetric::Invalid => "Invalid commands",
        }
    }
}
