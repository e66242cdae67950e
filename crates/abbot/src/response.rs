//! Command responses.

use chat_client::{Embed, OutgoingMessage, User};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Embed(Embed),
}

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub content: Content,
    /// Prefix text responses with the invoker's mention.
    pub reply: bool,
    /// Delete the response after this long; `None` keeps it.
    pub delete_after: Option<Duration>,
    /// Emoji added to the sent message.
    pub reactions: Vec<String>,
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Content::Text(text.into()),
            reply: false,
            delete_after: None,
            reactions: Vec::new(),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: Content::Embed(embed),
            reply: false,
            delete_after: None,
            reactions: Vec::new(),
        }
    }

    pub fn reply(mut self) -> Self {
        self.reply = true;
        self
    }

    pub fn delete_after(mut self, after: Duration) -> Self {
        self.delete_after = (!after.is_zero()).then_some(after);
        self
    }

    pub fn with_reaction(mut self, emoji: impl Into<String>) -> Self {
        self.reactions.push(emoji.into());
        self
    }

    /// Wire message for `invoker`. Embeds are never prefixed.
    pub fn to_outgoing(&self, invoker: &User) -> OutgoingMessage {
        match &self.content {
            Content::Text(text) if self.reply => {
                OutgoingMessage::text(format!("{}, {}", invoker.mention(), text))
            }
            Content::Text(text) => OutgoingMessage::text(text.clone()),
            Content::Embed(embed) => OutgoingMessage::embed(embed.clone()),
        }
    }
}

/// Wrap text in a code block, as error and usage messages are shown.
pub fn code_block(text: &str) -> String {
    format!("```\n{}\n```", text)
}
