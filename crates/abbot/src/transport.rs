//! The chat operations the bot needs, as a trait so handlers can be tested
//! without a gateway.

use async_trait::async_trait;
use chat_client::{ChatClient, ChatError, ChatMessage, Member, OutgoingMessage, SentMessage, User};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, channel_id: &str, message: &OutgoingMessage) -> Result<SentMessage, ChatError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError>;

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<(), ChatError>;

    async fn history(&self, channel_id: &str, limit: u32) -> Result<Vec<ChatMessage>, ChatError>;

    async fn list_members(&self, server_id: &str) -> Result<Vec<Member>, ChatError>;

    async fn set_username(&self, name: &str) -> Result<User, ChatError>;

    async fn set_presence(&self, status: &str) -> Result<(), ChatError>;
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn send(&self, channel_id: &str, message: &OutgoingMessage) -> Result<SentMessage, ChatError> {
        ChatClient::send(self, channel_id, message).await
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        ChatClient::delete_message(self, channel_id, message_id).await
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<(), ChatError> {
        ChatClient::add_reaction(self, channel_id, message_id, emoji).await
    }

    async fn history(&self, channel_id: &str, limit: u32) -> Result<Vec<ChatMessage>, ChatError> {
        ChatClient::history(self, channel_id, limit).await
    }

    async fn list_members(&self, server_id: &str) -> Result<Vec<Member>, ChatError> {
        ChatClient::list_members(self, server_id).await
    }

    async fn set_username(&self, name: &str) -> Result<User, ChatError> {
        ChatClient::set_username(self, name).await
    }

    async fn set_presence(&self, status: &str) -> Result<(), ChatError> {
        ChatClient::set_presence(self, status).await
    }
}
