//! Chat gateway HTTP client.

use crate::error::ChatError;
use crate::types::*;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// REST client for the chat gateway bridge.
///
/// The bot token is held as a `SecretString` so it never ends up in
/// debug output.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl ChatClient {
    /// Create a new chat client.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: SecretString::new(token.into()),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(
            "Authorization",
            format!("Bot {}", self.token.expose_secret()),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if the gateway bridge is reachable.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(self.url("/v1/health"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// The account the token belongs to.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ChatError> {
        let response = self
            .authorized(self.client.get(self.url("/v1/users/@me")))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Drain pending gateway events.
    #[instrument(skip(self))]
    pub async fn receive(&self) -> Result<Vec<IncomingEvent>, ChatError> {
        let response = self
            .authorized(self.client.get(self.url("/v1/events")))
            .send()
            .await?;

        let events: Vec<IncomingEvent> = check(response).await?.json().await?;
        debug!("Received {} events", events.len());
        Ok(events)
    }

    /// Post a message to a channel.
    #[instrument(skip(self, message))]
    pub async fn send(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, ChatError> {
        let response = self
            .authorized(
                self.client
                    .post(self.url(&format!("/v1/channels/{}/messages", encode(channel_id)))),
            )
            .json(message)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let sent: SentMessage = response.json().await?;
                debug!("Sent message {} to {}", sent.id, channel_id);
                Ok(sent)
            }
            StatusCode::FORBIDDEN => {
                warn!("Cannot send to {}: forbidden", channel_id);
                Err(ChatError::Forbidden(channel_id.to_string()))
            }
            _ => {
                let msg = response.text().await.unwrap_or_default();
                warn!("Send failed: {}", msg);
                Err(ChatError::SendFailed(msg))
            }
        }
    }

    /// Delete a message.
    #[instrument(skip(self))]
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let response = self
            .authorized(self.client.delete(self.url(&format!(
                "/v1/channels/{}/messages/{}",
                encode(channel_id),
                encode(message_id)
            ))))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// React to a message with an emoji.
    #[instrument(skip(self))]
    pub async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), ChatError> {
        let response = self
            .authorized(self.client.put(self.url(&format!(
                "/v1/channels/{}/messages/{}/reactions/{}",
                encode(channel_id),
                encode(message_id),
                encode(emoji)
            ))))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Most recent messages in a channel, newest first.
    #[instrument(skip(self))]
    pub async fn history(&self, channel_id: &str, limit: u32) -> Result<Vec<ChatMessage>, ChatError> {
        let response = self
            .authorized(
                self.client
                    .get(self.url(&format!("/v1/channels/{}/messages", encode(channel_id))))
                    .query(&[("limit", limit)]),
            )
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Members of a server.
    #[instrument(skip(self))]
    pub async fn list_members(&self, server_id: &str) -> Result<Vec<Member>, ChatError> {
        let response = self
            .authorized(
                self.client
                    .get(self.url(&format!("/v1/servers/{}/members", encode(server_id)))),
            )
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Change the bot's account name.
    #[instrument(skip(self))]
    pub async fn set_username(&self, name: &str) -> Result<User, ChatError> {
        let response = self
            .authorized(self.client.patch(self.url("/v1/users/@me")))
            .json(&UpdateUserRequest { username: name })
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Set the bot's presence text.
    #[instrument(skip(self))]
    pub async fn set_presence(&self, status: &str) -> Result<(), ChatError> {
        let response = self
            .authorized(self.client.patch(self.url("/v1/presence")))
            .json(&PresenceRequest { status })
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

/// Map non-success statuses onto `ChatError`.
async fn check(response: Response) -> Result<Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::FORBIDDEN => ChatError::Forbidden(message),
        StatusCode::NOT_FOUND => ChatError::NotFound(message),
        _ => ChatError::Api {
            status: status.as_u16(),
            message,
        },
    })
}
