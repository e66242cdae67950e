//! Broadcast command - posts a message to every broadcast channel.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{AppError, CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use chat_client::OutgoingMessage;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

pub struct BroadcastCommand {
    transport: Arc<dyn ChatTransport>,
    channels: Vec<String>,
}

impl BroadcastCommand {
    pub fn new(transport: Arc<dyn ChatTransport>, channels: Vec<String>) -> Self {
        Self {
            transport,
            channels,
        }
    }
}

#[async_trait]
impl CommandHandler for BroadcastCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_broadcast")
            .param("text")
            .context(ContextSlot::LeftoverArgs)
            .owner_only()
            .doc(
                "Usage:
                    {command_prefix}broadcast <text>

                Sends a message to every configured broadcast channel.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        if self.channels.is_empty() {
            return Err(CommandError::rejected("No broadcast channels are configured."));
        }

        let text = args.rest_from("text").ok_or(AppError::UnboundSlot("text"))?;
        let outgoing = OutgoingMessage::text(text);

        let results = join_all(
            self.channels
                .iter()
                .map(|channel| self.transport.send(channel, &outgoing)),
        )
        .await;

        let mut delivered = 0;
        for (channel, result) in self.channels.iter().zip(results) {
            match result {
                Ok(_) => delivered += 1,
                Err(e) => warn!("Broadcast to {} failed: {}", channel, e),
            }
        }
        info!("Broadcast delivered to {}/{} channels", delivered, self.channels.len());

        Ok(Some(Response::text(format!(
            "Broadcast sent to {} of {} channels.",
            delivered,
            self.channels.len()
        ))))
    }
}
