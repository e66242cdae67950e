//! Clean command - removes the bot's recent messages.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{CommandError, CommandResult};
use crate::format::plural;
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_RANGE: u32 = 50;
const MAX_RANGE: u32 = 1000;

pub struct CleanCommand {
    transport: Arc<dyn ChatTransport>,
    delete_invoking: bool,
}

impl CleanCommand {
    pub fn new(transport: Arc<dyn ChatTransport>, delete_invoking: bool) -> Self {
        Self {
            transport,
            delete_invoking,
        }
    }
}

/// Messages to scan: default 50, clamped to `1..=1000`.
pub(crate) fn parse_range(raw: Option<&str>) -> Result<u32, CommandError> {
    match raw {
        None => Ok(DEFAULT_RANGE),
        Some(raw) => raw
            .parse::<i64>()
            .map(|n| n.clamp(1, i64::from(MAX_RANGE)) as u32)
            .map_err(|_| CommandError::rejected("Invalid number. Please use a number between 1 and 1000.")),
    }
}

#[async_trait]
impl CommandHandler for CleanCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_clean")
            .context(ContextSlot::Channel)
            .context(ContextSlot::Author)
            .optional("range")
            .doc(
                "Usage:
                    {command_prefix}clean [range]

                Removes up to [range] messages the bot has posted in this channel. Default: 50, Max: 1000",
            )
            .build()
    }

    async fn execute(
        &self,
        invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let range = parse_range(args.get("range"))?;
        let channel = args.channel()?;
        let author = args.author()?;

        let history = self.transport.history(&channel.id, range).await?;
        let mut deleted = 0i64;

        for message in history {
            let own = message.author.id == invocation.bot_user.id;
            let invoking = self.delete_invoking
                && message.author.id == author.id
                && message.content.starts_with(invocation.command_prefix);

            if !(own || invoking) {
                continue;
            }

            match self.transport.delete_message(&channel.id, &message.id).await {
                Ok(()) => deleted += 1,
                Err(e) => debug!("Could not delete {}: {}", message.id, e),
            }
        }

        info!("Cleaned {} messages in {}", deleted, channel.id);

        Ok(Some(
            Response::text(format!("Cleaned up {}.", plural(deleted, "message")))
                .delete_after(Duration::from_secs(15)),
        ))
    }
}
