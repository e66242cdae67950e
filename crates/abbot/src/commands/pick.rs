//! Pick command - draws a random member of the server.

use crate::binder::BoundArgs;
use crate::commands::{requested_by, say, CommandHandler, Invocation, EMBED_COLOUR};
use crate::error::{CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use chat_client::{Embed, User};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

pub struct PickCommand {
    transport: Arc<dyn ChatTransport>,
    pause: Duration,
}

impl PickCommand {
    pub fn new(transport: Arc<dyn ChatTransport>, pause: Duration) -> Self {
        Self { transport, pause }
    }
}

#[async_trait]
impl CommandHandler for PickCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_pick")
            .context(ContextSlot::Server)
            .context(ContextSlot::Channel)
            .context(ContextSlot::Author)
            .doc(
                "Usage:
                    {command_prefix}pick

                Picks a random member of this server.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let server = args
            .server()?
            .ok_or_else(|| CommandError::rejected("This command only works in a server."))?;
        let channel = &args.channel()?.id;
        let author = args.author()?;

        say(self.transport.as_ref(), channel, "Gathering all the people.").await;
        sleep(self.pause).await;

        let candidates: Vec<User> = self
            .transport
            .list_members(server)
            .await?
            .into_iter()
            .filter(|member| !member.user.bot)
            .map(|member| member.user)
            .collect();

        say(
            self.transport.as_ref(),
            channel,
            "Ok, have all the people, let's see who is the lucky winner.",
        )
        .await;
        say(self.transport.as_ref(), channel, "Drumroll please!").await;
        sleep(self.pause).await;

        let winner = candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| CommandError::rejected("There is nobody here to pick."))?;
        info!(
            "{} picked {} out of {} members",
            author.name,
            winner.name,
            candidates.len()
        );

        let description = format!(
            "{} has requested to pick a random user.\n\n{} was chosen!",
            author.mention(),
            winner.mention()
        );

        Ok(Some(Response::embed(
            Embed::new("Random User Pick", description, EMBED_COLOUR)
                .with_footer(requested_by(author)),
        )))
    }
}
