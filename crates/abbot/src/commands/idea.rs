//! Idea command - drops a suggestion into the idea box.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{AppError, CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use usage_store::{UsageKey, UsageStore};

pub struct IdeaCommand {
    store: UsageStore,
}

impl IdeaCommand {
    pub fn new(store: UsageStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandHandler for IdeaCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_idea")
            .context(ContextSlot::Author)
            .context(ContextSlot::Server)
            .context(ContextSlot::Channel)
            .param("text")
            .context(ContextSlot::LeftoverArgs)
            .doc(
                "Usage:
                    {command_prefix}idea <text>

                Submits an idea for the server to the idea box.",
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
            .ok_or_else(|| CommandError::rejected("Ideas can only be submitted in a server."))?;
        let author = args.author()?;
        let text = args.rest_from("text").ok_or(AppError::UnboundSlot("text"))?;

        let key = UsageKey::new(&author.id, server, &args.channel()?.id);
        let id = self.store.insert_idea(&key, &text, Utc::now()).await?;
        info!("Idea #{} from {}: {}", id, author.name, text);

        Ok(Some(
            Response::text(format!(
                "thanks, your idea has been added to the idea box (#{}).",
                id
            ))
            .reply()
            .with_reaction("bulb"),
        ))
    }
}
