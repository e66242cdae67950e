//! Id command - tells a user their id.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::CommandResult;
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use async_trait::async_trait;
use std::time::Duration;

pub struct IdCommand;

#[async_trait]
impl CommandHandler for IdCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_id")
            .context(ContextSlot::Author)
            .context(ContextSlot::UserMentions)
            .doc(
                "Usage:
                    {command_prefix}id [@user]

                Tells the user their id or the id of another user.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let text = match args.user_mentions()?.first() {
            Some(user) => format!("**{}**'s id is `{}`", user.name, user.id),
            None => format!("your id is `{}`", args.author()?.id),
        };

        Ok(Some(
            Response::text(text)
                .reply()
                .delete_after(Duration::from_secs(35)),
        ))
    }
}
