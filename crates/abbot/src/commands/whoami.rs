//! Whoami command - shows what the server knows about the caller.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use async_trait::async_trait;

pub struct WhoAmICommand;

#[async_trait]
impl CommandHandler for WhoAmICommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_whoami")
            .context(ContextSlot::Author)
            .context(ContextSlot::Message)
            .doc(
                "Usage:
                    {command_prefix}whoami

                Shows your roles, nickname, voice channel and join date.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let author = args.author()?;
        let member = args
            .message()?
            .member
            .as_ref()
            .ok_or_else(|| CommandError::rejected("This only works in a server."))?;

        let roles = if member.roles.is_empty() {
            "none".to_string()
        } else {
            member.roles.join(", ")
        };
        let top_role = member.roles.first().map(String::as_str).unwrap_or("none");
        let voice = member
            .voice_channel_id
            .as_ref()
            .map(|id| format!("<#{}>", id))
            .unwrap_or_else(|| "not connected".into());
        let joined = member
            .joined_at
            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown".into());

        Ok(Some(Response::text(format!(
            "{}:\n\tRoles: {}\n\tTop Role: {}\n\tNickname: {}\n\tVoice: {}\n\tJoined: {}",
            author.mention(),
            roles,
            top_role,
            member.display_name(),
            voice,
            joined
        ))))
    }
}
