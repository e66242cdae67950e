//! Help command - lists commands or shows one command's usage.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::{code_block, Response};
use async_trait::async_trait;
use std::time::Duration;

pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_help")
            .context(ContextSlot::Permissions)
            .optional("command")
            .doc(
                "Usage:
                    {command_prefix}help [command]

                Prints a help message.
                If a command is specified, it prints a help message for that command.
                Otherwise, it lists the available commands.",
            )
            .build()
    }

    async fn execute(
        &self,
        invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let prefix = invocation.command_prefix;

        if let Some(name) = args.get("command") {
            return match invocation.registry.lookup(name) {
                Some(command) => Ok(Some(
                    Response::text(code_block(&command.descriptor.render_usage(prefix)))
                        .delete_after(Duration::from_secs(60)),
                )),
                None => Err(CommandError::rejected("No such command")),
            };
        }

        let permissions = args.permissions()?;
        let mut names: Vec<String> = invocation
            .registry
            .descriptors()
            .filter(|d| invocation.is_owner || !d.owner_only)
            .filter(|d| permissions.allows(&d.name))
            .map(|d| format!("{}{}", prefix, d.name))
            .collect();
        names.sort();

        Ok(Some(
            Response::text(format!(
                "**Commands**\n{}\nYou can also use `{}help x` for more info about each command.",
                code_block(&names.join(", ")),
                prefix
            ))
            .delete_after(Duration::from_secs(60)),
        ))
    }
}
