//! Choose command - picks one of several comma-separated choices.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{AppError, CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use async_trait::async_trait;
use rand::seq::SliceRandom;

const SEPARATOR: &str = ", ";

pub struct ChooseCommand;

/// Split `text` into choices on `", "`, dropping blanks.
pub(crate) fn split_choices(text: &str) -> Vec<&str> {
    text.split(SEPARATOR)
        .map(str::trim)
        .filter(|choice| !choice.is_empty())
        .collect()
}

#[async_trait]
impl CommandHandler for ChooseCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_choose")
            .context(ContextSlot::LeftoverArgs)
            .param("first")
            .doc(
                "Usage:
                    {command_prefix}choose <choice>, <choice>[, <choice>...]

                Picks one of the given choices. Separate choices with a comma and a space.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let text = args
            .rest_from("first")
            .ok_or(AppError::UnboundSlot("first"))?;
        let choices = split_choices(&text);

        if choices.len() < 2 {
            return Err(CommandError::rejected(
                "You must give two or more choices, separated by a comma and a space.",
            ));
        }

        let choice = choices
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default();

        Ok(Some(Response::text(format!("I choose **{}**", choice)).reply()))
    }
}
