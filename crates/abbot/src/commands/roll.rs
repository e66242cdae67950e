//! Roll command - rolls dice with a dramatic pause.

use crate::binder::BoundArgs;
use crate::commands::{requested_by, CommandHandler, Invocation, EMBED_COLOUR};
use crate::error::CommandResult;
use crate::format::number_to_words;
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use async_trait::async_trait;
use chat_client::Embed;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

const MAX_DICE: u32 = 20;
const DEFAULT_DICE: (u32, u32) = (1, 6);

pub struct RollCommand {
    pause: Duration,
}

impl RollCommand {
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }
}

/// Parse `NdN` into `(rolls, sides)`. Anything malformed rolls one d6.
pub fn parse_dice(spec: Option<&str>) -> (u32, u32) {
    spec.and_then(|spec| {
        let (rolls, sides) = spec.to_lowercase().split_once('d').map(|(r, s)| {
            (r.parse::<u32>(), s.parse::<u32>())
        })?;
        match (rolls, sides) {
            (Ok(rolls), Ok(sides)) if rolls > 0 && sides > 0 => Some((rolls.min(MAX_DICE), sides)),
            _ => None,
        }
    })
    .unwrap_or(DEFAULT_DICE)
}

#[async_trait]
impl CommandHandler for RollCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_roll")
            .context(ContextSlot::Author)
            .context(ContextSlot::Channel)
            .optional("dice")
            .doc(
                "Usage:
                    {command_prefix}roll [dice]

                Rolls dice written as NdN, e.g. 2d6. Rolls one six-sided die by default.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let author = args.author()?;
        let (rolls, sides) = parse_dice(args.get("dice"));

        let results: Vec<u32> = {
            let mut rng = rand::thread_rng();
            (0..rolls).map(|_| rng.gen_range(1..=sides)).collect()
        };
        debug!(
            "{} rolled {}d{} in {}: {:?}",
            author.name,
            rolls,
            sides,
            args.channel()?.id,
            results
        );

        tokio::time::sleep(self.pause * rolls).await;

        let dice = if rolls == 1 { "die" } else { "dice" };
        let listing = results
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let description = format!(
            "{} has rolled {} {}-sided {}.\n\nThe result is: {}",
            author.mention(),
            number_to_words(rolls.into()),
            sides,
            dice,
            listing
        );

        Ok(Some(Response::embed(
            Embed::new("Dice Roll", description, EMBED_COLOUR).with_footer(requested_by(author)),
        )))
    }
}
