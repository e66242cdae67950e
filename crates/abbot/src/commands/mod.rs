//! Bot command handlers.

mod archive;
mod broadcast;
mod choose;
mod clean;
mod event;
mod help;
mod id;
mod idea;
mod joke;
mod pick;
mod roll;
mod setname;
mod usage;
mod whoami;

pub use archive::ArchiveCommand;
pub use broadcast::BroadcastCommand;
pub use choose::ChooseCommand;
pub use clean::CleanCommand;
pub use event::{EventCommand, EventStore, GiftEvent, OptIn, Participant};
pub use help::HelpCommand;
pub use id::IdCommand;
pub use idea::IdeaCommand;
pub use joke::JokeCommand;
pub use pick::PickCommand;
pub use roll::{parse_dice, RollCommand};
pub use setname::SetNameCommand;
pub use usage::UsageCommand;
pub use whoami::WhoAmICommand;

use crate::binder::BoundArgs;
use crate::config::BotConfig;
use crate::error::{CommandResult, RegistryError};
use crate::registry::{CommandDescriptor, CommandRegistry};
use crate::response::Response;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use chat_client::{OutgoingMessage, User};
use forum_client::ForumClient;
use std::sync::Arc;
use tracing::warn;
use usage_store::UsageStore;

/// Colour shared by the bot's embeds.
pub const EMBED_COLOUR: u32 = 0x2e456b;

/// Per-invocation facts that are not arguments.
pub struct Invocation<'a> {
    pub registry: &'a CommandRegistry,
    pub bot_user: &'a User,
    pub command_prefix: &'a str,
    pub is_owner: bool,
}

/// Command handler trait.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Name, declared slots and documentation.
    fn descriptor(&self) -> CommandDescriptor;

    /// Run the command with the arguments bound for its descriptor.
    async fn execute(
        &self,
        invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>>;
}

/// Collaborators the stock commands are built from.
#[derive(Clone)]
pub struct CommandDeps {
    pub transport: Arc<dyn ChatTransport>,
    pub store: UsageStore,
    pub forum: ForumClient,
    pub subreddits: Vec<String>,
    pub events: EventStore,
    pub settings: BotConfig,
}

/// Register every stock command.
pub fn build_registry(deps: &CommandDeps) -> Result<CommandRegistry, RegistryError> {
    let pause = deps.settings.dramatic_pause;

    Ok(CommandRegistry::builder()
        .register(HelpCommand)?
        .register(IdCommand)?
        .register(WhoAmICommand)?
        .register(RollCommand::new(pause))?
        .register(ChooseCommand)?
        .register(PickCommand::new(deps.transport.clone(), pause))?
        .register(IdeaCommand::new(deps.store.clone()))?
        .register(CleanCommand::new(
            deps.transport.clone(),
            deps.settings.delete_invoking,
        ))?
        .register(UsageCommand::new(deps.store.clone()))?
        .register(JokeCommand::new(deps.forum.clone(), deps.subreddits.clone()))?
        .register(EventCommand::new(deps.events.clone()))?
        .register(SetNameCommand::new(deps.transport.clone()))?
        .register(BroadcastCommand::new(
            deps.transport.clone(),
            deps.settings.broadcast_channels.clone(),
        ))?
        .register(ArchiveCommand::new(deps.store.clone()))?
        .build())
}

/// `Requested by name#discriminator`, used as embed footer.
pub(crate) fn requested_by(user: &User) -> String {
    format!("Requested by {}", user.tag())
}

/// Send an interim message, logging rather than failing on errors.
pub(crate) async fn say(transport: &dyn ChatTransport, channel_id: &str, text: &str) {
    if let Err(e) = transport.send(channel_id, &OutgoingMessage::text(text)).await {
        warn!("Failed to send to {}: {}", channel_id, e);
    }
}
