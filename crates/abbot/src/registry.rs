//! Command descriptors and the name-to-handler registry.
//!
//! Every command declares its parameters up front as an ordered list of
//! slots. Contextual slots are filled from the triggering event, the rest
//! are filled from the words typed after the command name.

use crate::commands::CommandHandler;
use crate::error::RegistryError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handler identifiers may carry this prefix; it is not part of the command name.
const HANDLER_PREFIX: &str = "cmd_";

/// Placeholder in documentation replaced by the active command prefix.
const PREFIX_PLACEHOLDER: &str = "{command_prefix}";

/// A parameter filled from the event rather than from typed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSlot {
    Message,
    Channel,
    Author,
    Server,
    Permissions,
    UserMentions,
    ChannelMentions,
    VoiceChannel,
    LeftoverArgs,
}

impl ContextSlot {
    pub const ALL: [ContextSlot; 9] = [
        ContextSlot::Message,
        ContextSlot::Channel,
        ContextSlot::Author,
        ContextSlot::Server,
        ContextSlot::Permissions,
        ContextSlot::UserMentions,
        ContextSlot::ChannelMentions,
        ContextSlot::VoiceChannel,
        ContextSlot::LeftoverArgs,
    ];

    /// Reserved parameter name for this slot.
    pub fn name(&self) -> &'static str {
        match self {
            ContextSlot::Message => "message",
            ContextSlot::Channel => "channel",
            ContextSlot::Author => "author",
            ContextSlot::Server => "server",
            ContextSlot::Permissions => "permissions",
            ContextSlot::UserMentions => "user_mentions",
            ContextSlot::ChannelMentions => "channel_mentions",
            ContextSlot::VoiceChannel => "voice_channel",
            ContextSlot::LeftoverArgs => "leftover_args",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSlot {
    Context(ContextSlot),
    /// Must be supplied by the caller.
    Required(String),
    /// Skipped when no words remain; the handler supplies the default.
    Optional(String),
}

/// Immutable description of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub slots: Vec<ParamSlot>,
    pub doc: String,
    pub owner_only: bool,
}

impl CommandDescriptor {
    /// Start a descriptor. `cmd_` is stripped and the name lower-cased.
    pub fn builder(name: &str) -> DescriptorBuilder {
        DescriptorBuilder {
            descriptor: CommandDescriptor {
                name: normalize_name(name),
                slots: Vec::new(),
                doc: String::new(),
                owner_only: false,
            },
        }
    }

    /// Documentation with the active prefix substituted, trimmed line by line.
    pub fn render_usage(&self, command_prefix: &str) -> String {
        self.doc
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .replace(PREFIX_PLACEHOLDER, command_prefix)
    }
}

pub struct DescriptorBuilder {
    descriptor: CommandDescriptor,
}

impl DescriptorBuilder {
    pub fn context(mut self, slot: ContextSlot) -> Self {
        self.descriptor.slots.push(ParamSlot::Context(slot));
        self
    }

    /// A required positional parameter.
    ///
    /// A name equal to a reserved contextual name (`message`, `channel`,
    /// `author`, ...) declares that contextual slot instead.
    pub fn param(mut self, name: &str) -> Self {
        let slot = match ContextSlot::from_name(name) {
            Some(context) => ParamSlot::Context(context),
            None => ParamSlot::Required(name.to_string()),
        };
        self.descriptor.slots.push(slot);
        self
    }

    /// A positional parameter with a handler-side default. Reserved names
    /// behave as in [`DescriptorBuilder::param`].
    pub fn optional(mut self, name: &str) -> Self {
        let slot = match ContextSlot::from_name(name) {
            Some(context) => ParamSlot::Context(context),
            None => ParamSlot::Optional(name.to_string()),
        };
        self.descriptor.slots.push(slot);
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.descriptor.doc = doc.to_string();
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.descriptor.owner_only = true;
        self
    }

    pub fn build(self) -> CommandDescriptor {
        self.descriptor
    }
}

fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    trimmed
        .strip_prefix(HANDLER_PREFIX)
        .unwrap_or(trimmed)
        .to_lowercase()
}

/// A registered command: its descriptor plus the handler that runs it.
#[derive(Clone)]
pub struct RegisteredCommand {
    pub descriptor: CommandDescriptor,
    pub handler: Arc<dyn CommandHandler>,
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Name-to-command map. Built once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&RegisteredCommand> {
        self.commands.get(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values().map(|c| &c.descriptor)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    commands: HashMap<String, RegisteredCommand>,
}

impl RegistryBuilder {
    /// Register a handler under its descriptor's name.
    pub fn register<H>(mut self, handler: H) -> Result<Self, RegistryError>
    where
        H: CommandHandler + 'static,
    {
        let descriptor = handler.descriptor();
        if descriptor.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.commands.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }

        self.commands.insert(
            descriptor.name.clone(),
            RegisteredCommand {
                descriptor,
                handler: Arc::new(handler),
            },
        );
        Ok(self)
    }

    pub fn build(self) -> CommandRegistry {
        CommandRegistry {
            commands: self.commands,
        }
    }
}
