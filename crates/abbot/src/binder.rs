//! Argument binding.
//!
//! Contextual slots are filled by identity from the triggering event.
//! Positional slots then consume typed words front to back: an optional slot
//! is skipped once the words run out, a required one is reported missing.
//! Whatever the positional slots leave behind is the `leftover_args` value.

use crate::error::AppError;
use crate::permissions::PermissionProfile;
use crate::registry::{CommandDescriptor, ContextSlot, ParamSlot};
use chat_client::{Channel, ChatMessage, User};
use std::collections::{HashMap, VecDeque};

/// Everything a contextual slot can be filled from.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub message: &'a ChatMessage,
    pub permissions: &'a PermissionProfile,
}

/// Values bound for one invocation. Only declared slots are populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    message: Option<ChatMessage>,
    channel: Option<Channel>,
    author: Option<User>,
    server: Option<Option<String>>,
    permissions: Option<PermissionProfile>,
    user_mentions: Option<Vec<User>>,
    channel_mentions: Option<Vec<String>>,
    voice_channel: Option<Option<String>>,
    leftover_args: Option<Vec<String>>,
    positional: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindOutcome {
    Bound(BoundArgs),
    /// Required slots left without a value, in declaration order.
    MissingRequired(Vec<String>),
}

/// Bind `tokens` (the words after the command name) against `descriptor`.
pub fn bind(descriptor: &CommandDescriptor, ctx: EventContext<'_>, tokens: Vec<String>) -> BindOutcome {
    let mut remaining: VecDeque<String> = tokens.into();
    let mut args = BoundArgs::default();
    let mut missing = Vec::new();

    for slot in &descriptor.slots {
        match slot {
            ParamSlot::Context(_) => {}
            ParamSlot::Optional(name) => {
                if let Some(token) = remaining.pop_front() {
                    args.positional.insert(name.clone(), token);
                }
            }
            ParamSlot::Required(name) => match remaining.pop_front() {
                Some(token) => {
                    args.positional.insert(name.clone(), token);
                }
                None => missing.push(name.clone()),
            },
        }
    }

    if !missing.is_empty() {
        return BindOutcome::MissingRequired(missing);
    }

    let leftover: Vec<String> = remaining.into();
    for slot in &descriptor.slots {
        if let ParamSlot::Context(context) = slot {
            args.fill(*context, ctx, &leftover);
        }
    }

    BindOutcome::Bound(args)
}

impl BoundArgs {
    fn fill(&mut self, slot: ContextSlot, ctx: EventContext<'_>, leftover: &[String]) {
        let message = ctx.message;
        match slot {
            ContextSlot::Message => self.message = Some(message.clone()),
            ContextSlot::Channel => self.channel = Some(message.channel.clone()),
            ContextSlot::Author => self.author = Some(message.author.clone()),
            ContextSlot::Server => self.server = Some(message.server_id.clone()),
            ContextSlot::Permissions => self.permissions = Some(ctx.permissions.clone()),
            ContextSlot::UserMentions => self.user_mentions = Some(message.mentions.clone()),
            ContextSlot::ChannelMentions => {
                self.channel_mentions = Some(message.channel_mentions.clone())
            }
            ContextSlot::VoiceChannel => {
                self.voice_channel = Some(
                    message
                        .member
                        .as_ref()
                        .and_then(|m| m.voice_channel_id.clone()),
                )
            }
            ContextSlot::LeftoverArgs => self.leftover_args = Some(leftover.to_vec()),
        }
    }

    pub fn message(&self) -> Result<&ChatMessage, AppError> {
        self.message.as_ref().ok_or(AppError::UnboundSlot("message"))
    }

    pub fn channel(&self) -> Result<&Channel, AppError> {
        self.channel.as_ref().ok_or(AppError::UnboundSlot("channel"))
    }

    pub fn author(&self) -> Result<&User, AppError> {
        self.author.as_ref().ok_or(AppError::UnboundSlot("author"))
    }

    /// `Ok(None)` in private channels.
    pub fn server(&self) -> Result<Option<&str>, AppError> {
        self.server
            .as_ref()
            .map(|s| s.as_deref())
            .ok_or(AppError::UnboundSlot("server"))
    }

    pub fn permissions(&self) -> Result<&PermissionProfile, AppError> {
        self.permissions
            .as_ref()
            .ok_or(AppError::UnboundSlot("permissions"))
    }

    pub fn user_mentions(&self) -> Result<&[User], AppError> {
        self.user_mentions
            .as_deref()
            .ok_or(AppError::UnboundSlot("user_mentions"))
    }

    pub fn channel_mentions(&self) -> Result<&[String], AppError> {
        self.channel_mentions
            .as_deref()
            .ok_or(AppError::UnboundSlot("channel_mentions"))
    }

    /// `Ok(None)` when the author is not in a voice channel.
    pub fn voice_channel(&self) -> Result<Option<&str>, AppError> {
        self.voice_channel
            .as_ref()
            .map(|v| v.as_deref())
            .ok_or(AppError::UnboundSlot("voice_channel"))
    }

    pub fn leftover_args(&self) -> Result<&[String], AppError> {
        self.leftover_args
            .as_deref()
            .ok_or(AppError::UnboundSlot("leftover_args"))
    }

    /// Text bound to a positional slot; `None` if it was skipped.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.positional.get(name).map(String::as_str)
    }

    /// A positional value followed by the leftover words, space-joined.
    pub fn rest_from(&self, name: &str) -> Option<String> {
        let first = self.get(name)?;
        let mut words = vec![first];
        if let Some(leftover) = &self.leftover_args {
            words.extend(leftover.iter().map(String::as_str));
        }
        Some(words.join(" "))
    }
}
