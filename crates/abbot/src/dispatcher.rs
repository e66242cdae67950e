//! Event dispatch.
//!
//! A chat message moves through
//! `Idle -> PrefixChecked -> BlacklistChecked -> PermissionChecked -> ArgsBound -> Invoked -> Responded`,
//! and may leave at any step. Every way out is reported as a [`DispatchOutcome`].

use crate::binder::{bind, BindOutcome, EventContext};
use crate::commands::Invocation;
use crate::config::BotConfig;
use crate::error::CommandError;
use crate::permissions::{Blacklist, PermissionProfile, PermissionResolver};
use crate::registry::{CommandDescriptor, CommandRegistry};
use crate::response::{code_block, Response};
use crate::transport::ChatTransport;
use chat_client::{ChatMessage, IncomingEvent, OutgoingMessage, ReactionEvent, SentMessage, User};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use usage_store::{MentionCounts, MessageDelta, ReactionCounts, UsageKey, UsageStore};

/// Commands the owner may run in private channels.
pub const PRIVATE_COMMANDS: [&str; 4] = ["help", "id", "setname", "broadcast"];

/// Command name tallied for blacklisted callers.
pub const BLACKLISTED_COMMAND: &str = "blacklisted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    PrefixChecked,
    BlacklistChecked,
    PermissionChecked,
    ArgsBound,
    Invoked,
    Responded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The bot's own message.
    OwnMessage,
    /// Not a command. `replied` when it triggered a chatter reply.
    Chatter { replied: bool },
    UnknownCommand(String),
    /// Command used outside the bound channels.
    UnboundChannel,
    PrivateDenied,
    Blacklisted,
    PermissionDenied,
    UsageShown,
    Rejected,
    /// Handler ran and a response was sent.
    Responded,
    /// Handler ran and had nothing to say.
    NoResponse,
    /// Handler failed unexpectedly.
    Failed,
}

/// Shared collaborators of the dispatcher.
pub struct AppContext {
    pub transport: Arc<dyn ChatTransport>,
    pub store: UsageStore,
    pub permissions: PermissionResolver,
    pub blacklist: Blacklist,
    pub settings: BotConfig,
}

struct Identity {
    user: User,
    praise: Option<Regex>,
}

impl Identity {
    fn new(user: User) -> Self {
        let pattern = format!(r"(?i)^Good (boy|bot|stuff) {}", regex::escape(&user.name));
        let praise = match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Cannot match praise for {}: {}", user.name, e);
                None
            }
        };
        Self { user, praise }
    }
}

/// Canned reply to a plain message, if it is one the bot answers.
pub fn chatter_reply(content: &str, author: &User, praise: Option<&Regex>) -> Option<String> {
    if content.starts_with("Hello there") {
        return Some(format!("Oh hi there.  How are you, {}?", author.mention()));
    }
    if content.starts_with("What are we going to do tonight?") {
        return Some(format!(
            "The same thing we do every night, {}. Try to take over the world.",
            author.mention()
        ));
    }
    if praise.map_or(false, |re| re.is_match(content)) {
        return Some("Why, thank you. :blush:".into());
    }
    None
}

pub struct Dispatcher {
    app: Arc<AppContext>,
    registry: Arc<CommandRegistry>,
    identity: RwLock<Identity>,
}

impl Dispatcher {
    pub fn new(app: AppContext, registry: CommandRegistry, bot_user: User) -> Self {
        Self {
            app: Arc::new(app),
            registry: Arc::new(registry),
            identity: RwLock::new(Identity::new(bot_user)),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub async fn bot_user(&self) -> User {
        self.identity.read().await.user.clone()
    }

    pub async fn handle_event(&self, event: IncomingEvent) {
        match event {
            IncomingEvent::Ready { user } => self.handle_ready(user).await,
            IncomingEvent::MessageCreate(message) => {
                let outcome = self.handle_message(&message).await;
                debug!("Message {} dispatched: {:?}", message.id, outcome);
            }
            IncomingEvent::ReactionAdd(reaction) => self.handle_reaction_add(&reaction).await,
            IncomingEvent::ReactionRemove(reaction) => {
                debug!(
                    "Reaction {} removed by {} from {}",
                    reaction.emoji, reaction.user_id, reaction.message_id
                );
            }
            IncomingEvent::MemberJoin { server_id, member } => {
                info!("{} joined server {}", member.user.tag(), server_id);
            }
            IncomingEvent::MemberLeave { server_id, user } => {
                info!("{} left server {}", user.tag(), server_id);
            }
        }
    }

    async fn handle_ready(&self, user: User) {
        info!("Connected as {} ({})", user.tag(), user.id);
        let name = user.name.clone();
        *self.identity.write().await = Identity::new(user);

        let settings = &self.app.settings;
        if let Err(e) = self.app.transport.set_presence(&settings.status).await {
            warn!("Failed to set presence: {}", e);
        }

        if let Some(channel) = &settings.announce_channel {
            let text = format!(
                "OK.  OK.  OK.  {} has arrived.  Let the games begin!",
                name
            );
            self.send(channel, &OutgoingMessage::text(text)).await;
        }
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn handle_message(&self, message: &ChatMessage) -> DispatchOutcome {
        debug!("{:?}: message from {}", DispatchState::Idle, message.author.tag());
        let bot_user = self.bot_user().await;
        if message.author.id == bot_user.id {
            return DispatchOutcome::OwnMessage;
        }

        let settings = &self.app.settings;
        let Some(body) = message.content.strip_prefix(settings.command_prefix.as_str()) else {
            return self.handle_plain(message).await;
        };
        let mut words = body.split_whitespace();
        let Some(name) = words.next().map(str::to_lowercase) else {
            return self.handle_plain(message).await;
        };
        let tokens: Vec<String> = words.map(String::from).collect();
        debug!("{:?}: {}{}", DispatchState::PrefixChecked, settings.command_prefix, name);

        let Some(command) = self.registry.lookup(&name) else {
            self.record_command(message, &name, false).await;
            return DispatchOutcome::UnknownCommand(name);
        };
        let descriptor = &command.descriptor;

        let private = message.channel.is_private();
        let is_owner = self.app.permissions.is_owner(&message.author.id);

        if !private
            && !settings.bound_channels.is_empty()
            && !settings.bound_channels.contains(&message.channel.id)
        {
            debug!("Ignoring {} outside bound channels", name);
            return DispatchOutcome::UnboundChannel;
        }

        if private && !(is_owner && PRIVATE_COMMANDS.contains(&name.as_str())) {
            self.send(
                &message.channel.id,
                &OutgoingMessage::text("You cannot use this command in private messages."),
            )
            .await;
            return DispatchOutcome::PrivateDenied;
        }

        if !is_owner && self.app.blacklist.contains(&message.author.id) {
            warn!("Blacklisted user {} tried {}", message.author.tag(), name);
            self.record_command(message, BLACKLISTED_COMMAND, false).await;
            return DispatchOutcome::Blacklisted;
        }
        debug!("{:?}", DispatchState::BlacklistChecked);

        let roles = message
            .member
            .as_ref()
            .map(|m| m.roles.as_slice())
            .unwrap_or_default();
        let profile = self.app.permissions.resolve(&message.author.id, roles);

        if let Err(denied) = self.check_permissions(descriptor, message, &profile, is_owner) {
            info!(
                "{} denied {} ({})",
                message.author.tag(),
                name,
                profile.name
            );
            self.record_command(message, &name, false).await;
            self.send_error(message, &denied).await;
            return DispatchOutcome::PermissionDenied;
        }
        debug!("{:?}: group {}", DispatchState::PermissionChecked, profile.name);

        let ctx = EventContext {
            message,
            permissions: &profile,
        };
        let args = match bind(descriptor, ctx, tokens) {
            BindOutcome::Bound(args) => args,
            BindOutcome::MissingRequired(missing) => {
                debug!("{} missing {:?}", name, missing);
                self.record_command(message, &name, false).await;
                let usage = CommandError::usage(descriptor.render_usage(&settings.command_prefix));
                self.send_error(message, &usage).await;
                return DispatchOutcome::UsageShown;
            }
        };
        self.record_command(message, &name, true).await;
        debug!("{:?}", DispatchState::ArgsBound);

        let invocation = Invocation {
            registry: &self.registry,
            bot_user: &bot_user,
            command_prefix: &settings.command_prefix,
            is_owner,
        };
        let result = command.handler.execute(&invocation, args).await;
        debug!("{:?}", DispatchState::Invoked);

        match result {
            Ok(Some(response)) => {
                self.send_response(message, response).await;
                debug!("{:?}", DispatchState::Responded);
                DispatchOutcome::Responded
            }
            Ok(None) => DispatchOutcome::NoResponse,
            Err(CommandError::Internal(e)) => {
                error!("Command {} failed: {}", name, e);
                if settings.debug_mode {
                    let text = code_block(&format!("{:?}", e));
                    self.send(&message.channel.id, &OutgoingMessage::text(text))
                        .await;
                }
                DispatchOutcome::Failed
            }
            Err(err) => {
                self.send_error(message, &err).await;
                match err {
                    CommandError::PermissionDenied { .. } => DispatchOutcome::PermissionDenied,
                    CommandError::Usage { .. } => DispatchOutcome::UsageShown,
                    _ => DispatchOutcome::Rejected,
                }
            }
        }
    }

    fn check_permissions(
        &self,
        descriptor: &CommandDescriptor,
        message: &ChatMessage,
        profile: &PermissionProfile,
        is_owner: bool,
    ) -> Result<(), CommandError> {
        if is_owner {
            return Ok(());
        }
        if descriptor.owner_only {
            return Err(CommandError::permission("Only the owner can use this command."));
        }
        profile.check(&descriptor.name).map_err(CommandError::permission)?;

        let in_voice = message
            .member
            .as_ref()
            .map_or(false, |m| m.voice_channel_id.is_some());
        if profile.requires_voice(&descriptor.name) && !in_voice {
            return Err(CommandError::permission(
                "You cannot use this command when not in a voice channel.",
            ));
        }

        Ok(())
    }

    async fn handle_plain(&self, message: &ChatMessage) -> DispatchOutcome {
        self.record_message(message).await;

        let reply = {
            let identity = self.identity.read().await;
            chatter_reply(&message.content, &message.author, identity.praise.as_ref())
        };
        match reply {
            Some(text) => {
                self.send(&message.channel.id, &OutgoingMessage::text(text))
                    .await;
                DispatchOutcome::Chatter { replied: true }
            }
            None => DispatchOutcome::Chatter { replied: false },
        }
    }

    /// Usage key for a message, `None` in private channels.
    fn usage_key(message: &ChatMessage) -> Option<UsageKey> {
        if message.channel.is_private() {
            return None;
        }
        let server = message.server_id.as_deref()?;
        Some(UsageKey::new(&message.author.id, server, &message.channel.id))
    }

    async fn record_message(&self, message: &ChatMessage) {
        let Some(key) = Self::usage_key(message) else {
            return;
        };
        let store = &self.app.store;

        let delta = MessageDelta::from_text(&message.content, message.timestamp);
        if let Err(e) = store.record_message(&key, &delta).await {
            warn!("Failed to record message usage: {}", e);
        }

        let mentioned: HashSet<&str> = message
            .mentions
            .iter()
            .map(|u| u.id.as_str())
            .filter(|id| *id != message.author.id)
            .collect();
        let made = MentionCounts {
            user_mentions: mentioned.len() as i64,
            user_mentioned: 0,
            channel_mentions: message.channel_mentions.len() as i64,
            role_mentions: message.role_mentions.len() as i64,
        };
        if made.is_zero() {
            return;
        }
        if let Err(e) = store.record_mentions(&key, &made).await {
            warn!("Failed to record mentions: {}", e);
        }

        let received = MentionCounts {
            user_mentioned: 1,
            ..Default::default()
        };
        for user in mentioned {
            if let Err(e) = store.record_mentions(&key.for_user(user), &received).await {
                warn!("Failed to record mention of {}: {}", user, e);
            }
        }
    }

    async fn record_command(&self, message: &ChatMessage, name: &str, valid: bool) {
        let Some(key) = Self::usage_key(message) else {
            return;
        };
        if let Err(e) = self.app.store.record_command(&key, name, valid).await {
            warn!("Failed to record command usage: {}", e);
        }
    }

    pub async fn handle_reaction_add(&self, reaction: &ReactionEvent) {
        let Some(server) = reaction.server_id.as_deref() else {
            return;
        };
        if reaction.user_id == self.bot_user().await.id {
            return;
        }
        let store = &self.app.store;

        let given = ReactionCounts {
            user_reacted: 1,
            messages_reacted: i64::from(reaction.user_reaction_count == 1),
            ..Default::default()
        };
        let reactor = UsageKey::new(&reaction.user_id, server, &reaction.channel_id);
        if let Err(e) = store.record_reactions(&reactor, &given).await {
            warn!("Failed to record reaction: {}", e);
        }

        if reaction.message_author_id == reaction.user_id {
            return;
        }
        let received = ReactionCounts {
            reactions_received: 1,
            message_reactions_received: i64::from(reaction.message_reaction_count == 1),
            ..Default::default()
        };
        let author = reactor.for_user(&reaction.message_author_id);
        if let Err(e) = store.record_reactions(&author, &received).await {
            warn!("Failed to record received reaction: {}", e);
        }
    }

    async fn send(&self, channel_id: &str, outgoing: &OutgoingMessage) -> Option<SentMessage> {
        match self.app.transport.send(channel_id, outgoing).await {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!("Failed to send to {}: {}", channel_id, e);
                None
            }
        }
    }

    async fn send_response(&self, message: &ChatMessage, response: Response) {
        let settings = &self.app.settings;
        let outgoing = response.to_outgoing(&message.author);
        let Some(sent) = self.send(&message.channel.id, &outgoing).await else {
            return;
        };

        for emoji in &response.reactions {
            if let Err(e) = self
                .app
                .transport
                .add_reaction(&sent.channel_id, &sent.id, emoji)
                .await
            {
                debug!("Failed to react with {}: {}", emoji, e);
            }
        }

        if !settings.delete_messages {
            return;
        }
        if let Some(after) = response.delete_after {
            self.delete_later(sent.channel_id, sent.id, after);
            if settings.delete_invoking {
                self.delete_later(message.channel.id.clone(), message.id.clone(), after);
            }
        }
    }

    async fn send_error(&self, message: &ChatMessage, err: &CommandError) {
        let settings = &self.app.settings;
        let outgoing = OutgoingMessage::text(code_block(&err.to_string()));
        let Some(sent) = self.send(&message.channel.id, &outgoing).await else {
            return;
        };

        if !settings.delete_messages {
            return;
        }
        if let Some(after) = err.expire_in() {
            self.delete_later(sent.channel_id, sent.id, after);
            if settings.delete_invoking {
                self.delete_later(message.channel.id.clone(), message.id.clone(), after);
            }
        }
    }

    fn delete_later(&self, channel_id: String, message_id: String, after: Duration) {
        let transport = self.app.transport.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(e) = transport.delete_message(&channel_id, &message_id).await {
                debug!("Could not delete {}: {}", message_id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BoundArgs;
    use crate::commands::{
        ChooseCommand, CommandHandler, HelpCommand, RollCommand, SetNameCommand,
    };
    use crate::config::GroupConfig;
    use crate::error::{AppError, CommandResult};
    use crate::test_support::{
        alice, bot_user, message_from, owner, private_message, temp_store, text_message, user,
        OWNER_ID,
    };
    use crate::transport::MockChatTransport;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use usage_store::{CommandMetric, UsageScope};

    struct Broken;

    #[async_trait]
    impl CommandHandler for Broken {
        fn descriptor(&self) -> CommandDescriptor {
            CommandDescriptor::builder("broken").doc("Usage:\n    {command_prefix}broken").build()
        }

        async fn execute(
            &self,
            _invocation: &Invocation<'_>,
            _args: BoundArgs,
        ) -> CommandResult<Option<Response>> {
            Err(AppError::UnboundSlot("author").into())
        }
    }

    /// Replies with a reaction and a short expiry.
    struct Fleeting;

    const FLEETING_EXPIRY: Duration = Duration::from_millis(10);

    #[async_trait]
    impl CommandHandler for Fleeting {
        fn descriptor(&self) -> CommandDescriptor {
            CommandDescriptor::builder("fleeting").doc("Usage:\n    {command_prefix}fleeting").build()
        }

        async fn execute(
            &self,
            _invocation: &Invocation<'_>,
            _args: BoundArgs,
        ) -> CommandResult<Option<Response>> {
            Ok(Some(
                Response::text("hi")
                    .with_reaction("tada")
                    .delete_after(FLEETING_EXPIRY),
            ))
        }
    }

    type Sent = Arc<Mutex<Vec<(String, OutgoingMessage)>>>;

    /// Transport that records sends and accepts everything else.
    fn recording_transport() -> (MockChatTransport, Sent) {
        let sent: Sent = Arc::new(Mutex::new(Vec::new()));
        let mut transport = MockChatTransport::new();

        let log = sent.clone();
        transport.expect_send().returning(move |channel, message| {
            log.lock()
                .unwrap()
                .push((channel.to_string(), message.clone()));
            Ok(SentMessage {
                id: "reply".into(),
                channel_id: channel.to_string(),
            })
        });
        transport.expect_delete_message().returning(|_, _| Ok(()));
        transport.expect_add_reaction().returning(|_, _, _| Ok(()));
        transport.expect_set_presence().returning(|_| Ok(()));
        transport.expect_set_username().returning(|name| {
            let mut user = bot_user();
            user.name = name.to_string();
            Ok(user)
        });

        (transport, sent)
    }

    struct Harness {
        dispatcher: Dispatcher,
        store: UsageStore,
        sent: Sent,
        _dir: TempDir,
    }

    async fn harness_with(
        configure: impl FnOnce(&mut BotConfig),
        groups: HashMap<String, GroupConfig>,
        blacklist: Blacklist,
    ) -> Harness {
        let (transport, sent) = recording_transport();
        harness_on(transport, sent, configure, groups, blacklist).await
    }

    async fn harness_on(
        transport: MockChatTransport,
        sent: Sent,
        configure: impl FnOnce(&mut BotConfig),
        groups: HashMap<String, GroupConfig>,
        blacklist: Blacklist,
    ) -> Harness {
        let (dir, store) = temp_store().await;
        let transport: Arc<dyn ChatTransport> = Arc::new(transport);

        let mut settings = BotConfig::default();
        settings.dramatic_pause = Duration::ZERO;
        configure(&mut settings);

        let registry = CommandRegistry::builder()
            .register(HelpCommand)
            .unwrap()
            .register(ChooseCommand)
            .unwrap()
            .register(RollCommand::new(Duration::ZERO))
            .unwrap()
            .register(SetNameCommand::new(transport.clone()))
            .unwrap()
            .register(Broken)
            .unwrap()
            .register(Fleeting)
            .unwrap()
            .build();

        let app = AppContext {
            transport,
            store: store.clone(),
            permissions: PermissionResolver::new(OWNER_ID, &groups),
            blacklist,
            settings,
        };

        Harness {
            dispatcher: Dispatcher::new(app, registry, bot_user()),
            store,
            sent,
            _dir: dir,
        }
    }

    async fn harness() -> Harness {
        harness_with(|_| {}, HashMap::new(), Blacklist::default()).await
    }

    impl Harness {
        fn sent_texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(_, m)| m.content.clone())
                .collect()
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        async fn commands(&self, user_id: &str, valid: bool) -> i64 {
            let scope = UsageScope::default().user(user_id).server("s1");
            let counts = self.store.command_usage(&scope).await.unwrap();
            if valid {
                counts.valid
            } else {
                counts.invalid
            }
        }
    }

    #[tokio::test]
    async fn test_roll_end_to_end() {
        let h = harness().await;

        let outcome = h.dispatcher.handle_message(&text_message("?roll 2d6")).await;

        assert_eq!(outcome, DispatchOutcome::Responded);
        let sent = h.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let embed = sent[0].1.embed.clone().unwrap();
        assert!(embed.description.contains("has rolled two 6-sided dice"));
        assert_eq!(h.commands("100001", true).await, 1);
    }

    #[tokio::test]
    async fn test_choose_rejection_in_code_block() {
        let h = harness().await;

        let outcome = h
            .dispatcher
            .handle_message(&text_message("?choose red,green"))
            .await;

        assert_eq!(outcome, DispatchOutcome::Rejected);
        let texts = h.sent_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("```\n"));
        assert!(texts[0].contains("two or more choices"));
    }

    #[tokio::test]
    async fn test_blacklisted_caller_is_silent() {
        let h = harness_with(|_| {}, HashMap::new(), Blacklist::new(["100001"])).await;

        let outcome = h.dispatcher.handle_message(&text_message("?roll")).await;

        assert_eq!(outcome, DispatchOutcome::Blacklisted);
        assert_eq!(h.sent_count(), 0);
        let scope = UsageScope::default().user("100001").server("s1");
        let ranked = h
            .store
            .rank(CommandMetric::Invalid, "s1", None, 5)
            .await
            .unwrap();
        assert_eq!(ranked[0].user, "100001");
        assert_eq!(
            h.store.favourite_command(&scope).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_owner_bypasses_group_restrictions() {
        let mut groups = HashMap::new();
        groups.insert(
            "Default".to_string(),
            GroupConfig {
                command_whitelist: vec!["help".into()],
                ..Default::default()
            },
        );
        let h = harness_with(|_| {}, groups, Blacklist::new([OWNER_ID])).await;

        let outcome = h
            .dispatcher
            .handle_message(&message_from(owner(), "?setname Brother Abbot"))
            .await;

        assert_eq!(outcome, DispatchOutcome::Responded);
        assert!(h.sent_texts()[0].contains("**Brother Abbot**"));
    }

    #[tokio::test]
    async fn test_owner_only_denied_for_others() {
        let h = harness().await;

        let outcome = h
            .dispatcher
            .handle_message(&text_message("?setname Impostor"))
            .await;

        assert_eq!(outcome, DispatchOutcome::PermissionDenied);
        assert!(h.sent_texts()[0].contains("Only the owner can use this command."));
        assert_eq!(h.commands("100001", false).await, 1);
    }

    #[tokio::test]
    async fn test_group_whitelist_and_blacklist() {
        let mut groups = HashMap::new();
        groups.insert(
            "Default".to_string(),
            GroupConfig {
                command_whitelist: vec!["help".into(), "roll".into()],
                command_blacklist: vec!["roll".into()],
                ..Default::default()
            },
        );
        let h = harness_with(|_| {}, groups, Blacklist::default()).await;

        assert_eq!(
            h.dispatcher.handle_message(&text_message("?roll")).await,
            DispatchOutcome::PermissionDenied
        );
        assert_eq!(
            h.dispatcher.handle_message(&text_message("?choose a, b")).await,
            DispatchOutcome::PermissionDenied
        );

        let texts = h.sent_texts();
        assert!(texts[0].contains("This command is disabled for your group (Default)."));
        assert!(texts[1].contains("This command is not enabled for your group (Default)."));
    }

    #[tokio::test]
    async fn test_voice_requirement() {
        let mut groups = HashMap::new();
        groups.insert(
            "Default".to_string(),
            GroupConfig {
                ignore_non_voice: vec!["roll".into()],
                ..Default::default()
            },
        );
        let h = harness_with(|_| {}, groups, Blacklist::default()).await;

        assert_eq!(
            h.dispatcher.handle_message(&text_message("?roll")).await,
            DispatchOutcome::PermissionDenied
        );

        let mut in_voice = text_message("?roll");
        if let Some(member) = in_voice.member.as_mut() {
            member.voice_channel_id = Some("v1".into());
        }
        assert_eq!(
            h.dispatcher.handle_message(&in_voice).await,
            DispatchOutcome::Responded
        );
    }

    #[tokio::test]
    async fn test_unknown_command_tallied_invalid() {
        let h = harness().await;

        let outcome = h.dispatcher.handle_message(&text_message("?dance")).await;

        assert_eq!(outcome, DispatchOutcome::UnknownCommand("dance".into()));
        assert_eq!(h.sent_count(), 0);
        assert_eq!(h.commands("100001", false).await, 1);
    }

    #[tokio::test]
    async fn test_missing_argument_shows_usage() {
        let h = harness_with(
            |settings| settings.command_prefix = "!".into(),
            HashMap::new(),
            Blacklist::default(),
        )
        .await;

        let outcome = h.dispatcher.handle_message(&text_message("!choose")).await;

        assert_eq!(outcome, DispatchOutcome::UsageShown);
        let texts = h.sent_texts();
        assert!(texts[0].starts_with("```\nUsage:\n!choose"));
    }

    #[tokio::test]
    async fn test_plain_message_usage_and_mentions() {
        let h = harness().await;

        let mut message = text_message("nice one <@100002> https://example.com");
        message.mentions = vec![user("100002", "bob"), alice()];

        let outcome = h.dispatcher.handle_message(&message).await;

        assert_eq!(outcome, DispatchOutcome::Chatter { replied: false });
        assert_eq!(h.sent_count(), 0);

        let alice_scope = UsageScope::default().user("100001").server("s1");
        let usage = h.store.message_usage(&alice_scope).await.unwrap().unwrap();
        assert_eq!(usage.message_count, 1);
        assert_eq!(usage.word_count, 4);
        assert_eq!(usage.url_count, 1);

        let made = h.store.mention_usage(&alice_scope).await.unwrap().unwrap();
        assert_eq!(made.user_mentions, 1);
        let bob_scope = UsageScope::default().user("100002").server("s1");
        let received = h.store.mention_usage(&bob_scope).await.unwrap().unwrap();
        assert_eq!(received.user_mentioned, 1);
    }

    #[tokio::test]
    async fn test_chatter_replies() {
        let h = harness().await;

        for content in [
            "Hello there",
            "What are we going to do tonight?",
            "good BOT Abbot",
        ] {
            let outcome = h.dispatcher.handle_message(&text_message(content)).await;
            assert_eq!(outcome, DispatchOutcome::Chatter { replied: true });
        }

        assert_eq!(
            h.sent_texts(),
            vec![
                "Oh hi there.  How are you, <@100001>?".to_string(),
                "The same thing we do every night, <@100001>. Try to take over the world."
                    .to_string(),
                "Why, thank you. :blush:".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_own_messages_ignored() {
        let h = harness().await;

        let outcome = h
            .dispatcher
            .handle_message(&message_from(bot_user(), "Hello there"))
            .await;

        assert_eq!(outcome, DispatchOutcome::OwnMessage);
        assert_eq!(h.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_private_channel_rules() {
        let h = harness().await;

        assert_eq!(
            h.dispatcher
                .handle_message(&private_message(alice(), "?help"))
                .await,
            DispatchOutcome::PrivateDenied
        );
        assert_eq!(
            h.dispatcher
                .handle_message(&private_message(owner(), "?roll"))
                .await,
            DispatchOutcome::PrivateDenied
        );
        assert_eq!(
            h.dispatcher
                .handle_message(&private_message(owner(), "?help"))
                .await,
            DispatchOutcome::Responded
        );
        assert!(h.sent_texts()[0].contains("You cannot use this command in private messages."));
    }

    #[tokio::test]
    async fn test_bound_channels() {
        let h = harness_with(
            |settings| settings.bound_channels = vec!["bot-spam".into()],
            HashMap::new(),
            Blacklist::default(),
        )
        .await;

        assert_eq!(
            h.dispatcher.handle_message(&text_message("?roll")).await,
            DispatchOutcome::UnboundChannel
        );
        assert_eq!(h.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_internal_error_echoed_only_in_debug_mode() {
        let quiet = harness().await;
        assert_eq!(
            quiet.dispatcher.handle_message(&text_message("?broken")).await,
            DispatchOutcome::Failed
        );
        assert_eq!(quiet.sent_count(), 0);

        let loud = harness_with(
            |settings| settings.debug_mode = true,
            HashMap::new(),
            Blacklist::default(),
        )
        .await;
        assert_eq!(
            loud.dispatcher.handle_message(&text_message("?broken")).await,
            DispatchOutcome::Failed
        );
        assert!(loud.sent_texts()[0].contains("UnboundSlot"));
    }

    type Calls = Arc<Mutex<Vec<String>>>;

    /// Transport that logs reactions and deletions, expecting exactly
    /// `reactions` and `deletions` of them.
    fn cleanup_transport(reactions: usize, deletions: usize) -> (MockChatTransport, Sent, Calls) {
        let sent: Sent = Arc::new(Mutex::new(Vec::new()));
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut transport = MockChatTransport::new();

        let log = sent.clone();
        transport.expect_send().returning(move |channel, message| {
            log.lock()
                .unwrap()
                .push((channel.to_string(), message.clone()));
            Ok(SentMessage {
                id: "reply".into(),
                channel_id: channel.to_string(),
            })
        });
        let log = calls.clone();
        transport
            .expect_add_reaction()
            .times(reactions)
            .returning(move |_, message_id, emoji| {
                log.lock()
                    .unwrap()
                    .push(format!("react {} {}", message_id, emoji));
                Ok(())
            });
        let log = calls.clone();
        transport
            .expect_delete_message()
            .times(deletions)
            .returning(move |_, message_id| {
                log.lock().unwrap().push(format!("delete {}", message_id));
                Ok(())
            });

        (transport, sent, calls)
    }

    async fn run_fleeting(
        reactions: usize,
        deletions: usize,
        configure: impl FnOnce(&mut BotConfig),
    ) -> Vec<String> {
        let (transport, sent, calls) = cleanup_transport(reactions, deletions);
        let h = harness_on(transport, sent, configure, HashMap::new(), Blacklist::default()).await;

        let outcome = h.dispatcher.handle_message(&text_message("?fleeting")).await;
        assert_eq!(outcome, DispatchOutcome::Responded);
        assert_eq!(h.sent_texts(), vec!["hi".to_string()]);

        tokio::time::sleep(FLEETING_EXPIRY * 10).await;
        let calls = calls.lock().unwrap().clone();
        calls
    }

    #[tokio::test]
    async fn test_response_reacts_then_expires() {
        let calls = run_fleeting(1, 1, |settings| {
            settings.delete_messages = true;
            settings.delete_invoking = false;
        })
        .await;

        assert_eq!(calls, vec!["react reply tada", "delete reply"]);
    }

    #[tokio::test]
    async fn test_expiry_also_deletes_invoking_message() {
        let mut calls = run_fleeting(1, 2, |settings| {
            settings.delete_messages = true;
            settings.delete_invoking = true;
        })
        .await;

        assert_eq!(calls.remove(0), "react reply tada");
        calls.sort();
        assert_eq!(calls, vec!["delete m1", "delete reply"]);
    }

    #[tokio::test]
    async fn test_nothing_deleted_when_deletion_disabled() {
        let calls = run_fleeting(1, 0, |settings| {
            settings.delete_messages = false;
            settings.delete_invoking = true;
        })
        .await;

        assert_eq!(calls, vec!["react reply tada"]);
    }

    #[tokio::test]
    async fn test_reaction_counters() {
        let h = harness().await;
        let reaction = |user_id: &str, author: &str, on_message: u32, by_user: u32| ReactionEvent {
            user_id: user_id.into(),
            message_id: "m1".into(),
            message_author_id: author.into(),
            channel_id: "c1".into(),
            server_id: Some("s1".into()),
            emoji: "thumbsup".into(),
            message_reaction_count: on_message,
            user_reaction_count: by_user,
        };

        h.dispatcher
            .handle_reaction_add(&reaction("100002", "100001", 1, 1))
            .await;
        h.dispatcher
            .handle_reaction_add(&reaction("100002", "100001", 2, 2))
            .await;
        h.dispatcher
            .handle_reaction_add(&reaction("100001", "100001", 3, 1))
            .await;
        h.dispatcher
            .handle_reaction_add(&reaction("999999", "100001", 4, 1))
            .await;

        let bob = UsageScope::default().user("100002").server("s1");
        let given = h.store.reaction_usage(&bob).await.unwrap().unwrap();
        assert_eq!(given.user_reacted, 2);
        assert_eq!(given.messages_reacted, 1);

        let alice = UsageScope::default().user("100001").server("s1");
        let counts = h.store.reaction_usage(&alice).await.unwrap().unwrap();
        assert_eq!(counts.reactions_received, 2);
        assert_eq!(counts.message_reactions_received, 1);
        assert_eq!(counts.user_reacted, 1);
    }

    #[tokio::test]
    async fn test_ready_sets_presence_and_announces() {
        let h = harness_with(
            |settings| settings.announce_channel = Some("general".into()),
            HashMap::new(),
            Blacklist::default(),
        )
        .await;

        let mut renamed = bot_user();
        renamed.name = "Brother Abbot".into();
        h.dispatcher
            .handle_event(IncomingEvent::Ready { user: renamed })
            .await;

        assert_eq!(h.dispatcher.bot_user().await.name, "Brother Abbot");
        assert_eq!(
            h.sent_texts(),
            vec!["OK.  OK.  OK.  Brother Abbot has arrived.  Let the games begin!".to_string()]
        );
    }
}
