//! Event command - the gift exchange sign-up.
//!
//! Each event lives in `{directory}/event_{name}.json`. Every read-modify-write
//! holds the store's lock, so concurrent sign-ups cannot overrun the limit.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{AppError, AppResult, CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub discord_id: String,
    pub address: Option<String>,
    pub size: Option<String>,
    pub giftee: Option<String>,
}

impl Participant {
    pub fn new(discord_id: impl Into<String>) -> Self {
        Self {
            discord_id: discord_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftEvent {
    pub name: String,
    pub max_participants: usize,
    #[serde(default)]
    pub participants: BTreeMap<String, Participant>,
}

impl GiftEvent {
    pub fn new(name: impl Into<String>, max_participants: usize) -> Self {
        Self {
            name: name.into(),
            max_participants,
            participants: BTreeMap::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptIn {
    Added { count: usize, limit: usize },
    AlreadyIn,
    Full { limit: usize },
}

/// JSON-file persistence for one event.
#[derive(Clone)]
pub struct EventStore {
    path: PathBuf,
    name: String,
    max_participants: usize,
    lock: Arc<Mutex<()>>,
}

impl EventStore {
    pub fn new(directory: impl AsRef<Path>, name: &str, max_participants: usize) -> Self {
        Self {
            path: directory.as_ref().join(format!("event_{}.json", name)),
            name: name.to_string(),
            max_participants,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state; a missing file is a fresh event.
    pub async fn load(&self) -> AppResult<GiftEvent> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn opt_in(&self, user_id: &str) -> AppResult<OptIn> {
        let _guard = self.lock.lock().await;
        let mut event = self.read().await?;

        if event.participants.contains_key(user_id) {
            return Ok(OptIn::AlreadyIn);
        }
        if event.is_full() {
            return Ok(OptIn::Full {
                limit: event.max_participants,
            });
        }

        event
            .participants
            .insert(user_id.to_string(), Participant::new(user_id));
        self.write(&event).await?;
        info!("{} opted in to event {}", user_id, event.name);

        Ok(OptIn::Added {
            count: event.participants.len(),
            limit: event.max_participants,
        })
    }

    /// Apply `update` to a participant. `false` if the user has not opted in.
    pub async fn update<F>(&self, user_id: &str, update: F) -> AppResult<bool>
    where
        F: FnOnce(&mut Participant) + Send,
    {
        let _guard = self.lock.lock().await;
        let mut event = self.read().await?;

        let Some(participant) = event.participants.get_mut(user_id) else {
            return Ok(false);
        };
        update(participant);
        self.write(&event).await?;

        Ok(true)
    }

    async fn read(&self) -> AppResult<GiftEvent> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok(GiftEvent::new(&self.name, self.max_participants))
            }
            Err(e) => Err(AppError::EventFile(e)),
        }
    }

    async fn write(&self, event: &GiftEvent) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(event)?;
        let staged = self.path.with_extension("json.tmp");
        tokio::fs::write(&staged, json).await?;
        tokio::fs::rename(&staged, &self.path).await?;
        Ok(())
    }
}

pub struct EventCommand {
    events: EventStore,
}

impl EventCommand {
    pub fn new(events: EventStore) -> Self {
        Self { events }
    }

    async fn set_field(
        &self,
        user_id: &str,
        prefix: &str,
        label: &str,
        value: String,
        apply: fn(&mut Participant, String),
    ) -> CommandResult<Option<Response>> {
        if value.is_empty() {
            return Err(CommandError::rejected(format!(
                "Please give your {} as well, e.g. `{}event {} <{}>`.",
                label, prefix, label, label
            )));
        }

        let logged = format!("your {} logged as: {}.", label, value);
        let updated = self
            .events
            .update(user_id, move |participant| apply(participant, value))
            .await?;
        if !updated {
            return Err(not_opted_in(prefix));
        }

        Ok(Some(Response::text(logged).reply()))
    }
}

fn not_opted_in(prefix: &str) -> CommandError {
    CommandError::rejected(format!(
        "You need to opt in first with `{}event opt_in`.",
        prefix
    ))
}

fn status_text(event: &GiftEvent, user_id: &str) -> String {
    let header = format!(
        "Event '{}': {} of {} participants.",
        event.name,
        event.participants.len(),
        event.max_participants
    );

    match event.participants.get(user_id) {
        Some(p) => format!(
            "{}\nAddress: {}\nSize: {}\nGiftee: {}",
            header,
            p.address.as_deref().unwrap_or("N/A"),
            p.size.as_deref().unwrap_or("N/A"),
            p.giftee.as_deref().unwrap_or("Not yet assigned.")
        ),
        None => format!("{}\nYou have not opted in.", header),
    }
}

#[async_trait]
impl CommandHandler for EventCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_event")
            .context(ContextSlot::Author)
            .param("action")
            .context(ContextSlot::LeftoverArgs)
            .doc(
                "Usage:
                    {command_prefix}event opt_in
                    {command_prefix}event address <address>
                    {command_prefix}event size <size>
                    {command_prefix}event status

                The gift exchange event. Opt in, then give your address and shirt size.",
            )
            .build()
    }

    async fn execute(
        &self,
        invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let author = args.author()?;
        let prefix = invocation.command_prefix;
        let action = args
            .get("action")
            .ok_or(AppError::UnboundSlot("action"))?
            .to_lowercase();
        let value = args.leftover_args()?.join(" ");

        match action.as_str() {
            "opt_in" | "optin" => match self.events.opt_in(&author.id).await? {
                OptIn::Added { count, limit } => Ok(Some(
                    Response::text(format!("you're in! {} of {} places taken.", count, limit))
                    .reply(),
                )),
                OptIn::AlreadyIn => {
                    Ok(Some(Response::text("you have already opted in.").reply()))
                }
                OptIn::Full { limit } => Err(CommandError::rejected(format!(
                    "Sorry, the event is full ({} participants).",
                    limit
                ))),
            },
            "address" => {
                self.set_field(&author.id, prefix, "address", value, |p, v| {
                    p.address = Some(v)
                })
                .await
            }
            "size" => {
                self.set_field(&author.id, prefix, "size", value, |p, v| p.size = Some(v))
                    .await
            }
            "status" => {
                let event = self.events.load().await?;
                Ok(Some(Response::text(status_text(&event, &author.id))))
            }
            _ => Err(CommandError::rejected(
                "Invalid event command. Use opt_in, address, size or status.",
            )),
        }
    }
}
