//! Application configuration loaded from an options file and environment variables.

use crate::error::ConfigError;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options file read by [`Config::load`].
pub const DEFAULT_OPTIONS_FILE: &str = "config/options.ini";

/// Smallest plausible chat account id.
const MIN_OWNER_ID: u64 = 10_000;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Chat gateway configuration
    pub chat: ChatConfig,

    /// Owner and permission files
    pub permissions: PermissionsConfig,

    /// Bot behaviour
    #[serde(default)]
    pub bot: BotConfig,

    /// Usage database
    #[serde(default)]
    pub storage: StorageConfig,

    /// Joke source
    #[serde(default)]
    pub forum: ForumConfig,

    /// Gift-exchange event
    #[serde(default)]
    pub event: EventConfig,

    /// Permission groups declared inline, keyed by group name
    #[serde(default)]
    pub groups: HashMap<String, GroupConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Chat gateway bridge endpoint
    #[serde(default = "default_chat_service")]
    pub service_url: String,

    /// Bot token
    pub token: SecretString,

    /// Poll interval for events
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Request timeout
    #[serde(default = "default_chat_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    /// Id of the account that owns the bot
    pub owner_id: String,

    /// Permission group file
    #[serde(default = "default_permissions_file")]
    pub file: PathBuf,

    /// Blacklisted ids, one per line
    #[serde(default = "default_blacklist_file")]
    pub blacklist_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Let responses expire
    #[serde(default = "default_true")]
    pub delete_messages: bool,

    /// Also delete the message that invoked a command
    #[serde(default)]
    pub delete_invoking: bool,

    /// Echo unhandled command errors into the channel
    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Channels commands are accepted in; empty means all
    #[serde(default, deserialize_with = "deserialize_list")]
    pub bound_channels: Vec<String>,

    /// Targets of the broadcast command
    #[serde(default, deserialize_with = "deserialize_list")]
    pub broadcast_channels: Vec<String>,

    /// Channel greeted once connected
    #[serde(default)]
    pub announce_channel: Option<String>,

    /// Presence text
    #[serde(default = "default_status")]
    pub status: String,

    /// Delay used by commands that build suspense
    #[serde(default = "default_dramatic_pause", with = "humantime_serde")]
    pub dramatic_pause: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    #[serde(default = "default_forum_url")]
    pub base_url: String,

    #[serde(default = "default_subreddits", deserialize_with = "deserialize_list")]
    pub subreddits: Vec<String>,

    #[serde(default = "default_forum_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    /// Event name, used for the data file name
    #[serde(default = "default_event_name")]
    pub name: String,

    /// Directory holding `event_<name>.json`
    #[serde(default = "default_event_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_max_participants")]
    pub max_participants: usize,
}

/// One permission group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupConfig {
    #[serde(default, deserialize_with = "deserialize_list")]
    pub command_whitelist: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_list")]
    pub command_blacklist: Vec<String>,

    /// Commands that require the caller to be in a voice channel
    #[serde(default, deserialize_with = "deserialize_list")]
    pub ignore_non_voice: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_list")]
    pub user_list: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_list")]
    pub granted_to_roles: Vec<String>,
}

// Default implementations
impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            delete_messages: true,
            delete_invoking: false,
            debug_mode: false,
            log_level: default_log_level(),
            bound_channels: Vec::new(),
            broadcast_channels: Vec::new(),
            announce_channel: None,
            status: default_status(),
            dramatic_pause: default_dramatic_pause(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            base_url: default_forum_url(),
            subreddits: default_subreddits(),
            timeout: default_forum_timeout(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            name: default_event_name(),
            directory: default_event_directory(),
            max_participants: default_max_participants(),
        }
    }
}

// Default value functions
fn default_chat_service() -> String {
    "http://localhost:8080".into()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_chat_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_permissions_file() -> PathBuf {
    PathBuf::from("config/permissions")
}

fn default_blacklist_file() -> PathBuf {
    PathBuf::from("config/blacklist.txt")
}

fn default_command_prefix() -> String {
    "?".into()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".into()
}

fn default_status() -> String {
    "Taking over the world|?help".into()
}

fn default_dramatic_pause() -> Duration {
    Duration::from_secs(3)
}

fn default_database_url() -> String {
    "sqlite:abbot.sqlite3".into()
}

fn default_forum_url() -> String {
    "https://www.reddit.com".into()
}

fn default_subreddits() -> Vec<String> {
    vec!["jokes".into(), "dadjokes".into()]
}

fn default_forum_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_event_name() -> String {
    "gifter".into()
}

fn default_event_directory() -> PathBuf {
    PathBuf::from("config/events")
}

fn default_max_participants() -> usize {
    50
}

/// Accept either a sequence or a single string split on commas and whitespace.
fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        String(String),
    }

    let items = match ListOrString::deserialize(deserializer)? {
        ListOrString::List(items) => items,
        ListOrString::String(raw) => raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(String::from)
            .collect(),
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

impl Config {
    /// Load configuration from [`DEFAULT_OPTIONS_FILE`] and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_OPTIONS_FILE))
    }

    /// Load configuration from `path` (optional) overlaid with environment variables.
    ///
    /// Nested keys use `__` in the environment, e.g. `CHAT__TOKEN`.
    pub fn load_from(path: &Path) -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Ids are long digit strings; keep strings as strings.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.normalize();
        config.validate()?;
        config.merge_group_file()?;
        Ok(config)
    }

    /// Apply derived settings.
    pub fn normalize(&mut self) {
        self.bot.delete_invoking = self.bot.delete_invoking && self.bot.delete_messages;
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.bot.command_prefix;

        if prefix.trim().is_empty() {
            return Err(ConfigError::new(
                "The command prefix is empty.",
                "Set bot.command_prefix to a non-empty value such as `?`.",
            ));
        }

        if self.chat.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::new(
                "No login token was specified in the config.",
                "Please fill in chat.token with the bot account's token.",
            ));
        }

        let owner = self.permissions.owner_id.trim();
        if owner.is_empty() || !owner.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::new(
                "An invalid OwnerID was set.",
                format!(
                    "Correct your OwnerID. The ID should be just a number, approximately \
                     18 characters long. If you don't know what your ID is, use the {}id \
                     command. Current invalid OwnerID: {}",
                    prefix, owner
                ),
            ));
        }

        // Digit strings too long for u64 are still plausible ids.
        if owner.parse::<u64>().map_or(false, |id| id < MIN_OWNER_ID) {
            return Err(ConfigError::new(
                "OwnerID was not set.",
                format!(
                    "Please set the OwnerID in the config. If you don't know what that is, \
                     use the {}id command",
                    prefix
                ),
            ));
        }

        Ok(())
    }

    /// Merge groups from the permission file; inline groups win on name clashes.
    fn merge_group_file(&mut self) -> Result<()> {
        let groups = load_group_file(&self.permissions.file)?;
        for (name, group) in groups {
            let clash = self.groups.keys().any(|k| k.eq_ignore_ascii_case(&name));
            if !clash {
                self.groups.insert(name, group);
            }
        }
        Ok(())
    }
}

/// Read permission groups from `path`; a missing file yields no groups.
pub fn load_group_file(path: &Path) -> Result<HashMap<String, GroupConfig>> {
    let settings = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Ini)
                .required(false),
        )
        .build()
        .with_context(|| format!("Failed to read permission groups from {}", path.display()))?;

    settings
        .try_deserialize()
        .with_context(|| format!("Invalid permission groups in {}", path.display()))
}
