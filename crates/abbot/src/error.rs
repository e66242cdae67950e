//! Application error types.

use std::time::Duration;
use thiserror::Error;

/// How long rejection messages stay in the channel.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(20);

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Chat error: {0}")]
    Chat(#[from] chat_client::ChatError),

    #[error("Usage store error: {0}")]
    UsageStore(#[from] usage_store::UsageStoreError),

    #[error("Forum error: {0}")]
    Forum(#[from] forum_client::ForumError),

    #[error("Event file error: {0}")]
    EventFile(#[from] std::io::Error),

    #[error("Event data error: {0}")]
    EventData(#[from] serde_json::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Slot `{0}` was not declared by this command")]
    UnboundSlot(&'static str),
}

/// Result type alias for application errors.
pub type AppResult<T> = Result<T, AppError>;

/// A fatal configuration problem, with a hint on how to fix it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("An error has occurred reading the config:\n{problem}\n\n{solution}")]
pub struct ConfigError {
    pub problem: String,
    pub solution: String,
}

impl ConfigError {
    pub fn new(problem: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            solution: solution.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Command `{0}` is already registered")]
    Duplicate(String),

    #[error("Command name must not be empty")]
    EmptyName,
}

/// Why a command did not produce its normal response.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Caller may not run the command here.
    #[error("{message}")]
    PermissionDenied { message: String, expire_in: Duration },

    /// Missing or malformed arguments; carries the rendered usage text.
    #[error("{usage}")]
    Usage { usage: String, expire_in: Duration },

    /// The handler's own validation refused the input.
    #[error("{message}")]
    Rejected { message: String, expire_in: Duration },

    /// Anything else. Logged, and echoed only in debug mode.
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl CommandError {
    pub fn permission(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
            expire_in: DEFAULT_EXPIRY,
        }
    }

    pub fn usage(usage: impl Into<String>) -> Self {
        Self::Usage {
            usage: usage.into(),
            expire_in: Duration::from_secs(60),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            expire_in: DEFAULT_EXPIRY,
        }
    }

    /// Lifetime of the message shown to the user, if any is shown.
    pub fn expire_in(&self) -> Option<Duration> {
        match self {
            Self::PermissionDenied { expire_in, .. }
            | Self::Usage { expire_in, .. }
            | Self::Rejected { expire_in, .. } => Some(*expire_in),
            Self::Internal(_) => None,
        }
    }
}

macro_rules! impl_internal_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CommandError {
                fn from(err: $source) -> Self {
                    Self::Internal(AppError::from(err))
                }
            }
        )*
    };
}

impl_internal_from!(
    chat_client::ChatError,
    usage_store::UsageStoreError,
    forum_client::ForumError,
    std::io::Error,
    serde_json::Error,
);

pub type CommandResult<T> = Result<T, CommandError>;
