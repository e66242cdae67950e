//! Usage store errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UsageStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("At least one of user, server or channel must be given")]
    EmptyScope,

    #[error("Invalid timestamp in store: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}
