//! Forum client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForumError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No subreddits configured")]
    NoSubreddits,
}
