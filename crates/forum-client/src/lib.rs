//! Forum (subreddit) listing client.

mod client;
mod error;
mod types;

pub use client::ForumClient;
pub use error::ForumError;
pub use types::*;
