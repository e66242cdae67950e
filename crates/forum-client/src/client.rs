//! Forum HTTP client.

use crate::error::ForumError;
use crate::types::*;
use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = concat!("abbot/", env!("CARGO_PKG_VERSION"));

/// Posts requested per listing.
const LISTING_LIMIT: u32 = 50;

/// Forum listing client.
#[derive(Clone)]
pub struct ForumClient {
    client: Client,
    base_url: String,
}

impl ForumClient {
    /// Create a new forum client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ForumError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the current hot listing of a subreddit.
    #[instrument(skip(self))]
    pub async fn hot_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Post>, ForumError> {
        let response = self
            .client
            .get(format!("{}/r/{}/hot.json", self.base_url, subreddit))
            .query(&[("limit", limit)])
            .send()
            .await?;

        let listing: Listing = self.handle_response(response).await?;
        let posts: Vec<Post> = listing.data.children.into_iter().map(|c| c.data).collect();
        debug!("Fetched {} posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }

    /// Pick a random presentable post from a random subreddit.
    ///
    /// Returns `Ok(None)` when the chosen listing has nothing presentable.
    pub async fn random_post(&self, subreddits: &[String]) -> Result<Option<Post>, ForumError> {
        let subreddit = subreddits
            .choose(&mut rand::thread_rng())
            .ok_or(ForumError::NoSubreddits)?;

        let posts: Vec<Post> = self
            .hot_posts(subreddit, LISTING_LIMIT)
            .await?
            .into_iter()
            .filter(Post::is_presentable)
            .collect();

        Ok(posts.choose(&mut rand::thread_rng()).cloned())
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ForumError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(ForumError::from)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Forum rate limit exceeded");
            Err(ForumError::RateLimit)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(ForumError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
