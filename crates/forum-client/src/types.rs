//! Forum listing types.

use serde::Deserialize;

/// `/r/{sub}/hot.json` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingChild {
    pub data: Post,
}

/// A single forum post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub over_18: bool,
}

impl Post {
    /// Posts worth showing in a family-friendly channel.
    pub fn is_presentable(&self) -> bool {
        !self.stickied && !self.over_18 && !self.title.trim().is_empty()
    }
}
