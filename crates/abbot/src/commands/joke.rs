//! Joke command - fetches a random post from the joke forums.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::CommandResult;
use crate::registry::CommandDescriptor;
use crate::response::Response;
use async_trait::async_trait;
use forum_client::ForumClient;
use tracing::warn;

pub struct JokeCommand {
    forum: ForumClient,
    subreddits: Vec<String>,
}

impl JokeCommand {
    pub fn new(forum: ForumClient, subreddits: Vec<String>) -> Self {
        Self { forum, subreddits }
    }
}

#[async_trait]
impl CommandHandler for JokeCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_joke")
            .doc(
                "Usage:
                    {command_prefix}joke

                Tells a joke.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        _args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        match self.forum.random_post(&self.subreddits).await {
            Ok(Some(post)) => {
                let text = format!("**{}**\n{}", post.title.trim(), post.selftext.trim());
                Ok(Some(Response::text(text.trim_end())))
            }
            Ok(None) => Ok(Some(Response::text("I can't think of anything funny right now."))),
            Err(e) => {
                warn!("Failed to fetch a joke: {}", e);
                Ok(None)
            }
        }
    }
}
