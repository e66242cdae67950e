//! Usage command - personal statistics and leaderboards.

use crate::binder::BoundArgs;
use crate::commands::{requested_by, CommandHandler, Invocation, EMBED_COLOUR};
use crate::error::{CommandError, CommandResult};
use crate::format::rank_indicator;
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use async_trait::async_trait;
use chat_client::{Embed, User};
use usage_store::{Metric, MessageMetric, UsageScope, UsageStore};

const RANK_LIMIT: u32 = 5;

pub struct UsageCommand {
    store: UsageStore,
}

impl UsageCommand {
    pub fn new(store: UsageStore) -> Self {
        Self { store }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct UsageRequest {
    rank: bool,
    server_wide: bool,
}

fn parse_request(words: &[&str], prefix: &str) -> Result<UsageRequest, CommandError> {
    let mut request = UsageRequest::default();
    for word in words {
        match word.to_lowercase().as_str() {
            "rank" => request.rank = true,
            "server" => request.server_wide = true,
            mention if mention.starts_with("<@") => {}
            other => {
                return Err(CommandError::rejected(format!(
                    "Unknown option `{}`. Try `{}usage [@user|rank] [server]`.",
                    other, prefix
                )))
            }
        }
    }
    Ok(request)
}

impl UsageCommand {
    async fn leaderboard(&self, server: &str, channel: Option<&str>) -> CommandResult<String> {
        let mut sections = Vec::new();

        for metric in MessageMetric::all() {
            let entries = self.store.rank(*metric, server, channel, RANK_LIMIT).await?;
            if entries.is_empty() {
                continue;
            }

            let lines: Vec<String> = entries
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    format!(
                        "{} <@{}>: {}",
                        rank_indicator(i + 1, entries.len()),
                        entry.user,
                        entry.value
                    )
                })
                .collect();
            sections.push(format!("**{}**\n{}", metric.label(), lines.join("\n")));
        }

        if sections.is_empty() {
            return Ok("No usage recorded yet.".into());
        }
        Ok(sections.join("\n\n"))
    }

    async fn personal(&self, user: &User, scope: &UsageScope) -> CommandResult<String> {
        let mut lines = Vec::new();

        match self.store.message_usage(scope).await? {
            Some(messages) => {
                lines.push(format!(
                    "**Messages**: {} ({} words, {} characters, {} links)",
                    messages.message_count,
                    messages.word_count,
                    messages.character_count,
                    messages.url_count
                ));
                lines.push(format!(
                    "**Longest message**: {} characters",
                    messages.max_message_length
                ));
                if let Some(last) = messages.last_message_timestamp {
                    lines.push(format!(
                        "**Last message**: {}",
                        last.format("%Y-%m-%d %H:%M UTC")
                    ));
                }
            }
            None => lines.push(format!("{} has not said anything here yet.", user.name)),
        }

        if let Some(mentions) = self.store.mention_usage(scope).await? {
            lines.push(format!(
                "**Mentions**: made {}, received {}",
                mentions.user_mentions, mentions.user_mentioned
            ));
        }

        if let Some(reactions) = self.store.reaction_usage(scope).await? {
            lines.push(format!(
                "**Reactions**: given {}, received {}",
                reactions.user_reacted, reactions.reactions_received
            ));
        }

        let commands = self.store.command_usage(scope).await?;
        if commands.valid + commands.invalid > 0 {
            let favourite = self
                .store
                .favourite_command(scope)
                .await?
                .map(|(name, _)| format!(", favourite `{}`", name))
                .unwrap_or_default();
            lines.push(format!(
                "**Commands**: {} ({} invalid){}",
                commands.valid, commands.invalid, favourite
            ));
        }

        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl CommandHandler for UsageCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_usage")
            .context(ContextSlot::Author)
            .context(ContextSlot::Server)
            .context(ContextSlot::Channel)
            .context(ContextSlot::UserMentions)
            .optional("target")
            .optional("scope")
            .doc(
                "Usage:
                    {command_prefix}usage [@user|rank] [server]

                Shows message, mention, reaction and command statistics for you or a mentioned user.
                `rank` shows the top users for each message statistic instead.
                Add `server` to count the whole server rather than this channel.",
            )
            .build()
    }

    async fn execute(
        &self,
        invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let server = args
            .server()?
            .ok_or_else(|| CommandError::rejected("Usage statistics are only kept for servers."))?;
        let author = args.author()?;
        let channel = &args.channel()?.id;

        let words: Vec<&str> = [args.get("target"), args.get("scope")]
            .into_iter()
            .flatten()
            .collect();
        let request = parse_request(&words, invocation.command_prefix)?;
        let channel_filter = (!request.server_wide).then_some(channel.as_str());
        let suffix = if request.server_wide { " (server)" } else { "" };

        let embed = if request.rank {
            let description = self.leaderboard(server, channel_filter).await?;
            Embed::new(format!("Usage Rankings{}", suffix), description, EMBED_COLOUR)
        } else {
            let user = args.user_mentions()?.first().unwrap_or(author);
            let mut scope = UsageScope::default().user(&user.id).server(server);
            if let Some(channel) = channel_filter {
                scope = scope.channel(channel);
            }
            let description = self.personal(user, &scope).await?;
            Embed::new(format!("Usage for {}{}", user.name, suffix), description, EMBED_COLOUR)
        };

        Ok(Some(Response::embed(embed.with_footer(requested_by(author)))))
    }
}
