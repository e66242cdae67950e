//! SQLite-backed usage store.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info, instrument};

use crate::error::UsageStoreError;
use crate::metrics::Metric;
use crate::migrations;
use crate::types::*;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistent per-user usage counters.
///
/// Every write is a single `INSERT .. ON CONFLICT DO UPDATE` that adds the
/// delta inside SQLite, so concurrent writers to the same key never lose
/// increments.
#[derive(Clone)]
pub struct UsageStore {
    pool: SqlitePool,
}

impl UsageStore {
    /// Open (creating if missing) the database and bring its schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, UsageStoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        // Each connection to an in-memory database is its own database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            MAX_CONNECTIONS
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let version = migrations::run(&pool).await?;
        info!("Usage store ready at {} (schema {})", database_url, version);

        Ok(Self { pool })
    }

    /// Current `PRAGMA user_version`.
    pub async fn schema_version(&self) -> Result<i64, UsageStoreError> {
        migrations::user_version(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Add one message's counters to `key`.
    #[instrument(skip(self, delta))]
    pub async fn record_message(
        &self,
        key: &UsageKey,
        delta: &MessageDelta,
    ) -> Result<(), UsageStoreError> {
        sqlx::query(
            "INSERT INTO usage_messages
                (user, server, channel, message_count, word_count, character_count,
                 url_count, max_message_length, last_message_timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user, server, channel) DO UPDATE SET
                message_count = message_count + excluded.message_count,
                word_count = word_count + excluded.word_count,
                character_count = character_count + excluded.character_count,
                url_count = url_count + excluded.url_count,
                max_message_length = MAX(max_message_length, excluded.max_message_length),
                last_message_timestamp =
                    MAX(COALESCE(last_message_timestamp, ''), excluded.last_message_timestamp)",
        )
        .bind(&key.user)
        .bind(&key.server)
        .bind(&key.channel)
        .bind(delta.message_count)
        .bind(delta.word_count)
        .bind(delta.character_count)
        .bind(delta.url_count)
        .bind(delta.max_message_length)
        .bind(encode_timestamp(delta.timestamp))
        .execute(&self.pool)
        .await?;

        debug!("Recorded message usage for {}", key.user);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn record_reactions(
        &self,
        key: &UsageKey,
        delta: &ReactionCounts,
    ) -> Result<(), UsageStoreError> {
        sqlx::query(
            "INSERT INTO usage_reactions
                (user, server, channel, messages_reacted_count, user_reacted_count,
                 message_reactions_received_count, reactions_received_count)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user, server, channel) DO UPDATE SET
                messages_reacted_count = messages_reacted_count + excluded.messages_reacted_count,
                user_reacted_count = user_reacted_count + excluded.user_reacted_count,
                message_reactions_received_count =
                    message_reactions_received_count + excluded.message_reactions_received_count,
                reactions_received_count = reactions_received_count + excluded.reactions_received_count",
        )
        .bind(&key.user)
        .bind(&key.server)
        .bind(&key.channel)
        .bind(delta.messages_reacted)
        .bind(delta.user_reacted)
        .bind(delta.message_reactions_received)
        .bind(delta.reactions_received)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn record_mentions(
        &self,
        key: &UsageKey,
        delta: &MentionCounts,
    ) -> Result<(), UsageStoreError> {
        sqlx::query(
            "INSERT INTO usage_mentions
                (user, server, channel, user_mentions, user_mentioned, channel_mentions, role_mentions)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user, server, channel) DO UPDATE SET
                user_mentions = user_mentions + excluded.user_mentions,
                user_mentioned = user_mentioned + excluded.user_mentioned,
                channel_mentions = channel_mentions + excluded.channel_mentions,
                role_mentions = role_mentions + excluded.role_mentions",
        )
        .bind(&key.user)
        .bind(&key.server)
        .bind(&key.channel)
        .bind(delta.user_mentions)
        .bind(delta.user_mentioned)
        .bind(delta.channel_mentions)
        .bind(delta.role_mentions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Tally one invocation of `command_name`.
    #[instrument(skip(self))]
    pub async fn record_command(
        &self,
        key: &UsageKey,
        command_name: &str,
        valid: bool,
    ) -> Result<(), UsageStoreError> {
        sqlx::query(
            "INSERT INTO usage_commands (user, server, channel, command_name, valid, count)
             VALUES (?, ?, ?, ?, ?, 1)
             ON CONFLICT (user, server, channel, command_name, valid) DO UPDATE SET
                count = count + 1",
        )
        .bind(&key.user)
        .bind(&key.server)
        .bind(&key.channel)
        .bind(command_name)
        .bind(valid)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Message counters summed over `scope`, `None` when nothing matches.
    pub async fn message_usage(
        &self,
        scope: &UsageScope,
    ) -> Result<Option<MessageUsage>, UsageStoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS row_count,
                    COALESCE(SUM(message_count), 0) AS message_count,
                    COALESCE(SUM(word_count), 0) AS word_count,
                    COALESCE(SUM(character_count), 0) AS character_count,
                    COALESCE(SUM(url_count), 0) AS url_count,
                    COALESCE(MAX(max_message_length), 0) AS max_message_length,
                    MAX(last_message_timestamp) AS last_message_timestamp
             FROM usage_messages",
        );
        push_scope(&mut query, scope)?;

        let row = query.build().fetch_one(&self.pool).await?;
        if row.get::<i64, _>("row_count") == 0 {
            return Ok(None);
        }

        let last: Option<String> = row.get("last_message_timestamp");
        let last_message_timestamp = last
            .filter(|raw| !raw.is_empty())
            .map(|raw| decode_timestamp(&raw))
            .transpose()?;

        Ok(Some(MessageUsage {
            message_count: row.get("message_count"),
            word_count: row.get("word_count"),
            character_count: row.get("character_count"),
            url_count: row.get("url_count"),
            max_message_length: row.get("max_message_length"),
            last_message_timestamp,
        }))
    }

    pub async fn reaction_usage(
        &self,
        scope: &UsageScope,
    ) -> Result<Option<ReactionCounts>, UsageStoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS row_count,
                    COALESCE(SUM(messages_reacted_count), 0) AS messages_reacted,
                    COALESCE(SUM(user_reacted_count), 0) AS user_reacted,
                    COALESCE(SUM(message_reactions_received_count), 0) AS message_reactions_received,
                    COALESCE(SUM(reactions_received_count), 0) AS reactions_received
             FROM usage_reactions",
        );
        push_scope(&mut query, scope)?;

        let row = query.build().fetch_one(&self.pool).await?;
        if row.get::<i64, _>("row_count") == 0 {
            return Ok(None);
        }

        Ok(Some(ReactionCounts {
            messages_reacted: row.get("messages_reacted"),
            user_reacted: row.get("user_reacted"),
            message_reactions_received: row.get("message_reactions_received"),
            reactions_received: row.get("reactions_received"),
        }))
    }

    pub async fn mention_usage(
        &self,
        scope: &UsageScope,
    ) -> Result<Option<MentionCounts>, UsageStoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS row_count,
                    COALESCE(SUM(user_mentions), 0) AS user_mentions,
                    COALESCE(SUM(user_mentioned), 0) AS user_mentioned,
                    COALESCE(SUM(channel_mentions), 0) AS channel_mentions,
                    COALESCE(SUM(role_mentions), 0) AS role_mentions
             FROM usage_mentions",
        );
        push_scope(&mut query, scope)?;

        let row = query.build().fetch_one(&self.pool).await?;
        if row.get::<i64, _>("row_count") == 0 {
            return Ok(None);
        }

        Ok(Some(MentionCounts {
            user_mentions: row.get("user_mentions"),
            user_mentioned: row.get("user_mentioned"),
            channel_mentions: row.get("channel_mentions"),
            role_mentions: row.get("role_mentions"),
        }))
    }

    /// Valid and invalid command tallies over `scope`.
    pub async fn command_usage(&self, scope: &UsageScope) -> Result<CommandCounts, UsageStoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT COALESCE(SUM(CASE WHEN valid = 1 THEN count ELSE 0 END), 0) AS valid,
                    COALESCE(SUM(CASE WHEN valid = 0 THEN count ELSE 0 END), 0) AS invalid
             FROM usage_commands",
        );
        push_scope(&mut query, scope)?;

        let row = query.build().fetch_one(&self.pool).await?;
        Ok(CommandCounts {
            valid: row.get("valid"),
            invalid: row.get("invalid"),
        })
    }

    /// Most used valid command over `scope`.
    pub async fn favourite_command(
        &self,
        scope: &UsageScope,
    ) -> Result<Option<(String, i64)>, UsageStoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT command_name, SUM(count) AS total FROM usage_commands",
        );
        push_scope(&mut query, scope)?;
        query.push(" AND valid = 1 GROUP BY command_name ORDER BY total DESC, command_name ASC LIMIT 1");

        let row = query.build().fetch_optional(&self.pool).await?;
        Ok(row.map(|r| (r.get("command_name"), r.get("total"))))
    }

    /// Top `limit` users on `server` (optionally one channel) by `metric`.
    ///
    /// Ordered by value descending, ties broken by user ascending.
    #[instrument(skip(self))]
    pub async fn rank<M: Metric>(
        &self,
        metric: M,
        server: &str,
        channel: Option<&str>,
        limit: u32,
    ) -> Result<Vec<RankEntry>, UsageStoreError> {
        let expression = metric.expression();

        let mut query = QueryBuilder::<Sqlite>::new("SELECT user, ");
        query
            .push(expression)
            .push(" AS value FROM ")
            .push(M::TABLE)
            .push(" WHERE server = ")
            .push_bind(server.to_string());
        if let Some(channel) = channel {
            query.push(" AND channel = ").push_bind(channel.to_string());
        }
        query
            .push(" GROUP BY user ORDER BY value DESC, user ASC LIMIT ")
            .push_bind(i64::from(limit));

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| RankEntry {
                user: row.get("user"),
                value: row.get("value"),
            })
            .collect())
    }

    /// Store an idea submission, returning its id.
    #[instrument(skip(self, idea))]
    pub async fn insert_idea(
        &self,
        key: &UsageKey,
        idea: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<i64, UsageStoreError> {
        let result = sqlx::query(
            "INSERT INTO ideas (user, server, channel, idea, idea_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&key.user)
        .bind(&key.server)
        .bind(&key.channel)
        .bind(idea)
        .bind(encode_timestamp(submitted_at))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!("Stored idea {} from {}", id, key.user);
        Ok(id)
    }

    pub async fn idea_count(&self, server: Option<&str>) -> Result<i64, UsageStoreError> {
        let count = match server {
            Some(server) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM ideas WHERE server = ?")
                    .bind(server)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM ideas")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    pub async fn ideas(&self, server: &str) -> Result<Vec<Idea>, UsageStoreError> {
        let rows = sqlx::query(
            "SELECT id, user, server, channel, idea, idea_date FROM ideas
             WHERE server = ? ORDER BY id ASC",
        )
        .bind(server)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let raw: String = row.get("idea_date");
                Ok(Idea {
                    id: row.get("id"),
                    user: row.get("user"),
                    server: row.get("server"),
                    channel: row.get("channel"),
                    idea: row.get("idea"),
                    idea_date: decode_timestamp(&raw)?,
                })
            })
            .collect()
    }

    /// Move every live usage row into the archive tables.
    ///
    /// Runs in one transaction; live counters restart from zero.
    #[instrument(skip(self))]
    pub async fn archive(&self, archived_at: DateTime<Utc>) -> Result<ArchiveSummary, UsageStoreError> {
        let stamp = encode_timestamp(archived_at);
        let mut tx = self.pool.begin().await?;
        let mut summary = ArchiveSummary::default();

        for (table, columns, slot) in [
            (
                "usage_messages",
                "user, server, channel, message_count, word_count, character_count, \
                 max_message_length, last_message_timestamp, url_count",
                &mut summary.messages,
            ),
            (
                "usage_reactions",
                "user, server, channel, messages_reacted_count, user_reacted_count, \
                 message_reactions_received_count, reactions_received_count",
                &mut summary.reactions,
            ),
            (
                "usage_mentions",
                "user, server, channel, user_mentions, user_mentioned, channel_mentions, role_mentions",
                &mut summary.mentions,
            ),
            (
                "usage_commands",
                "user, server, channel, command_name, valid, count",
                &mut summary.commands,
            ),
        ] {
            let copy = format!(
                "INSERT INTO archive_{table} ({columns}, archived_at) SELECT {columns}, ? FROM {table}"
            );
            *slot = sqlx::query(&copy)
                .bind(&stamp)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Archived {} usage rows", summary.total());
        Ok(summary)
    }
}

/// Append `WHERE` clauses for the fixed dimensions of `scope`.
fn push_scope(query: &mut QueryBuilder<'_, Sqlite>, scope: &UsageScope) -> Result<(), UsageStoreError> {
    if scope.is_empty() {
        return Err(UsageStoreError::EmptyScope);
    }

    let mut separator = " WHERE ";
    for (column, value) in [
        ("user", &scope.user),
        ("server", &scope.server),
        ("channel", &scope.channel),
    ] {
        if let Some(value) = value {
            query
                .push(separator)
                .push(column)
                .push(" = ")
                .push_bind(value.clone());
            separator = " AND ";
        }
    }

    Ok(())
}
