//! Schema provisioning.
//!
//! A fresh database gets the baseline DDL. Each numbered update whose
//! number exceeds `PRAGMA user_version` is then applied in order, in its
//! own transaction, and the version bumped alongside it.

use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::UsageStoreError;

pub(crate) const BASELINE: &str = include_str!("../sql/schema.sql");

struct Update {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const UPDATES: &[Update] = &[
    Update {
        version: 1,
        name: "message_url_count",
        sql: include_str!("../sql/updates/0001_message_url_count.sql"),
    },
    Update {
        version: 2,
        name: "archive_tables",
        sql: include_str!("../sql/updates/0002_archive_tables.sql"),
    },
];

/// Newest schema version this build knows about.
pub const LATEST_VERSION: i64 = 2;

pub(crate) async fn user_version(pool: &SqlitePool) -> Result<i64, UsageStoreError> {
    let row = sqlx::query("PRAGMA user_version").fetch_one(pool).await?;
    Ok(row.get::<i64, _>(0))
}

pub(crate) async fn run(pool: &SqlitePool) -> Result<i64, UsageStoreError> {
    let mut version = user_version(pool).await?;

    if version == 0 {
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'usage_messages'",
        )
        .fetch_one(pool)
        .await?;

        if tables == 0 {
            info!("Provisioning baseline schema");
            sqlx::raw_sql(BASELINE)
                .execute(pool)
                .await
                .map_err(|source| UsageStoreError::Migration {
                    version: 0,
                    name: "baseline",
                    source,
                })?;
        }
    }

    let current = version;
    for update in UPDATES.iter().filter(|u| u.version > current) {
        apply(pool, update).await?;
        version = update.version;
    }

    debug!("Schema at version {}", version);
    Ok(version)
}

async fn apply(pool: &SqlitePool, update: &Update) -> Result<(), UsageStoreError> {
    let wrap = |source: sqlx::Error| UsageStoreError::Migration {
        version: update.version,
        name: update.name,
        source,
    };

    let mut tx = pool.begin().await.map_err(wrap)?;
    sqlx::raw_sql(update.sql)
        .execute(&mut *tx)
        .await
        .map_err(wrap)?;
    // PRAGMA does not accept bound parameters.
    sqlx::raw_sql(&format!("PRAGMA user_version = {}", update.version))
        .execute(&mut *tx)
        .await
        .map_err(wrap)?;
    tx.commit().await.map_err(wrap)?;

    info!("Applied schema update {} ({})", update.version, update.name);
    Ok(())
}
