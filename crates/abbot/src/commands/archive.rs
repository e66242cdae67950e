//! Archive command - moves the live usage tables into the archive.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::CommandResult;
use crate::registry::CommandDescriptor;
use crate::response::Response;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use usage_store::UsageStore;

pub struct ArchiveCommand {
    store: UsageStore,
}

impl ArchiveCommand {
    pub fn new(store: UsageStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandHandler for ArchiveCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_archive")
            .owner_only()
            .doc(
                "Usage:
                    {command_prefix}archive

                Archives all usage statistics and starts counting from zero.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        _args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let summary = self.store.archive(Utc::now()).await?;
        info!("Archived usage: {:?}", summary);

        Ok(Some(Response::text(format!(
            "Archived {} usage rows ({} message, {} reaction, {} mention, {} command).",
            summary.total(),
            summary.messages,
            summary.reactions,
            summary.mentions,
            summary.commands
        ))))
    }
}
