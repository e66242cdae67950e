//! Setname command - renames the bot.

use crate::binder::BoundArgs;
use crate::commands::{CommandHandler, Invocation};
use crate::error::{AppError, CommandError, CommandResult};
use crate::registry::{CommandDescriptor, ContextSlot};
use crate::response::Response;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use chat_client::ChatError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct SetNameCommand {
    transport: Arc<dyn ChatTransport>,
}

impl SetNameCommand {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl CommandHandler for SetNameCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::builder("cmd_setname")
            .param("name")
            .context(ContextSlot::LeftoverArgs)
            .owner_only()
            .doc(
                "Usage:
                    {command_prefix}setname <name>

                Changes the bot's username.
                Note: This operation is limited by the chat service to twice per hour.",
            )
            .build()
    }

    async fn execute(
        &self,
        _invocation: &Invocation<'_>,
        args: BoundArgs,
    ) -> CommandResult<Option<Response>> {
        let name = args.rest_from("name").ok_or(AppError::UnboundSlot("name"))?;

        match self.transport.set_username(&name).await {
            Ok(user) => {
                info!("Username changed to {}", user.name);
                Ok(Some(
                    Response::text(format!(":ok_hand: Set the bot's username to **{}**", user.name))
                        .delete_after(Duration::from_secs(20)),
                ))
            }
            Err(ChatError::Api { status: 429, .. }) | Err(ChatError::Forbidden(_)) => {
                warn!("Username change to {} refused", name);
                Err(CommandError::rejected(
                    "Failed to change name. Did you change names too many times? Remember name changes are limited to twice per hour.",
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionProfile;
    use crate::registry::CommandRegistry;
    use crate::response::Content;
    use crate::test_support::{bind_for, bot_user, invocation, message_from, owner};
    use crate::transport::MockChatTransport;

    #[test]
    fn test_owner_only() {
        let command = SetNameCommand::new(Arc::new(MockChatTransport::new()));
        assert!(command.descriptor().owner_only);
    }

    #[tokio::test]
    async fn test_setname_joins_words() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_set_username()
            .withf(|name| name == "Brother Abbot")
            .times(1)
            .returning(|name| {
                let mut user = bot_user();
                user.name = name.to_string();
                Ok(user)
            });

        let command = SetNameCommand::new(Arc::new(transport));
        let registry = CommandRegistry::default();
        let bot = bot_user();
        let message = message_from(owner(), "?setname Brother Abbot");
        let args = bind_for(
            &command,
            &message,
            &PermissionProfile::unrestricted("Owner (auto)"),
            &["Brother", "Abbot"],
        );

        let response = command
            .execute(&invocation(&registry, &bot), args)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            response.content,
            Content::Text(":ok_hand: Set the bot's username to **Brother Abbot**".into())
        );
    }

    #[tokio::test]
    async fn test_rate_limited_rename() {
        let mut transport = MockChatTransport::new();
        transport.expect_set_username().returning(|_| {
            Err(ChatError::Api {
                status: 429,
                message: "slow down".into(),
            })
        });

        let command = SetNameCommand::new(Arc::new(transport));
        let registry = CommandRegistry::default();
        let bot = bot_user();
        let message = message_from(owner(), "?setname Again");
        let args = bind_for(
            &command,
            &message,
            &PermissionProfile::unrestricted("Owner (auto)"),
            &["Again"],
        );

        let err = command
            .execute(&invocation(&registry, &bot), args)
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Rejected { .. }));
    }
}
