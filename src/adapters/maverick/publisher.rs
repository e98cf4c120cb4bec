//! Command publishers
//!
//! [`HttpCommandPublisher`] posts commands to the Maverick command gateway.
//! [`DryRunPublisher`] only logs them.

use super::client::MaverickClient;
use crate::adapters::destination::CommandPublisher;
use crate::domain::command::{CommandResult, SyncCommand};
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Publishes commands with `POST {base}/commands`
pub struct HttpCommandPublisher {
    client: Arc<MaverickClient>,
}

impl HttpCommandPublisher {
    pub fn new(client: Arc<MaverickClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommandPublisher for HttpCommandPublisher {
    async fn publish(&self, command: SyncCommand) -> Result<CommandResult> {
        tracing::debug!(
            command = command.name(),
            command_id = %command.command_id(),
            "Publishing command"
        );

        self.client
            .retry_request(|| {
                self.client
                    .send_json(self.client.post("/commands").json(&command))
            })
            .await
    }
}

/// Logs commands instead of sending them
#[derive(Debug, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl CommandPublisher for DryRunPublisher {
    async fn publish(&self, command: SyncCommand) -> Result<CommandResult> {
        tracing::info!(
            command = command.name(),
            command_id = %command.command_id(),
            "DRY RUN: Would publish command"
        );
        Ok(CommandResult::succeeded(command.command_id(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DestinationConfig;
    use crate::domain::entity::User;
    use crate::domain::ids::{CommandId, CorrelationId};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_http_publisher_posts_tagged_command() {
        let command_id = CommandId::new();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/commands")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "command": "create",
                "entity": {"object_type": "user", "user_name": "alice"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"command_id": "{command_id}", "success": true, "entity_id": "m42"}}"#
            ))
            .create_async()
            .await;

        let config = DestinationConfig {
            base_url: server.url(),
            ..Default::default()
        };
        let publisher = HttpCommandPublisher::new(Arc::new(MaverickClient::new(&config).unwrap()));

        let result = publisher
            .publish(SyncCommand::Create {
                command_id,
                correlation_id: CorrelationId::new(),
                entity: User::new("alice").into(),
            })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.command_id, command_id);
        assert_eq!(result.entity_id.unwrap().as_str(), "m42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_dry_run_publisher_succeeds_without_id() {
        let command_id = CommandId::new();
        let result = DryRunPublisher
            .publish(SyncCommand::Create {
                command_id,
                correlation_id: CorrelationId::new(),
                entity: User::new("alice").into(),
            })
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.entity_id.is_none());
    }
}
