//! Chat gateway bridge client.

mod client;
mod error;
mod receiver;
mod types;

pub use client::ChatClient;
pub use error::ChatError;
pub use receiver::EventReceiver;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_client(mock_server: &MockServer) -> ChatClient {
        ChatClient::new(mock_server.uri(), "test-token", Duration::from_secs(5)).unwrap()
    }

    fn message_json(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "m1",
            "author": {"id": "100001", "name": "alice", "bot": false},
            "server_id": "s1",
            "channel": {"id": "c1", "name": "general", "kind": "text"},
            "content": content,
            "timestamp": "2024-01-01T12:00:00Z",
            "mentions": [{"id": "100002", "name": "bob"}],
            "channel_mentions": ["c2"]
        })
    }

    #[tokio::test]
    async fn test_health_check_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_receive_events() {
        let mock_server = MockServer::start().await;

        let events = serde_json::json!([
            {"type": "ready", "user": {"id": "999999", "name": "Abbot", "bot": true}},
            {"type": "message_create", "id": "m1",
             "author": {"id": "100001", "name": "alice"},
             "server_id": "s1",
             "channel": {"id": "c1", "name": "general", "kind": "text"},
             "content": "?roll 2d6",
             "timestamp": "2024-01-01T12:00:00Z"},
            {"type": "reaction_add", "user_id": "100002", "message_id": "m1",
             "message_author_id": "100001", "channel_id": "c1", "server_id": "s1",
             "emoji": "thumbsup", "message_reaction_count": 1, "user_reaction_count": 1}
        ]);

        Mock::given(method("GET"))
            .and(path("/v1/events"))
            .and(header("Authorization", "Bot test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&events))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.receive().await.unwrap();

        assert_eq!(result.len(), 3);
        assert!(matches!(&result[0], IncomingEvent::Ready { user } if user.bot));
        match &result[1] {
            IncomingEvent::MessageCreate(msg) => {
                assert_eq!(msg.content, "?roll 2d6");
                assert!(msg.mentions.is_empty());
                assert!(msg.member.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(&result[2], IncomingEvent::ReactionAdd(r) if r.emoji == "thumbsup"));
    }

    #[tokio::test]
    async fn test_send_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/channels/c1/messages"))
            .and(body_json(serde_json::json!({"content": "Hello!"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "m9", "channel_id": "c1"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let sent = client
            .send("c1", &OutgoingMessage::text("Hello!"))
            .await
            .unwrap();

        assert_eq!(sent.id, "m9");
    }

    #[tokio::test]
    async fn test_send_embed_serializes_without_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/channels/c1/messages"))
            .and(body_json(serde_json::json!({
                "embed": {"title": "Dice Roll", "description": "4, 2", "colour": 0x2e456b}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "m10", "channel_id": "c1"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let embed = Embed::new("Dice Roll", "4, 2", 0x2e456b);
        client.send("c1", &OutgoingMessage::embed(embed)).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_message_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/channels/c1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid channel"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.send("c1", &OutgoingMessage::text("Hello!")).await;

        assert!(matches!(result, Err(ChatError::SendFailed(msg)) if msg == "Invalid channel"));
    }

    #[tokio::test]
    async fn test_send_message_forbidden() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/channels/c1/messages"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.send("c1", &OutgoingMessage::text("Hello!")).await;

        assert!(matches!(result, Err(ChatError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/channels/c1/messages/m1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Message"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.delete_message("c1", "m1").await;

        assert!(matches!(result, Err(ChatError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_reaction() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/channels/c1/messages/m1/reactions/thumbsup"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        client.add_reaction("c1", "m1", "thumbsup").await.unwrap();
    }

    #[tokio::test]
    async fn test_history() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/channels/c1/messages"))
            .and(query_param("limit", "10"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([message_json("hello <@100002>")])),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let history = client.history("c1", 10).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].mentions[0].mention(), "<@100002>");
        assert_eq!(history[0].channel_mentions, vec!["c2".to_string()]);
    }

    #[tokio::test]
    async fn test_list_members() {
        let mock_server = MockServer::start().await;

        let members = serde_json::json!([
            {"user": {"id": "100001", "name": "alice"}, "nick": "Al", "roles": ["r1"]},
            {"user": {"id": "999999", "name": "Abbot", "bot": true}}
        ]);

        Mock::given(method("GET"))
            .and(path("/v1/servers/s1/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&members))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.list_members("s1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].display_name(), "Al");
        assert_eq!(result[1].display_name(), "Abbot");
        assert!(result[1].user.bot);
    }

    #[tokio::test]
    async fn test_set_username() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/v1/users/@me"))
            .and(body_json(serde_json::json!({"username": "Brother Abbot"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "999999", "name": "Brother Abbot", "bot": true
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let user = client.set_username("Brother Abbot").await.unwrap();

        assert_eq!(user.name, "Brother Abbot");
    }

    #[test]
    fn test_user_tag_and_mention() {
        let user = User {
            id: "100001".into(),
            name: "alice".into(),
            discriminator: Some("0420".into()),
            bot: false,
        };

        assert_eq!(user.mention(), "<@100001>");
        assert_eq!(user.tag(), "alice#0420");
    }
}
