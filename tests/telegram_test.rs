//! Telegram channel tests against a mock Bot API server

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tavolo::config::TelegramConfig;
use tavolo::notify::{Channel, ChannelError, TelegramChannel};

fn channel_for(server: &MockServer) -> TelegramChannel {
    TelegramChannel::new(&TelegramConfig {
        bot_token: "123:testtoken".to_string(),
        api_base: server.uri(),
        update_timeout_secs: 1,
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:testtoken/sendMessage"))
        .and(body_partial_json(json!({"chat_id": 42, "text": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let channel = channel_for(&mock_server);
    channel.send(42, "hello").await.unwrap();
}

#[tokio::test]
async fn test_send_failure_classification() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:testtoken/sendMessage"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/bot123:testtoken/sendMessage"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let channel = channel_for(&mock_server);

    let permanent = channel.send(1, "x").await.unwrap_err();
    assert!(matches!(permanent, ChannelError::Permanent(_)));
    assert!(permanent.to_string().contains("blocked"));

    let transient = channel.send(1, "x").await.unwrap_err();
    assert!(matches!(transient, ChannelError::Transient(_)));
}

#[tokio::test]
async fn test_get_updates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bot123:testtoken/getUpdates"))
        .and(query_param("offset", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                {"update_id": 7, "message": {"chat": {"id": 42}, "text": "/start"}},
                {"update_id": 8, "message": {"chat": {"id": 43}, "text": "/status"}}
            ]
        })))
        .mount(&mock_server)
        .await;

    let channel = channel_for(&mock_server);
    let updates = channel.get_updates(7, 1).await.unwrap();

    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].message.as_ref().unwrap().chat.id, 42);
    assert_eq!(
        updates[1].message.as_ref().unwrap().text.as_deref(),
        Some("/status")
    );
}

#[tokio::test]
async fn test_get_updates_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bot123:testtoken/getUpdates"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "description": "Unauthorized"
        })))
        .mount(&mock_server)
        .await;

    let channel = channel_for(&mock_server);
    let error = channel.get_updates(0, 1).await.unwrap_err();
    assert!(matches!(error, ChannelError::Permanent(_)));
}
