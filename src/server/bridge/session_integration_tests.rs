//! End-to-end tests for the pre-start half of the session loop, run
//! against a real listener with a real WebSocket client. Nothing here
//! reaches the agent side: every scenario ends before a `start` frame
//! would trigger the connector.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::AgentConnector;
use crate::config::BridgeConfig;
use crate::server::call_log::CallLog;
use crate::server::payments::PaymentClient;
use crate::server::{create_router, AppState};

/// Serve the full router on an ephemeral port; returns the media-stream URL.
async fn spawn_bridge() -> String {
    let config = BridgeConfig {
        agent_api_key: "key".to_string(),
        agent_id: "agent_1".to_string(),
        payment_url: "http://127.0.0.1:1/collect".to_string(),
        ..BridgeConfig::default()
    };
    let state = AppState {
        agent: AgentConnector::new(&config),
        payments: PaymentClient::new(config.payment_url.clone(), None),
        call_log: CallLog::new(),
        config,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, create_router(state))
            .await
            .expect("serve");
    });
    format!("ws://{}/media-stream", addr)
}

fn text(frame: &str) -> Message {
    Message::Text(frame.to_string().into())
}

#[tokio::test]
async fn test_media_before_start_is_dropped_and_session_stays_open() {
    let url = spawn_bridge().await;
    let (mut client, _) = connect_async(url.as_str()).await.expect("connect");

    client
        .send(text(r#"{"event":"media","media":{"payload":"//8A"}}"#))
        .await
        .expect("send media");

    // The frame is dropped while awaiting start: no echo, no error, and
    // the server does not close on us.
    let quiet = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(
        quiet.is_err(),
        "session reacted to pre-start media: {:?}",
        quiet
    );
}

#[tokio::test]
async fn test_stop_before_start_closes_the_socket() {
    let url = spawn_bridge().await;
    let (mut client, _) = connect_async(url.as_str()).await.expect("connect");

    client
        .send(text(r#"{"event":"media","media":{"payload":"//8A"}}"#))
        .await
        .expect("send media");
    client
        .send(text(r#"{"event":"stop","stop":{"callSid":"CA1"}}"#))
        .await
        .expect("send stop");

    // The session must answer stop by closing; no data frame may precede
    // the close.
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("server never closed after stop");
        match frame {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(other)) => panic!("unexpected frame after stop: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_malformed_frames_before_start_are_tolerated() {
    let url = spawn_bridge().await;
    let (mut client, _) = connect_async(url.as_str()).await.expect("connect");

    client.send(text("not json")).await.expect("send garbage");
    client
        .send(text(r#"{"event":"mark","mark":{"name":"x"}}"#))
        .await
        .expect("send unknown event");

    // Still awaiting start afterwards; a stop still gets a clean close.
    client
        .send(text(r#"{"event":"stop"}"#))
        .await
        .expect("send stop");
    let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("server never closed after stop");
    assert!(
        !matches!(frame, Some(Ok(Message::Text(_)))),
        "unexpected data frame: {:?}",
        frame
    );
}
