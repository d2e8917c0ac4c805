//! Ingestion gateway over real sockets, against a mocked and a real relay.

use std::net::SocketAddr;
use std::time::Duration;

use callrelay_ingest::{IngestConfig, IngestServer};
use callrelay_server::{RelayServer, ServerConfig};
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start_gateway(relay_url: &str) -> (IngestServer, SocketAddr) {
    let config = IngestConfig {
        relay_url: relay_url.to_string(),
        notify_timeout_ms: 500,
        ..IngestConfig::default()
    };
    let server = IngestServer::with_relay(config).unwrap();
    let (addr, _task) = server.listen().await.unwrap();
    (server, addr)
}

async fn report(addr: SocketAddr, body: &str) -> (u16, serde_json::Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/bot-status"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn forwards_mapped_update_to_relay() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/update-status"))
        .and(body_json(serde_json::json!({
            "callId": "call-1",
            "status": 2,
            "message": "Дозвонился",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let (_gateway, addr) = start_gateway(&relay.uri()).await;
    let (status, body) = report(addr, r#"{"callId":"call-1","status":2}"#).await;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        serde_json::json!({"success": true, "receivedStatus": 2, "message": "Дозвонился"})
    );
}

#[tokio::test]
async fn rejected_report_never_reaches_relay() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&relay)
        .await;

    let (_gateway, addr) = start_gateway(&relay.uri()).await;
    let (status, body) = report(addr, r#"{"callId":"call-1","status":0}"#).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid status provided");

    let (status, body) = report(addr, r#"{"callId":"","status":3}"#).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "callId is required");
}

#[tokio::test]
async fn unreachable_relay_still_acknowledged() {
    let (_gateway, addr) = start_gateway("http://127.0.0.1:9").await;
    let (status, body) = report(addr, r#"{"callId":"call-9","status":4}"#).await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Не дозвонился");
}

#[tokio::test]
async fn relay_error_status_still_acknowledged() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&relay)
        .await;

    let (_gateway, addr) = start_gateway(&relay.uri()).await;
    let (status, _body) = report(addr, r#"{"callId":"call-3","status":1}"#).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn report_reaches_browser_through_real_relay() {
    let relay = RelayServer::new(ServerConfig::default());
    let (relay_addr, _relay_task) = relay.listen().await.unwrap();

    let (mut ws, _) = connect_async(format!("ws://{relay_addr}/")).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while relay.broadcaster().subscriber_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let (_gateway, addr) = start_gateway(&format!("http://{relay_addr}")).await;
    let (status, _body) = report(addr, r#"{"callId":"call-42","status":3}"#).await;
    assert_eq!(status, 200);

    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = msg else {
        panic!("expected text frame, got {msg:?}");
    };
    let update: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(
        update,
        serde_json::json!({
            "callId": "call-42",
            "status": 3,
            "message": "Звонок успешно завершен",
        })
    );
}
