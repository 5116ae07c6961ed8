//! Integration tests for the request/response (HTTP) connector against a
//! wiremock server.

use muve_client::{Connector, ConnectorError, Endpoint, TransportKind};
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collector() -> (impl Fn(String) + Send + Sync + 'static, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move |payload: String| {
            let _ = tx.send(payload);
        },
        rx,
    )
}

fn query_endpoint(server: &MockServer) -> Endpoint {
    Endpoint::new(format!("{}/query/", server.uri()))
}

#[tokio::test]
async fn send_posts_message_and_delivers_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query/"))
        .and(body_string("q1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let (cb, mut rx) = collector();
    let connector = Connector::new(query_endpoint(&server), TransportKind::RequestResponse, cb);
    connector.send("q1");

    let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("response should arrive")
        .unwrap();
    assert_eq!(got, r#"{"ok":true}"#);
}

#[tokio::test]
async fn construction_opens_nothing() {
    let server = MockServer::start().await;
    let (cb, _rx) = collector();

    let connector = Connector::new(query_endpoint(&server), TransportKind::RequestResponse, cb);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(connector.kind(), TransportKind::RequestResponse);
    assert_eq!(connector.status(), None);
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn concurrent_sends_are_independent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string("a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("answer a"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string("b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("answer b"))
        .expect(1)
        .mount(&server)
        .await;

    let (cb, mut rx) = collector();
    let connector = Connector::new(query_endpoint(&server), TransportKind::RequestResponse, cb);
    connector.send("a");
    connector.send("b");

    let mut got = Vec::new();
    for _ in 0..2 {
        let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        got.push(payload);
    }
    got.sort();
    assert_eq!(got, vec!["answer a", "answer b"]);
}

#[tokio::test]
async fn error_status_does_not_invoke_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let (cb, mut rx) = collector();
    let connector = Connector::new(query_endpoint(&server), TransportKind::RequestResponse, cb);
    connector.send("q");

    let waited = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
    assert!(waited.is_err(), "callback should not fire on 500, got {:?}", waited);
}

#[tokio::test]
async fn unreachable_endpoint_is_silent() {
    let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = reserved.local_addr().unwrap();
    drop(reserved);

    let (cb, mut rx) = collector();
    let endpoint = Endpoint::new(format!("{}/query/", addr)).with_secure(false);
    let connector = Connector::new(endpoint, TransportKind::RequestResponse, cb);
    connector.send("q");

    let waited = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
    assert!(waited.is_err());
}

#[test]
fn set_callback_is_rejected() {
    let (cb, _rx) = collector();
    let connector = Connector::new(
        Endpoint::new("localhost:7000/study"),
        TransportKind::RequestResponse,
        cb,
    );

    let err = connector.set_callback(|_| {}).unwrap_err();
    assert_eq!(
        err,
        ConnectorError::CallbackNotSwappable {
            kind: TransportKind::RequestResponse
        }
    );
}
