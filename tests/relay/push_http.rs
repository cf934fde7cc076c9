//! Push endpoint over HTTP.
//!
//! Starts an axum server and exercises it with reqwest.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use event_relay::push::{self, PushEndpoint};
use event_relay::{
    AuthError, ConfigError, Envelope, JsonSerializer, PushAuthenticator, PushOptions, Receiver,
};
use serde_json::{json, Value};

use crate::support::{order, registry, CountingObserver, OrderPlaced};

struct Fixture {
    base: String,
    observer: Arc<CountingObserver>,
    handled: Arc<AtomicUsize>,
}

fn options() -> PushOptions {
    PushOptions {
        subscribe_path: "/events/push".into(),
        require_auth_validation: true,
        ..PushOptions::default()
    }
}

fn authenticator() -> PushAuthenticator {
    PushAuthenticator::from_options(&options())
        .unwrap()
        .with_custom_validator(|token: &str| {
            if token == "letmein" {
                Ok(())
            } else {
                Err(AuthError::Rejected)
            }
        })
}

/// Bind to port 0 and return the base URL.
async fn start_server() -> Fixture {
    start_server_with(authenticator()).await
}

async fn start_server_with(authenticator: PushAuthenticator) -> Fixture {
    let observer = CountingObserver::new();
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();
    let receiver = Receiver::new(registry())
        .with_observer(observer.clone())
        .on("count", move |_: &Envelope<OrderPlaced>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let endpoint =
        PushEndpoint::new(Arc::new(receiver), authenticator, &options()).unwrap();
    let app = push::router(Arc::new(endpoint));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Fixture {
        base: format!("http://{addr}"),
        observer,
        handled,
    }
}

fn envelope_bytes(name: &str, version: u32) -> Vec<u8> {
    JsonSerializer
        .serialize(&Envelope::new(order("o-1"), name, version))
        .unwrap()
}

async fn post(fixture: &Fixture, token: Option<&str>, body: Vec<u8>) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(format!("{}/events/push", fixture.base))
        .header("content-type", "application/json")
        .body(body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn health_lists_registered_events() {
    let fixture = start_server().await;
    let resp = reqwest::get(format!("{}/health", fixture.base)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["events"], json!(["OrderPlaced", "OrderPlaced@v2", "Ping@v3"]));
}

#[tokio::test]
async fn bare_envelope_is_acked() {
    let fixture = start_server().await;
    let resp = post(&fixture, Some("letmein"), envelope_bytes("OrderPlaced", 1)).await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ack"], true);
    assert_eq!(fixture.handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn push_wrapper_is_unwrapped() {
    let fixture = start_server().await;
    let wrapper = json!({
        "message": {
            "data": STANDARD.encode(envelope_bytes("OrderPlaced", 1)),
            "messageId": "1234",
            "attributes": { "content-type": "application/json" }
        },
        "subscription": "projects/shop/subscriptions/orders-push"
    });

    let resp = post(&fixture, Some("letmein"), serde_json::to_vec(&wrapper).unwrap()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_or_bad_credentials_are_unauthorized() {
    let fixture = start_server().await;

    let resp = post(&fixture, None, envelope_bytes("OrderPlaced", 1)).await;
    assert_eq!(resp.status(), 401);
    let resp = post(&fixture, Some("wrong"), envelope_bytes("OrderPlaced", 1)).await;
    assert_eq!(resp.status(), 401);

    assert_eq!(fixture.handled.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.observer.unauthorized_count(), 2);
}

#[tokio::test]
async fn unregistered_is_acked_and_malformed_is_refused() {
    let fixture = start_server().await;

    let resp = post(&fixture, Some("letmein"), envelope_bytes("OrderShipped", 1)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.observer.unregistered_count(), 1);

    let resp = post(&fixture, Some("letmein"), b"{ nope".to_vec()).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ack"], false);
    assert_eq!(fixture.observer.malformed_count(), 1);

    assert_eq!(fixture.handled.load(Ordering::SeqCst), 0);
}

#[test]
fn required_auth_without_validator_does_not_start() {
    let result = PushEndpoint::new(
        Arc::new(Receiver::new(registry())),
        PushAuthenticator::from_options(&options()).unwrap(),
        &options(),
    );
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[tokio::test]
async fn required_option_applies_to_an_authenticator_built_without_it() {
    let authenticator = PushAuthenticator::disabled()
        .with_custom_validator(|_: &str| Err(AuthError::Rejected))
        .require(false);
    let fixture = start_server_with(authenticator).await;

    let resp = post(&fixture, None, envelope_bytes("OrderPlaced", 1)).await;
    assert_eq!(resp.status(), 401);
    let resp = post(&fixture, Some("letmein"), envelope_bytes("OrderPlaced", 1)).await;
    assert_eq!(resp.status(), 401);

    assert_eq!(fixture.handled.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.observer.unauthorized_count(), 2);
}

#[test]
fn required_option_with_disabled_authenticator_does_not_start() {
    let result = PushEndpoint::new(
        Arc::new(Receiver::new(registry())),
        PushAuthenticator::disabled(),
        &options(),
    );
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
