//! HTTP push endpoint - the broker POSTs deliveries, we answer 2xx to ack.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST <subscribe_path>` - authenticate, unwrap, receive. Status codes:
//!   `200` acknowledged (including unregistered and undecodable events),
//!   `400` malformed envelope, `401` authentication failed.
//! - `GET /health` - returns `{ "ok": true, "events": [...] }`.
//!
//! ## Example
//!
//! ```ignore
//! let endpoint = Arc::new(PushEndpoint::new(receiver, authenticator, &push_options)?);
//!
//! // Compose with other axum routes
//! let app = push::router(endpoint.clone());
//!
//! // Or serve directly
//! push::serve(endpoint, "0.0.0.0:8080").await?;
//! ```

mod wrapper;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::debug;

use crate::auth::PushAuthenticator;
use crate::config::PushOptions;
use crate::error::ConfigError;
use crate::receiver::{Receipt, Receiver};

pub use wrapper::{unwrap_push_body, PushDelivery};

/// A receiver bound to a push path and an authenticator.
pub struct PushEndpoint {
    receiver: Arc<Receiver>,
    authenticator: PushAuthenticator,
    path: String,
}

impl PushEndpoint {
    /// Fails when the options or the authenticator are inconsistent.
    ///
    /// `require_auth_validation` in the options always applies, whatever the
    /// authenticator was built with.
    pub fn new(
        receiver: Arc<Receiver>,
        authenticator: PushAuthenticator,
        options: &PushOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let authenticator = if options.require_auth_validation && !authenticator.is_required() {
            authenticator.require(true)
        } else {
            authenticator
        };
        authenticator.validate()?;
        Ok(Self {
            receiver,
            authenticator,
            path: options.subscribe_path.clone(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Run one request through authentication and the receiver.
    pub async fn handle(
        &self,
        authorization: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Response {
        if let Err(e) = self.authenticator.authenticate(authorization).await {
            self.receiver.observer().unauthorized(&e);
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": e.to_string() })))
                .into_response();
        }

        let delivery = match unwrap_push_body(body, content_type) {
            Ok(delivery) => delivery,
            Err(e) => {
                self.receiver.observer().malformed(&e);
                let receipt = Receipt::Malformed(e.to_string());
                return receipt_response(&receipt);
            }
        };
        debug!(
            message_id = delivery.message_id.as_deref().unwrap_or(""),
            subscription = delivery.subscription.as_deref().unwrap_or(""),
            "push delivery received"
        );

        let receipt = self
            .receiver
            .receive(&delivery.body, delivery.content_type.as_deref());
        receipt_response(&receipt)
    }
}

fn receipt_response(receipt: &Receipt) -> Response {
    let status = if receipt.is_ack() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    let body = json!({ "ack": receipt.is_ack(), "outcome": receipt.to_string() });
    (status, Json(body)).into_response()
}

/// Build an axum `Router` serving the push path and `/health`.
pub fn router(endpoint: Arc<PushEndpoint>) -> Router {
    let path = endpoint.path.clone();
    Router::new()
        .route("/health", get(health_handler))
        .route(&path, post(push_handler))
        .with_state(endpoint)
}

/// Serve the endpoint over HTTP at the given address (e.g. `"0.0.0.0:8080"`).
pub async fn serve(endpoint: Arc<PushEndpoint>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(endpoint);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// `GET /health` - returns `{ "ok": true, "events": [...] }`.
async fn health_handler(State(endpoint): State<Arc<PushEndpoint>>) -> impl IntoResponse {
    let events = endpoint.receiver.registry().names();
    Json(json!({ "ok": true, "events": events }))
}

async fn push_handler(
    State(endpoint): State<Arc<PushEndpoint>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = header_str(&headers, AUTHORIZATION.as_str());
    let content_type = header_str(&headers, CONTENT_TYPE.as_str());
    endpoint.handle(authorization, content_type, &body).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
