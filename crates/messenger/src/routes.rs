//! Webhook HTTP surface.
//!
//! `GET /webhook/meta[/{routing_key}]` answers the subscription handshake.
//! `POST` on the same paths acknowledges with 200 before any processing:
//! the body is handed to a detached task that parses, normalizes and feeds
//! the sink, so provider retries are never triggered by slow business logic.

use std::sync::Arc;

use {
    axum::{
        Router,
        body::Bytes,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
    },
    secrecy::Secret,
    serde::Deserialize,
    tracing::{debug, warn},
};

use courier_channels::InboundSink;

use crate::{config::AccountConfig, types::WebhookPayload, webhook};

/// State shared by the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    verify_token: Secret<String>,
    sink: Arc<dyn InboundSink>,
}

impl WebhookState {
    pub fn new(verify_token: Secret<String>, sink: Arc<dyn InboundSink>) -> Self {
        Self { verify_token, sink }
    }

    /// Convenience constructor taking the account's configured verify token.
    pub fn for_account(config: &AccountConfig, sink: Arc<dyn InboundSink>) -> Self {
        Self::new(config.verify_token.clone(), sink)
    }
}

/// Build the webhook router. The optional routing key segment is accepted
/// and logged but does not fan out to different accounts.
pub fn webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook/meta", get(verify_handler).post(receive_handler))
        .route(
            "/webhook/meta/{routing_key}",
            get(verify_handler).post(receive_handler),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

async fn verify_handler(
    State(state): State<WebhookState>,
    routing_key: Option<Path<String>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let routing_key = routing_key.map(|Path(k)| k);
    match webhook::verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        &state.verify_token,
    ) {
        Some(challenge) => {
            debug!(?routing_key, "webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        },
        None => {
            warn!(?routing_key, "webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        },
    }
}

async fn receive_handler(
    State(state): State<WebhookState>,
    routing_key: Option<Path<String>>,
    body: Bytes,
) -> StatusCode {
    let routing_key = routing_key.map(|Path(k)| k);
    tokio::spawn(process_payload(Arc::clone(&state.sink), body, routing_key));
    StatusCode::OK
}

/// Detached processing task. Failures end here, logged; they can never reach
/// the already-sent HTTP acknowledgment.
async fn process_payload(sink: Arc<dyn InboundSink>, body: Bytes, routing_key: Option<String>) {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(?routing_key, "discarding unparseable webhook body: {e}");
            return;
        },
    };
    for event in webhook::events(&payload) {
        if let Err(e) = sink.handle(event).await {
            warn!(?routing_key, "inbound sink failed: {e:#}");
        }
    }
}
