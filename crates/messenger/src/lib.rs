//! Meta messaging adapter for courier.
//!
//! Relays text between a business application and the Meta Graph API:
//! inbound webhook payloads (Messenger and Instagram shapes) are normalized
//! into canonical events, outbound sends go through a single-flight paced
//! delivery queue.

pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod queue;
pub mod routes;
pub mod types;
pub mod webhook;

pub use {
    client::{ClientConfig, MessengerClient, PageInfo},
    config::AccountConfig,
    error::{Error, Result},
    queue::DeliveryQueue,
    routes::{WebhookState, webhook_router},
    types::WebhookPayload,
    webhook::{events, verify_subscription},
};
