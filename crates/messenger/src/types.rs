//! Raw webhook payload types.
//!
//! Meta delivers two entry shapes on one endpoint: Messenger entries carry a
//! `messaging` array, Instagram entries carry a `changes` array. Every nested
//! field is optional so that structurally unexpected payloads deserialize
//! instead of erroring; the normalizer decides what is usable.

use serde::Deserialize;

/// Top-level webhook body: `{ "object": "page" | "instagram", "entry": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One webhook entry — Messenger-shaped (`messaging`), Instagram-shaped
/// (`changes`), or neither.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    pub messaging: Option<Vec<MessagingItem>>,
    pub changes: Option<Vec<Change>>,
}

/// Element of a Messenger `messaging` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagingItem {
    pub sender: Option<Sender>,
    pub message: Option<MessageBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    pub text: Option<String>,
}

/// Element of an Instagram `changes` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

/// The ambiguous Instagram change value. Historically Meta has delivered the
/// message either nested under `messages` or inlined in the value itself;
/// both shapes must keep working (see `webhook::resolve_change_message`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<ChangeMessage>,
    pub from: Option<Sender>,
    pub text: Option<String>,
    pub message: Option<MessageBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeMessage {
    pub from: Option<Sender>,
    pub text: Option<String>,
    pub message: Option<MessageBody>,
}
