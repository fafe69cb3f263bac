use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

// ── Canonical message types ─────────────────────────────────────────────────

/// Which Meta surface a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Facebook Messenger (self-scoped `/me/messages` endpoint).
    Messenger,
    /// Instagram messaging (requires a linked business-account id).
    Instagram,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Messenger => f.write_str("messenger"),
            Self::Instagram => f.write_str("instagram"),
        }
    }
}

/// One normalized inbound message, produced from a raw webhook payload.
///
/// Consumed immediately by the business sink; never stored by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundEvent {
    /// Opaque per-user-per-app sender id, usable as a send target.
    pub recipient_id: String,
    pub text: String,
    pub platform: Platform,
}

/// One outbound send request. Ephemeral; constructed per call.
#[derive(Clone)]
pub struct OutboundMessage {
    pub recipient_id: String,
    pub text: String,
    /// Bearer credential for this one call. Callers supply it; the delivery
    /// layer never caches it.
    pub access_token: Secret<String>,
    /// When set, the send targets Instagram messaging scoped to this
    /// business-account id; when absent, Messenger's self endpoint.
    pub instagram_account_id: Option<String>,
}

impl std::fmt::Debug for OutboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundMessage")
            .field("recipient_id", &self.recipient_id)
            .field("text", &self.text)
            .field("access_token", &"[REDACTED]")
            .field("instagram_account_id", &self.instagram_account_id)
            .finish()
    }
}

impl OutboundMessage {
    /// Target platform implied by the account selector.
    #[must_use]
    pub fn platform(&self) -> Platform {
        if self.instagram_account_id.is_some() {
            Platform::Instagram
        } else {
            Platform::Messenger
        }
    }
}

/// Provider acknowledgment for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryResult {
    pub message_id: String,
}

// ── Seam traits ─────────────────────────────────────────────────────────────

/// Caller-supplied business logic for inbound messages — the webhook layer
/// invokes this once per normalized event, in emission order.
#[async_trait]
pub trait InboundSink: Send + Sync {
    /// Handle one inbound event. Errors are logged at the webhook task
    /// boundary and never affect the HTTP acknowledgment.
    async fn handle(&self, event: InboundEvent) -> Result<()>;
}

/// Deliver one message to a channel.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, msg: OutboundMessage) -> Result<DeliveryResult>;
}
