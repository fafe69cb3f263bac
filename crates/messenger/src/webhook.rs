//! Webhook verification and inbound event normalization.

use {
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use courier_channels::{InboundEvent, Platform};

use crate::types::{Change, ChangeValue, Entry, MessagingItem, WebhookPayload};

#[cfg(feature = "metrics")]
use {crate::metrics::webhook as webhook_metrics, metrics::counter};

/// Verify a webhook subscription handshake (GET request).
///
/// Meta sends `hub.mode=subscribe`, `hub.verify_token=<configured secret>`
/// and `hub.challenge=<random string>`. Returns `Some(challenge)` when
/// verification succeeds.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &Secret<String>,
) -> Option<String> {
    let mode = mode?;
    let token = token?;
    let challenge = challenge?;

    if mode == "subscribe" && token == verify_token.expose_secret() {
        Some(challenge.to_string())
    } else {
        None
    }
}

/// Normalize a raw webhook payload into canonical inbound events.
///
/// Lazy, one pass, payload entry order. Entries that carry no usable message
/// are skipped — normalization never fails on malformed input, it degrades
/// to "no event for this entry".
pub fn events(payload: &WebhookPayload) -> impl Iterator<Item = InboundEvent> + '_ {
    payload.entry.iter().filter_map(normalize_entry)
}

fn normalize_entry(entry: &Entry) -> Option<InboundEvent> {
    let event = if let Some(messaging) = entry.messaging.as_deref() {
        normalize_messaging(messaging)
    } else if let Some(changes) = entry.changes.as_deref() {
        normalize_changes(changes)
    } else {
        None
    };

    match &event {
        Some(ev) => {
            debug!(recipient_id = %ev.recipient_id, platform = %ev.platform, "normalized inbound event");
            #[cfg(feature = "metrics")]
            counter!(webhook_metrics::EVENTS_TOTAL).increment(1);
        },
        None => {
            debug!("webhook entry carried no usable message, skipping");
            #[cfg(feature = "metrics")]
            counter!(webhook_metrics::ENTRIES_SKIPPED_TOTAL).increment(1);
        },
    }
    event
}

/// Messenger-shaped entry: only `messaging[0]` is consulted.
fn normalize_messaging(items: &[MessagingItem]) -> Option<InboundEvent> {
    let first = items.first()?;
    let sender = first.sender.as_ref().filter(|s| !s.id.is_empty())?;
    let message = first.message.as_ref()?;
    Some(InboundEvent {
        recipient_id: sender.id.clone(),
        text: message.text.clone().unwrap_or_default(),
        platform: Platform::Messenger,
    })
}

/// Instagram-shaped entry: only `changes[0]` is consulted.
fn normalize_changes(changes: &[Change]) -> Option<InboundEvent> {
    let value = &changes.first()?.value;
    let (recipient_id, text) = resolve_change_message(value)?;
    Some(InboundEvent {
        recipient_id,
        text,
        platform: Platform::Instagram,
    })
}

/// Resolve the message object out of an Instagram change value.
///
/// Meta has emitted two shapes over time: the message nested under
/// `value.messages[0]` (Branch A) or inlined in the value itself (Branch B).
/// Both must keep working until the provider settles on one.
fn resolve_change_message(value: &ChangeValue) -> Option<(String, String)> {
    if let Some(msg) = value.messages.first() {
        let from = msg.from.as_ref().filter(|f| !f.id.is_empty())?;
        let text = msg
            .text
            .clone()
            .or_else(|| msg.message.as_ref().and_then(|m| m.text.clone()))
            .unwrap_or_default();
        return Some((from.id.clone(), text));
    }

    let from = value.from.as_ref().filter(|f| !f.id.is_empty())?;
    let text = value
        .text
        .clone()
        .or_else(|| value.message.as_ref().and_then(|m| m.text.clone()))
        .unwrap_or_default();
    Some((from.id.clone(), text))
}
