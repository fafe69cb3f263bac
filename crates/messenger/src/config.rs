use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use courier_channels::OutboundMessage;

/// Configuration for a single Meta messaging account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Secret compared against `hub.verify_token` on the webhook handshake.
    #[serde(serialize_with = "serialize_secret")]
    pub verify_token: Secret<String>,

    /// Page access token used for outbound sends, when the caller does not
    /// supply one per call.
    #[serde(serialize_with = "serialize_secret")]
    pub page_access_token: Secret<String>,

    /// Instagram business-account id linked to the page, if messaging on
    /// Instagram is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram_account_id: Option<String>,
}

impl AccountConfig {
    /// Build an outbound message carrying this account's credential and
    /// Instagram selector.
    #[must_use]
    pub fn outbound_message(
        &self,
        recipient_id: impl Into<String>,
        text: impl Into<String>,
    ) -> OutboundMessage {
        OutboundMessage {
            recipient_id: recipient_id.into(),
            text: text.into(),
            access_token: self.page_access_token.clone(),
            instagram_account_id: self.instagram_account_id.clone(),
        }
    }
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("verify_token", &"[REDACTED]")
            .field("page_access_token", &"[REDACTED]")
            .field("instagram_account_id", &self.instagram_account_id)
            .finish()
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            verify_token: Secret::new(String::new()),
            page_access_token: Secret::new(String::new()),
            instagram_account_id: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
