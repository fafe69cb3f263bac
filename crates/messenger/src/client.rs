//! Graph API delivery client.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

use courier_channels::{DeliveryResult, Outbound, OutboundMessage};

use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const TEXT_PREVIEW_CHARS: usize = 48;

/// Base URLs for the two Meta surfaces. Overridable so tests can point the
/// client at a local mock server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub messenger_base_url: String,
    pub instagram_base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            messenger_base_url: "https://graph.facebook.com/v21.0".into(),
            instagram_base_url: "https://graph.instagram.com/v21.0".into(),
        }
    }
}

/// Sends messages through the Meta Graph API.
///
/// Stateless apart from the connection pool: the bearer credential travels on
/// every [`OutboundMessage`] and is never cached here.
pub struct MessengerClient {
    http: reqwest::Client,
    config: ClientConfig,
}

/// Page metadata returned by [`MessengerClient::page`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Deserialize)]
struct GraphErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct LinkedAccountBody {
    instagram_business_account: Option<AccountRef>,
}

#[derive(Deserialize)]
struct AccountRef {
    id: String,
}

impl MessengerClient {
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    /// Deliver one message. Routes to the Instagram endpoint when the message
    /// carries an `instagram_account_id`, to Messenger's self endpoint
    /// otherwise; nothing else influences routing.
    pub async fn send(&self, msg: &OutboundMessage) -> Result<DeliveryResult> {
        let token = msg.access_token.expose_secret();
        if token.is_empty() {
            return Err(Error::MissingCredential);
        }

        let platform = msg.platform();
        let url = match msg.instagram_account_id.as_deref() {
            Some(account_id) => format!(
                "{}/{}/messages",
                self.config.instagram_base_url.trim_end_matches('/'),
                account_id
            ),
            None => format!(
                "{}/me/messages",
                self.config.messenger_base_url.trim_end_matches('/')
            ),
        };

        debug!(
            recipient_id = %msg.recipient_id,
            %platform,
            text = %preview(&msg.text),
            "sending message"
        );

        let body = serde_json::json!({
            "recipient": { "id": msg.recipient_id },
            "message": { "text": msg.text },
        });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = parse_graph_error(&raw).unwrap_or(raw);
            warn!(
                recipient_id = %msg.recipient_id,
                %platform,
                status = status.as_u16(),
                "provider rejected send: {message}"
            );
            return Err(Error::Delivery {
                status: status.as_u16(),
                message,
            });
        }

        let result: DeliveryResult = resp.json().await?;
        debug!(
            recipient_id = %msg.recipient_id,
            %platform,
            message_id = %result.message_id,
            "message delivered"
        );
        Ok(result)
    }

    /// Fetch page metadata by id.
    pub async fn page(&self, page_id: &str, access_token: &Secret<String>) -> Result<PageInfo> {
        let url = format!(
            "{}/{}?fields=id,name",
            self.config.messenger_base_url.trim_end_matches('/'),
            page_id
        );
        self.get_json(&url, access_token).await
    }

    /// Fetch the Instagram business-account id linked to a page, if any.
    pub async fn instagram_account_id(
        &self,
        page_id: &str,
        access_token: &Secret<String>,
    ) -> Result<Option<String>> {
        let url = format!(
            "{}/{}?fields=instagram_business_account",
            self.config.messenger_base_url.trim_end_matches('/'),
            page_id
        );
        let body: LinkedAccountBody = self.get_json(&url, access_token).await?;
        Ok(body.instagram_business_account.map(|a| a.id))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &Secret<String>,
    ) -> Result<T> {
        let token = access_token.expose_secret();
        if token.is_empty() {
            return Err(Error::MissingCredential);
        }
        let resp = self.http.get(url).bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = parse_graph_error(&raw).unwrap_or(raw);
            return Err(Error::Delivery {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Outbound for MessengerClient {
    async fn send(&self, msg: OutboundMessage) -> anyhow::Result<DeliveryResult> {
        Ok(MessengerClient::send(self, &msg).await?)
    }
}

fn parse_graph_error(body: &str) -> Option<String> {
    serde_json::from_str::<GraphErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TEXT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
