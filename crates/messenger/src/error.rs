use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A send was attempted without a usable bearer credential.
    #[error("missing access token for outbound send")]
    MissingCredential,

    /// The provider rejected the send.
    #[error("delivery failed ({status}): {message}")]
    Delivery { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
