use thiserror::Error;

/// Typed failure of a single remote call, or of a precondition checked before one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The request never reached the server or the response never arrived.
    #[error("network failure: {0}")]
    Network(String),

    /// Non-2xx status, or a 2xx envelope with `success: false`.
    #[error("http {status}: {}", message.as_deref().unwrap_or("no message"))]
    Http { status: u16, message: Option<String> },

    /// Body was not valid JSON or did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Client-side precondition violated; no request was made.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self { ClientError::Validation(msg.into()) }

    /// Failures produced by the network layer; optimistic mutations revert on these.
    pub fn is_network_layer(&self) -> bool { !matches!(self, ClientError::Validation(_)) }

    /// Message suitable for a page-level banner.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Http { message: Some(m), .. } => m.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self { ClientError::Decode(e.to_string()) }
}

pub type ApiResult<T> = Result<T, ClientError>;
