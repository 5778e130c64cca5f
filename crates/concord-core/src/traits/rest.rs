use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type for REST calls
pub type RestResult<T> = Result<T, RestError>;

/// HTTP method of a REST call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of a REST call
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub body: Value,
}

impl RestResponse {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body into a typed value
    pub fn json<T: DeserializeOwned>(&self) -> RestResult<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| RestError::Decode(e.to_string()))
    }
}

/// REST collaborator errors
#[derive(Debug, Error)]
pub enum RestError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl RestError {
    /// Errors worth retrying after a delay
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Unauthorized | Self::Decode(_) => false,
        }
    }
}

/// Out-of-band REST access
///
/// Retry and rate-limit handling belong to the implementation, not to the
/// gateway.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn send(&self, method: RestMethod, path: &str, body: Option<Value>)
        -> RestResult<RestResponse>;
}
