//! Gateway client errors

use crate::protocol::{CloseCode, CodecError};
use crate::transport::TransportError;
use concord_common::{AppError, ConfigError};
use concord_core::RestError;
use thiserror::Error;

/// Errors surfaced by the gateway client
#[derive(Debug, Error)]
pub enum GatewayError {
    // Terminal
    #[error("Authentication failed: the token was rejected")]
    AuthenticationFailed,

    #[error("Gateway closed the session: {} ({})", .0.description(), .0.as_u16())]
    FatalClose(CloseCode),

    #[error("Client was shut down")]
    Shutdown,

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Usage
    #[error("Not connected")]
    NotConnected,

    #[error("Client already started")]
    AlreadyStarted,

    // Collaborators
    #[error("Gateway URL discovery failed: {0}")]
    Discovery(#[source] RestError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::FatalClose(_) => "FATAL_CLOSE",
            Self::Shutdown => "SHUTDOWN",
            Self::Config(_) => "CONFIG_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::Discovery(_) => "DISCOVERY_FAILED",
            Self::Codec(_) => "CODEC_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors that end the session for good
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed | Self::FatalClose(_) | Self::Shutdown | Self::Config(_)
        )
    }

    /// Map a fatal close code to its error
    pub fn from_close(code: CloseCode) -> Self {
        match code {
            CloseCode::AuthenticationFailed => Self::AuthenticationFailed,
            other => Self::FatalClose(other),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::AuthenticationFailed => AppError::AuthenticationFailed(err.to_string()),
            GatewayError::Config(config) => AppError::Config(config),
            GatewayError::Discovery(rest) => AppError::ExternalService(rest.to_string()),
            GatewayError::Internal(message) => AppError::internal(anyhow::anyhow!(message)),
            other => AppError::gateway(other),
        }
    }
}
