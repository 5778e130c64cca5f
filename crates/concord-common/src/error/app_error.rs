//! Application error types
//!
//! Top-level error for binaries built on the client: wraps configuration,
//! telemetry and gateway failures with stable codes and process exit codes.

use std::fmt;

use crate::config::ConfigError;
use crate::telemetry::TracingError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TracingError),

    // Gateway errors
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Gateway closed the session: {0}")]
    Gateway(String),

    // External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Process exit code for this error (sysexits where one fits)
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            // EX_CONFIG
            Self::Config(_) => 78,
            // EX_NOPERM
            Self::AuthenticationFailed(_) => 77,
            // EX_UNAVAILABLE
            Self::Gateway(_) | Self::ExternalService(_) => 69,
            // EX_SOFTWARE
            Self::Telemetry(_) | Self::Internal(_) => 70,
        }
    }

    /// Get a stable error code string
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether restarting the process with the same settings is pointless
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::AuthenticationFailed(_))
    }

    /// Create a gateway error from any displayable reason
    #[must_use]
    pub fn gateway(reason: impl fmt::Display) -> Self {
        Self::Gateway(reason.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
