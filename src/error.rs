//! Error types for ZAKIA.
//!
//! The dialog core never surfaces these to the user as errors: per the flow's
//! failure policy, every service failure becomes a notice plus a defined
//! state. These types stop at the service and config boundaries.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the external collaborators (calendar lookup, computation,
/// reminder persistence).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{service} request failed: {reason}")]
    RequestFailed {
        service: &'static str,
        reason: String,
    },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, AssistError>;
