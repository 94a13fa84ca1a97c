//! Shared error types and utilities for the presence project.
pub use color_eyre::Report;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Failed to install color_eyre")]
    ColorEyre(color_eyre::Report),
    #[error("Failed to install tracing-subscriber")]
    TracingSubscriber(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failures surfaced by the session registry.
///
/// Each variant maps onto one HTTP status class in the backend: validation
/// problems are the caller's fault, a missing session is a lookup miss, and
/// anything else is an internal failure whose detail never reaches the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to enumerate network interfaces: {0}")]
pub struct NetworkError(pub String);

impl From<NetworkError> for SessionError {
    fn from(err: NetworkError) -> Self {
        SessionError::Internal(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid host address: {0}")]
    InvalidHost(String),
    #[error("Invalid port: {0}")]
    InvalidPort(String),
    #[error("Unknown time zone: {0}")]
    InvalidTimezone(String),
}
