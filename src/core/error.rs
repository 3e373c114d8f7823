//! Error types for the driver layer.
//!
//! Errors propagate with `?` inside the crate and are folded into typed
//! outcomes (`bool` / [`ReadResult`](crate::core::data::ReadResult)) at the
//! driver contract boundary. Nothing in here is fatal.

use thiserror::Error;

use crate::core::point::DataType;

/// Crate-wide result alias.
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors raised by transports, converters and configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport could not be opened or closed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation requires an open transport.
    #[error("Not connected")]
    NotConnected,

    /// A single I/O wait exceeded the configured timeout.
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Error reported by the transport for a request.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Register payload cannot be decoded (wrong word count, non-finite float).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Data type / word order combination the converter does not define.
    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    /// Feature not supported by this driver.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Driver was disposed and can no longer be used.
    #[error("Driver disposed")]
    Disposed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for [`GatewayError::InvalidData`].
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Shorthand for [`GatewayError::Protocol`].
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build an [`GatewayError::InvalidDataType`] for a rejected data type.
    pub fn invalid_data_type(data_type: DataType) -> Self {
        Self::InvalidDataType(format!(
            "{} with word order {}",
            data_type.kind, data_type.order
        ))
    }

    /// Whether this error came from the value converter.
    #[inline]
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::InvalidDataType(_) | Self::InvalidData(_))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::point::{ValueKind, WordOrder};

    #[test]
    fn test_invalid_data_type_message() {
        let err = GatewayError::invalid_data_type(DataType::new(ValueKind::Int16, WordOrder::V3));
        assert_eq!(err.to_string(), "Invalid data type: int16 with word order dcba");
        assert!(err.is_conversion());
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(GatewayError::Timeout(3000).to_string(), "Timed out after 3000 ms");
        assert!(!GatewayError::NotConnected.is_conversion());
    }
}
