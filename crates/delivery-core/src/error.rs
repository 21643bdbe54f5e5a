use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ConnectionState;

/// Broad error category used for recovery policy and user-facing handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryErrorCategory {
    /// Transport failure before a status code arrived.
    Network,
    /// Unexpected status code or otherwise broken server behavior.
    Protocol,
    /// Server-signaled idle timeout (502); expected and recoverable.
    Timeout,
    /// Invalid input or configuration.
    Config,
    /// Malformed request or response body.
    Serialization,
    /// Internal bug or invariant break.
    Internal,
}

/// Stable error payload produced by the delivery components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct DeliveryError {
    /// High-level error category.
    pub category: DeliveryErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl DeliveryError {
    /// Construct a new delivery error.
    pub fn new(
        category: DeliveryErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: ConnectionState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            DeliveryErrorCategory::Internal,
            "invalid_connection_transition",
            format!("cannot run '{action}' while the connection is in state {current:?}"),
        )
    }

    /// Whether this error is the expected server-side idle timeout.
    pub fn is_timeout(&self) -> bool {
        self.category == DeliveryErrorCategory::Timeout
    }
}

/// Map an HTTP status code to a delivery error category.
///
/// 502 is the server's idle-timeout signal, not a true error.
pub fn classify_http_status(status: u16) -> DeliveryErrorCategory {
    match status {
        502 => DeliveryErrorCategory::Timeout,
        400..=599 => DeliveryErrorCategory::Protocol,
        _ => DeliveryErrorCategory::Internal,
    }
}
