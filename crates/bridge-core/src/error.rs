use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::StreamLifecycleState;

/// Broad error category used for status reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BridgeErrorCategory {
    /// Invalid input or use before initialization.
    Config,
    /// Non-success response from the push service, usually a bad credential.
    Auth,
    /// Connect, send or receive failure at the transport layer.
    Transport,
    /// Malformed JSON in a poll response or stream frame.
    Decode,
    /// Failure while classifying or dispatching a single push.
    Classification,
    /// Internal bridge bug or invariant break.
    Internal,
}

/// Stable bridge error payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct BridgeError {
    /// High-level error category.
    pub category: BridgeErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// HTTP status when the error came from a service response.
    pub status: Option<u16>,
}

impl BridgeError {
    pub fn new(
        category: BridgeErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Build the error for a non-success service response.
    pub fn http_status(status: u16, body: &str) -> Self {
        let category = classify_http_status(status).unwrap_or(BridgeErrorCategory::Internal);
        Self {
            category,
            code: "http_status".to_owned(),
            message: format!("bad access token? {status}: {body}"),
            status: Some(status),
        }
    }

    pub fn decode(what: &str, err: &serde_json::Error) -> Self {
        Self::new(
            BridgeErrorCategory::Decode,
            "decode_error",
            format!("failed to decode {what}: {err}"),
        )
    }

    pub fn not_initialized(action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            BridgeErrorCategory::Config,
            "not_initialized",
            format!("cannot run '{action}' before the bridge is initialized"),
        )
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: StreamLifecycleState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            BridgeErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while stream is in state {current:?}"),
        )
    }
}

/// Map an HTTP status to an error category; `None` means success.
///
/// Only 200 is success; any other status is reported as `Auth`.
pub fn classify_http_status(status: u16) -> Option<BridgeErrorCategory> {
    match status {
        200 => None,
        _ => Some(BridgeErrorCategory::Auth),
    }
}
