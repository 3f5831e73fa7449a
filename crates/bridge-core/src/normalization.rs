use crate::{
    error::BridgeError,
    types::{BridgeEvent, OutboundAck},
};

/// Host-facing status lines are capped at this many characters.
pub const STATUS_MESSAGE_MAX_CHARS: usize = 200;

/// Outbound post result before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundOutcome {
    /// Post accepted; carries the raw response body.
    Success { response: String },
    /// Post failed with bridge error details.
    Failure { error: BridgeError },
}

/// Convert an outbound outcome to a stable `OutboundAck`.
pub fn normalize_outbound_outcome(
    client_txn_id: impl Into<String>,
    outcome: &OutboundOutcome,
) -> OutboundAck {
    let client_txn_id = client_txn_id.into();
    match outcome {
        OutboundOutcome::Success { .. } => OutboundAck {
            client_txn_id,
            error_code: None,
        },
        OutboundOutcome::Failure { error } => OutboundAck {
            client_txn_id,
            error_code: Some(error.code.clone()),
        },
    }
}

/// Cut a status line to `STATUS_MESSAGE_MAX_CHARS` characters.
pub fn truncate_status(message: &str) -> &str {
    match message.char_indices().nth(STATUS_MESSAGE_MAX_CHARS) {
        Some((cut, _)) => &message[..cut],
        None => message,
    }
}

/// Build a `Status` event with the host-facing (truncated) message.
pub fn normalize_status(online: bool, message: &str) -> BridgeEvent {
    BridgeEvent::Status {
        online,
        message: truncate_status(message).to_owned(),
    }
}
