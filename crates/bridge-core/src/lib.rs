//! Core push-bridge contract shared between the runtime and host consumers.
//!
//! This crate defines the push record model, the watermark and classifier
//! used by reconciliation, the stream lifecycle, the command/event protocol,
//! and the transport/sink traits the engine is composed from.

/// Async command/event channel primitives.
pub mod channel;
/// Push body classification.
pub mod classifier;
/// Stable bridge error types and HTTP classification helpers.
pub mod error;
/// Event normalization helpers (outbound acks, status truncation).
pub mod normalization;
/// Host callback traits.
pub mod sink;
/// Transport traits.
pub mod source;
/// Stream listener lifecycle state machine.
pub mod state_machine;
/// Host-facing protocol and record types.
pub mod types;
/// Monotonic modification-time watermark.
pub mod watermark;

pub use channel::{BridgeChannelError, BridgeChannels, EventStream};
pub use classifier::classify;
pub use error::{BridgeError, BridgeErrorCategory, classify_http_status};
pub use normalization::{
    OutboundOutcome, STATUS_MESSAGE_MAX_CHARS, normalize_outbound_outcome, normalize_status,
    truncate_status,
};
pub use sink::{ActionSink, StatusSink};
pub use source::{FrameStream, NotificationSource, StreamConnector};
pub use state_machine::StreamStateMachine;
pub use types::{
    BridgeCommand, BridgeEvent, BridgeInitConfig, ConnectionState, DEFAULT_API_BASE,
    DEFAULT_STREAM_BASE, OutboundAck, PollBatch, PushAction, PushItem, StreamEnvelope,
    StreamLifecycleState,
};
pub use watermark::Watermark;
