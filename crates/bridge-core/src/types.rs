use serde::{Deserialize, Serialize};

/// Default Pushbullet REST base URL.
pub const DEFAULT_API_BASE: &str = "https://api.pushbullet.com/v2";
/// Default Pushbullet event stream base URL (credential is appended).
pub const DEFAULT_STREAM_BASE: &str = "wss://stream.pushbullet.com/websocket";

/// One notification record exchanged with the push service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PushItem {
    /// Message text, absent for link/file pushes without a body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Optional message title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Service-defined category, for example `note`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Service-assigned modification time in fractional seconds since epoch.
    #[serde(default, skip_serializing_if = "is_unset_timestamp")]
    pub modified: f64,
}

impl PushItem {
    /// Build a `note` push for outbound posting.
    pub fn note(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            title: Some(title.into()),
            kind: "note".to_owned(),
            modified: 0.0,
        }
    }
}

fn is_unset_timestamp(value: &f64) -> bool {
    *value == 0.0
}

/// Decoded `GET /pushes` response, items in service order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PollBatch {
    #[serde(default)]
    pub pushes: Vec<PushItem>,
}

impl PollBatch {
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn len(&self) -> usize {
        self.pushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pushes.is_empty()
    }
}

/// Lightweight frame received on the event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamEnvelope {
    /// Signal type, for example `tickle` or `nop`.
    #[serde(rename = "type")]
    pub signal_type: String,
    /// Signal subtype; only meaningful for `tickle`.
    #[serde(default)]
    pub subtype: Option<String>,
}

impl StreamEnvelope {
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Heartbeat frames carry no information and are not reported.
    pub fn is_heartbeat(&self) -> bool {
        self.signal_type == "nop"
    }

    /// `tickle` with subtype `push`: the push list changed.
    pub fn is_push_tickle(&self) -> bool {
        self.signal_type == "tickle" && self.subtype.as_deref() == Some("push")
    }
}

/// Semantic action derived from an inbound push body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PushAction {
    Unlock,
    Ignore,
}

/// Last known status of the persistent stream connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Offline,
    Online,
}

impl ConnectionState {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Lifecycle of the stream listener.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StreamLifecycleState {
    /// No connect attempt has been made yet.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Connected and receiving frames.
    Online,
    /// Connect failed or the connection dropped. No automatic reconnect.
    Offline,
}

impl StreamLifecycleState {
    pub fn connection_state(self) -> ConnectionState {
        match self {
            Self::Online => ConnectionState::Online,
            _ => ConnectionState::Offline,
        }
    }
}

/// Runtime configuration supplied when spawning the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeInitConfig {
    /// REST base URL, without trailing slash.
    pub api_base: String,
    /// Stream base URL; `/<credential>` is appended on connect.
    pub stream_base: String,
    /// Optional timeout for HTTP requests and the stream handshake.
    ///
    /// When `None`, transport defaults apply.
    pub request_timeout_ms: Option<u64>,
}

impl Default for BridgeInitConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            stream_base: DEFAULT_STREAM_BASE.to_owned(),
            request_timeout_ms: None,
        }
    }
}

/// Command channel input accepted by the bridge runtime.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum BridgeCommand {
    /// Store the credential, run one reconciliation pass and open the stream.
    Initialize {
        /// Pushbullet access token.
        access_token: String,
    },
    /// Post the doorbell push.
    Doorbell {
        /// Host-provided id echoed in `OutboundComplete`.
        client_txn_id: String,
    },
    /// Run one reconciliation pass now.
    Reconcile,
}

impl std::fmt::Debug for BridgeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialize { .. } => f
                .debug_struct("Initialize")
                .field("access_token", &"<redacted>")
                .finish(),
            Self::Doorbell { client_txn_id } => f
                .debug_struct("Doorbell")
                .field("client_txn_id", client_txn_id)
                .finish(),
            Self::Reconcile => f.write_str("Reconcile"),
        }
    }
}

/// Completion record for one outbound doorbell post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundAck {
    /// Original host transaction ID.
    pub client_txn_id: String,
    /// Stable bridge error code on failure.
    pub error_code: Option<String>,
}

/// Event channel output emitted by the bridge runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A push body was classified into an action.
    Action { action: PushAction },
    /// A doorbell post finished, successfully or not.
    OutboundComplete(OutboundAck),
    /// Operational status line, truncated for host display.
    Status { online: bool, message: String },
    /// Stream connection went online or offline.
    ConnectionChanged { state: ConnectionState },
}
