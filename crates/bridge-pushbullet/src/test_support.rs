//! In-memory fakes for the transport and sink traits.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use bridge_core::{
    ActionSink, BridgeError, BridgeErrorCategory, ConnectionState, FrameStream,
    NotificationSource, OutboundAck, PollBatch, PushAction, PushItem, StatusSink,
    StreamConnector,
};
use futures_util::StreamExt;

pub fn push(modified: f64, body: Option<&str>) -> PushItem {
    PushItem {
        body: body.map(str::to_owned),
        title: None,
        kind: "note".to_owned(),
        modified,
    }
}

/// Push service that filters its stored pushes by `modified_after`.
#[derive(Default)]
pub struct FakeSource {
    pushes: Mutex<Vec<PushItem>>,
    fetch_params: Mutex<Vec<f64>>,
    posted: Mutex<Vec<PushItem>>,
    fetch_status: Mutex<Option<u16>>,
    fetch_malformed: AtomicBool,
    fetch_hangs: AtomicBool,
    post_fails: AtomicBool,
}

impl FakeSource {
    pub fn with_pushes(pushes: Vec<PushItem>) -> Self {
        Self {
            pushes: Mutex::new(pushes),
            ..Self::default()
        }
    }

    pub fn add(&self, push: PushItem) {
        self.pushes.lock().expect("pushes lock").push(push);
    }

    pub fn fail_fetch_with_status(&self, status: u16) {
        *self.fetch_status.lock().expect("status lock") = Some(status);
    }

    pub fn fail_fetch_with_decode(&self) {
        self.fetch_malformed.store(true, Ordering::SeqCst);
    }

    /// Polls never answer, like a service that accepted the connection and
    /// went silent.
    pub fn hang_fetch(&self) {
        self.fetch_hangs.store(true, Ordering::SeqCst);
    }

    pub fn fail_post(&self) {
        self.post_fails.store(true, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_params.lock().expect("params lock").len()
    }

    pub fn fetch_params(&self) -> Vec<f64> {
        self.fetch_params.lock().expect("params lock").clone()
    }

    pub fn posted(&self) -> Vec<PushItem> {
        self.posted.lock().expect("posted lock").clone()
    }
}

impl NotificationSource for FakeSource {
    async fn fetch_pushes(&self, modified_after: f64) -> Result<PollBatch, BridgeError> {
        self.fetch_params
            .lock()
            .expect("params lock")
            .push(modified_after);
        if let Some(status) = *self.fetch_status.lock().expect("status lock") {
            return Err(BridgeError::http_status(status, "{\"error\":\"invalid access token\"}"));
        }
        if self.fetch_malformed.load(Ordering::SeqCst) {
            return PollBatch::decode("<html>502 Bad Gateway</html>")
                .map_err(|err| BridgeError::decode("poll response", &err));
        }
        if self.fetch_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let pushes = self
            .pushes
            .lock()
            .expect("pushes lock")
            .iter()
            .filter(|push| push.modified > modified_after)
            .cloned()
            .collect();
        Ok(PollBatch { pushes })
    }

    async fn post_push(&self, push: &PushItem) -> Result<String, BridgeError> {
        if self.post_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::new(
                BridgeErrorCategory::Transport,
                "post_failed",
                "POST failed: connection reset",
            ));
        }
        self.posted.lock().expect("posted lock").push(push.clone());
        Ok("{\"iden\":\"ujpah72o0\",\"active\":true}".to_owned())
    }
}

/// Records every host callback.
#[derive(Default)]
pub struct RecordingSink {
    panic_on: Option<PushAction>,
    panic_on_status: Option<String>,
    actions: Mutex<Vec<PushAction>>,
    acks: Mutex<Vec<OutboundAck>>,
    statuses: Mutex<Vec<(bool, String)>>,
    connection_changes: Mutex<Vec<ConnectionState>>,
}

impl RecordingSink {
    pub fn panicking_on(action: PushAction) -> Self {
        Self {
            panic_on: Some(action),
            ..Self::default()
        }
    }

    pub fn panicking_on_status(message: &str) -> Self {
        Self {
            panic_on_status: Some(message.to_owned()),
            ..Self::default()
        }
    }

    pub fn actions(&self) -> Vec<PushAction> {
        self.actions.lock().expect("actions lock").clone()
    }

    pub fn acks(&self) -> Vec<OutboundAck> {
        self.acks.lock().expect("acks lock").clone()
    }

    pub fn statuses(&self) -> Vec<(bool, String)> {
        self.statuses.lock().expect("statuses lock").clone()
    }

    pub fn connection_changes(&self) -> Vec<ConnectionState> {
        self.connection_changes
            .lock()
            .expect("connection lock")
            .clone()
    }

    pub fn has_status_containing(&self, needle: &str) -> bool {
        self.count_statuses_containing(needle) > 0
    }

    pub fn count_statuses_containing(&self, needle: &str) -> usize {
        self.statuses()
            .iter()
            .filter(|(_, message)| message.contains(needle))
            .count()
    }

    /// Watermarks reported at the end of each pass, in report order.
    pub fn watermark_trail(&self) -> Vec<f64> {
        self.statuses()
            .iter()
            .filter_map(|(_, message)| message.strip_prefix("last modified is now "))
            .filter_map(|value| value.parse::<f64>().ok())
            .collect()
    }
}

impl ActionSink for RecordingSink {
    fn on_action(&self, action: PushAction) {
        if self.panic_on == Some(action) {
            panic!("host callback rejected {action:?}");
        }
        self.actions.lock().expect("actions lock").push(action);
    }

    fn on_outbound_complete(&self, ack: &OutboundAck) {
        self.acks.lock().expect("acks lock").push(ack.clone());
    }
}

impl StatusSink for RecordingSink {
    fn on_status(&self, online: bool, message: &str) {
        if self.panic_on_status.as_deref() == Some(message) {
            panic!("host status callback rejected {message:?}");
        }
        self.statuses
            .lock()
            .expect("statuses lock")
            .push((online, message.to_owned()));
    }

    fn on_connection_changed(&self, state: ConnectionState) {
        self.connection_changes
            .lock()
            .expect("connection lock")
            .push(state);
    }
}

/// Connector that replays a fixed list of frames, or fails to connect.
pub struct FakeConnector {
    frames: Mutex<Option<Vec<Result<String, BridgeError>>>>,
    connect_error: Option<BridgeError>,
    credentials: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn with_frames(frames: Vec<&str>) -> Self {
        Self {
            frames: Mutex::new(Some(
                frames.into_iter().map(|frame| Ok(frame.to_owned())).collect(),
            )),
            connect_error: None,
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(frames: Vec<Result<String, BridgeError>>) -> Self {
        Self {
            frames: Mutex::new(Some(frames)),
            connect_error: None,
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            frames: Mutex::new(None),
            connect_error: Some(BridgeError::new(
                BridgeErrorCategory::Transport,
                "stream_connect_failed",
                "failed to set up websocket: connection refused",
            )),
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().expect("credentials lock").clone()
    }
}

impl StreamConnector for FakeConnector {
    async fn connect(&self, credential: &str) -> Result<FrameStream, BridgeError> {
        self.credentials
            .lock()
            .expect("credentials lock")
            .push(credential.to_owned());
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        let frames = self
            .frames
            .lock()
            .expect("frames lock")
            .take()
            .unwrap_or_default();
        Ok(futures_util::stream::iter(frames).boxed())
    }
}
