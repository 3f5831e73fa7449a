use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bridge_core::{
    ActionSink, BridgeError, BridgeErrorCategory, ConnectionState, NotificationSource,
    OutboundAck, OutboundOutcome, PushAction, PushItem, StatusSink, Watermark, classify,
    normalize_outbound_outcome, truncate_status,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DOORBELL_TITLE: &str = "Crestron Doorbell!";
pub const DOORBELL_BODY: &str = "Reply Unlock or Ignore.";

/// Watermark handle shared by every engine built for one bridge.
pub type SharedWatermark = Arc<Mutex<Watermark>>;

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileSummary {
    /// Pushes returned by the service.
    pub items: usize,
    /// Actions dispatched, in batch order.
    pub actions: Vec<PushAction>,
    /// Watermark after the pass.
    pub watermark: f64,
}

/// Owns the watermark and wires the push source to the host sinks.
///
/// Reconciliation passes are serialized: the watermark lock is held from the
/// read that builds the query until the last advance of the batch. Engines
/// built with the same [`SharedWatermark`] serialize against each other too.
#[derive(Debug)]
pub struct ReconciliationEngine<S, A, T> {
    source: S,
    actions: A,
    status: T,
    watermark: SharedWatermark,
    online: AtomicBool,
}

impl<S, A, T> ReconciliationEngine<S, A, T>
where
    S: NotificationSource,
    A: ActionSink,
    T: StatusSink,
{
    pub fn new(source: S, actions: A, status: T) -> Self {
        Self::with_watermark(source, actions, status, SharedWatermark::default())
    }

    /// Build an engine that continues from an existing watermark.
    pub fn with_watermark(source: S, actions: A, status: T, watermark: SharedWatermark) -> Self {
        Self {
            source,
            actions,
            status,
            watermark,
            online: AtomicBool::new(false),
        }
    }

    pub fn shared_watermark(&self) -> SharedWatermark {
        Arc::clone(&self.watermark)
    }

    pub fn connection_state(&self) -> ConnectionState {
        if self.online.load(Ordering::Acquire) {
            ConnectionState::Online
        } else {
            ConnectionState::Offline
        }
    }

    pub(crate) fn set_connection_state(&self, state: ConnectionState) {
        let was_online = self.online.swap(state.is_online(), Ordering::AcqRel);
        if was_online != state.is_online() {
            self.status.on_connection_changed(state);
        }
    }

    /// Current watermark. Waits for an in-flight pass to finish.
    pub async fn watermark(&self) -> f64 {
        self.watermark.lock().await.current()
    }

    /// Log the full message and forward the truncated one to the host.
    pub fn report(&self, message: &str) {
        let online = self.connection_state().is_online();
        info!(online, "{message}");
        self.status.on_status(online, truncate_status(message));
    }

    pub fn report_error(&self, err: &BridgeError) {
        let online = self.connection_state().is_online();
        warn!(
            online,
            category = ?err.category,
            code = %err.code,
            status = ?err.status,
            "{}",
            err.message
        );
        self.status.on_status(online, truncate_status(&err.message));
    }

    /// Fetch pushes newer than the watermark and dispatch each one in order.
    ///
    /// On failure nothing is dispatched and the watermark is left alone.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, BridgeError> {
        let mut watermark = self.watermark.lock().await;
        let since = watermark.current();
        self.report(&format!("checking for new data since {since}"));

        let batch = match self.source.fetch_pushes(since).await {
            Ok(batch) => batch,
            Err(err) => {
                self.report_error(&err);
                return Err(err);
            }
        };

        let mut actions = Vec::new();
        for push in &batch.pushes {
            match self.dispatch(push) {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => {}
                Err(err) => self.report_error(&err),
            }
            watermark.advance(push.modified);
        }

        let summary = ReconcileSummary {
            items: batch.len(),
            actions,
            watermark: watermark.current(),
        };
        debug!(
            items = summary.items,
            actions = summary.actions.len(),
            "reconciliation pass finished"
        );
        self.report(&format!("last modified is now {}", summary.watermark));
        Ok(summary)
    }

    /// Post the doorbell push. Completion is signalled exactly once.
    pub async fn notify_doorbell(&self, client_txn_id: &str) -> OutboundAck {
        self.report("doorbell");
        let push = PushItem::note(DOORBELL_TITLE, DOORBELL_BODY);

        let outcome = match self.source.post_push(&push).await {
            Ok(response) => {
                self.report(&format!("doorbell response: {response}"));
                OutboundOutcome::Success { response }
            }
            Err(error) => {
                self.report_error(&error);
                OutboundOutcome::Failure { error }
            }
        };

        let ack = normalize_outbound_outcome(client_txn_id, &outcome);
        self.actions.on_outbound_complete(&ack);
        ack
    }

    fn dispatch(&self, push: &PushItem) -> Result<Option<PushAction>, BridgeError> {
        let Some(body) = push.body.as_deref() else {
            return Ok(None);
        };

        panic::catch_unwind(AssertUnwindSafe(|| {
            self.report(&format!("handle push: {body}"));
            let action = classify(push);
            if let Some(action) = action {
                self.actions.on_action(action);
            }
            action
        }))
        .map_err(|payload| {
            BridgeError::new(
                BridgeErrorCategory::Classification,
                "classification_fault",
                format!(
                    "failed to handle push modified at {}: {}",
                    push.modified,
                    panic_message(&*payload)
                ),
            )
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
