use std::sync::Arc;

use crate::{
    channel::BridgeChannels,
    normalization::normalize_status,
    types::{BridgeEvent, ConnectionState, OutboundAck, PushAction},
};

/// Host callbacks for classified pushes and outbound completion.
pub trait ActionSink: Send + Sync + 'static {
    /// Fired once per classified push.
    fn on_action(&self, action: PushAction);

    /// Fired exactly once per doorbell request, whatever the outcome.
    fn on_outbound_complete(&self, ack: &OutboundAck);
}

/// Host callback for operational status.
pub trait StatusSink: Send + Sync + 'static {
    /// `message` is already cut to the host display limit.
    fn on_status(&self, online: bool, message: &str);

    /// Fired when the stream connection goes online or offline.
    fn on_connection_changed(&self, _state: ConnectionState) {}
}

impl<T: ActionSink + ?Sized> ActionSink for Arc<T> {
    fn on_action(&self, action: PushAction) {
        (**self).on_action(action);
    }

    fn on_outbound_complete(&self, ack: &OutboundAck) {
        (**self).on_outbound_complete(ack);
    }
}

impl<T: StatusSink + ?Sized> StatusSink for Arc<T> {
    fn on_status(&self, online: bool, message: &str) {
        (**self).on_status(online, message);
    }

    fn on_connection_changed(&self, state: ConnectionState) {
        (**self).on_connection_changed(state);
    }
}

impl ActionSink for BridgeChannels {
    fn on_action(&self, action: PushAction) {
        self.emit(BridgeEvent::Action { action });
    }

    fn on_outbound_complete(&self, ack: &OutboundAck) {
        self.emit(BridgeEvent::OutboundComplete(ack.clone()));
    }
}

impl StatusSink for BridgeChannels {
    fn on_status(&self, online: bool, message: &str) {
        self.emit(normalize_status(online, message));
    }

    fn on_connection_changed(&self, state: ConnectionState) {
        self.emit(BridgeEvent::ConnectionChanged { state });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channels_forward_sink_calls_as_events() {
        let (channels, _rx) = BridgeChannels::new(1, 8);
        let mut events = channels.subscribe();

        channels.on_action(PushAction::Ignore);
        channels.on_outbound_complete(&OutboundAck {
            client_txn_id: "tx".into(),
            error_code: None,
        });
        channels.on_status(false, "websocket offline");
        channels.on_connection_changed(ConnectionState::Offline);

        assert_eq!(
            events.recv().await.expect("action"),
            BridgeEvent::Action {
                action: PushAction::Ignore
            }
        );
        assert!(matches!(
            events.recv().await.expect("ack"),
            BridgeEvent::OutboundComplete(ack) if ack.client_txn_id == "tx"
        ));
        assert_eq!(
            events.recv().await.expect("status"),
            BridgeEvent::Status {
                online: false,
                message: "websocket offline".into()
            }
        );
        assert_eq!(
            events.recv().await.expect("connection"),
            BridgeEvent::ConnectionChanged {
                state: ConnectionState::Offline
            }
        );
    }
}
