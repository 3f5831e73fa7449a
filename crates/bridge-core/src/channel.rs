use thiserror::Error;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tracing::warn;

use crate::types::{BridgeCommand, BridgeEvent};

/// Errors returned by bridge channel operations.
#[derive(Debug, Error)]
pub enum BridgeChannelError {
    /// The command receiver side is closed.
    #[error("command channel is closed")]
    CommandChannelClosed,
    /// Every event sender is gone; the runtime has stopped.
    #[error("event stream is closed")]
    EventStreamClosed,
}

/// Host-side event subscription.
///
/// A subscriber that falls more than the event buffer behind skips the
/// oldest events instead of failing. Skipped events are counted in
/// [`EventStream::missed`].
#[derive(Debug)]
pub struct EventStream {
    rx: broadcast::Receiver<BridgeEvent>,
    missed: u64,
}

impl EventStream {
    /// Next event, skipping past any the subscriber was too slow to see.
    pub async fn recv(&mut self) -> Result<BridgeEvent, BridgeChannelError> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(event),
                Err(RecvError::Lagged(skipped)) => {
                    self.missed = self.missed.saturating_add(skipped);
                    warn!(skipped, total = self.missed, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return Err(BridgeChannelError::EventStreamClosed),
            }
        }
    }

    /// Total events dropped because this subscriber lagged.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}

/// Command/event channel pair between the host and the bridge runtime.
#[derive(Clone, Debug)]
pub struct BridgeChannels {
    command_tx: mpsc::Sender<BridgeCommand>,
    event_tx: broadcast::Sender<BridgeEvent>,
}

impl BridgeChannels {
    /// Create a new channel set and return it with the command receiver.
    pub fn new(
        command_buffer: usize,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<BridgeCommand>) {
        let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));

        (
            Self {
                command_tx,
                event_tx,
            },
            command_rx,
        )
    }

    /// Subscribe to emitted bridge events.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.event_tx.subscribe(),
            missed: 0,
        }
    }

    /// Send one command to the runtime.
    pub async fn send_command(&self, command: BridgeCommand) -> Result<(), BridgeChannelError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| BridgeChannelError::CommandChannelClosed)
    }

    /// Emit an event to all subscribers.
    ///
    /// Emission is best-effort; a lagged subscriber skips ahead on its next
    /// `recv`.
    pub fn emit(&self, event: BridgeEvent) {
        let _ = self.event_tx.send(event);
    }
}
