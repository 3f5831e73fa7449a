use std::sync::Arc;

use bridge_core::{
    ActionSink, BridgeError, NotificationSource, StatusSink, StreamConnector, StreamEnvelope,
    StreamLifecycleState, StreamStateMachine,
};
use futures_util::StreamExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::engine::ReconciliationEngine;

/// Owns the persistent stream connection and turns push tickles into
/// reconciliation passes.
///
/// One `run` call makes exactly one connect attempt. When the connection
/// fails or drops the listener goes `Offline` and stays there until the host
/// calls `run` again.
#[derive(Debug)]
pub struct StreamListener<C> {
    connector: C,
    state: StreamStateMachine,
}

impl<C: StreamConnector> StreamListener<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: StreamStateMachine::default(),
        }
    }

    pub fn state(&self) -> StreamLifecycleState {
        self.state.state()
    }

    /// Connect, then receive frames until the connection ends or `stop` fires.
    ///
    /// Reconciliation passes started by the loop are drained before returning.
    pub async fn run<S, A, T>(
        &mut self,
        engine: Arc<ReconciliationEngine<S, A, T>>,
        credential: &str,
        stop: CancellationToken,
    ) -> Result<(), BridgeError>
    where
        S: NotificationSource,
        A: ActionSink,
        T: StatusSink,
    {
        self.state.begin_connect()?;

        let connected = tokio::select! {
            biased;
            _ = stop.cancelled() => None,
            result = self.connector.connect(credential) => Some(result),
        };

        let mut frames = match connected {
            Some(Ok(frames)) => {
                let state = self.state.on_connect_result(true)?;
                engine.set_connection_state(state);
                engine.report("connected");
                frames
            }
            Some(Err(err)) => {
                let state = self.state.on_connect_result(false)?;
                engine.set_connection_state(state);
                engine.report_error(&err);
                engine.report("websocket offline");
                return Ok(());
            }
            None => {
                let state = self.state.on_connect_result(false)?;
                engine.set_connection_state(state);
                debug!("stream connect cancelled");
                return Ok(());
            }
        };

        let mut passes = JoinSet::new();
        loop {
            let frame = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                frame = frames.next() => frame,
            };

            match frame {
                Some(Ok(raw)) => handle_frame(&engine, &raw, &mut passes),
                Some(Err(err)) => {
                    engine.report_error(&err);
                    break;
                }
                None => break,
            }

            while passes.try_join_next().is_some() {}
        }

        let state = self.state.on_connection_lost()?;
        engine.set_connection_state(state);
        engine.report("websocket offline");

        finish_passes(&mut passes, &stop).await;
        Ok(())
    }
}

/// Let in-flight passes complete unless `stop` fires first, in which case
/// they are aborted.
async fn finish_passes(passes: &mut JoinSet<()>, stop: &CancellationToken) {
    let drained = tokio::select! {
        biased;
        _ = stop.cancelled() => false,
        _ = async { while passes.join_next().await.is_some() {} } => true,
    };
    if !drained {
        debug!(in_flight = passes.len(), "aborting reconciliation passes");
        passes.abort_all();
        while passes.join_next().await.is_some() {}
    }
}

fn handle_frame<S, A, T>(
    engine: &Arc<ReconciliationEngine<S, A, T>>,
    raw: &str,
    passes: &mut JoinSet<()>,
) where
    S: NotificationSource,
    A: ActionSink,
    T: StatusSink,
{
    let envelope = match StreamEnvelope::decode(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(error = %err, "undecodable stream frame");
            engine.report("unknown websocket data received");
            return;
        }
    };

    if envelope.is_heartbeat() {
        trace!("stream heartbeat");
    } else {
        engine.report(&format!("websocket receive: {raw}"));
    }

    if envelope.is_push_tickle() {
        let engine = Arc::clone(engine);
        passes.spawn(async move {
            // failures were already reported through the status sink
            let _ = engine.reconcile().await;
        });
    }
}
