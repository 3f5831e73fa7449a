use crate::{
    error::BridgeError,
    types::{ConnectionState, StreamLifecycleState},
};

/// Stream listener lifecycle.
///
/// `Disconnected -> Connecting -> Online -> Offline`, with `Connecting ->
/// Offline` on connect failure. Leaving `Offline` requires an explicit new
/// connect attempt; nothing here reconnects on its own.
#[derive(Debug, Clone)]
pub struct StreamStateMachine {
    state: StreamLifecycleState,
}

impl Default for StreamStateMachine {
    fn default() -> Self {
        Self {
            state: StreamLifecycleState::Disconnected,
        }
    }
}

impl StreamStateMachine {
    pub fn state(&self) -> StreamLifecycleState {
        self.state
    }

    pub fn begin_connect(&mut self) -> Result<(), BridgeError> {
        self.transition_from_any_of(
            &[
                StreamLifecycleState::Disconnected,
                StreamLifecycleState::Offline,
            ],
            StreamLifecycleState::Connecting,
            "connect",
        )
    }

    pub fn on_connect_result(&mut self, success: bool) -> Result<ConnectionState, BridgeError> {
        let next = if success {
            StreamLifecycleState::Online
        } else {
            StreamLifecycleState::Offline
        };
        self.transition_from_any_of(&[StreamLifecycleState::Connecting], next, "on_connect_result")?;
        Ok(self.state.connection_state())
    }

    pub fn on_connection_lost(&mut self) -> Result<ConnectionState, BridgeError> {
        self.transition_from_any_of(
            &[StreamLifecycleState::Online],
            StreamLifecycleState::Offline,
            "on_connection_lost",
        )?;
        Ok(self.state.connection_state())
    }

    fn transition_from_any_of(
        &mut self,
        expected: &[StreamLifecycleState],
        next: StreamLifecycleState,
        action: &str,
    ) -> Result<(), BridgeError> {
        if !expected.contains(&self.state) {
            return Err(BridgeError::invalid_state(self.state, action));
        }
        self.state = next;
        Ok(())
    }
}
