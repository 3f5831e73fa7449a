//! Pushbullet transport and runtime for the push bridge.
//!
//! [`ReconciliationEngine`] owns the watermark and turns polled pushes into
//! host actions. [`StreamListener`] keeps the realtime stream open and
//! triggers passes on push tickles. [`spawn_runtime`] wires both to the
//! command/event channels from `bridge-core`.

mod engine;
mod http;
mod listener;
mod runtime;
#[cfg(test)]
mod test_support;
mod websocket;

pub use engine::{
    DOORBELL_BODY, DOORBELL_TITLE, ReconcileSummary, ReconciliationEngine, SharedWatermark,
};
pub use http::PushApiClient;
pub use listener::StreamListener;
pub use runtime::{BridgeRuntimeHandle, spawn_runtime};
pub use websocket::WsConnector;
