use std::time::Duration;

use bridge_core::{BridgeError, BridgeErrorCategory, FrameStream, StreamConnector};
use futures_util::{StreamExt, future};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
};
use tracing::{debug, info};

/// Opens the realtime stream at `{stream_base}/{access_token}`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    stream_base: String,
    connect_timeout: Option<Duration>,
}

impl WsConnector {
    pub fn new(stream_base: &str, connect_timeout: Option<Duration>) -> Self {
        Self {
            stream_base: stream_base.trim().trim_end_matches('/').to_owned(),
            connect_timeout,
        }
    }

    fn stream_url(&self, credential: &str) -> String {
        format!("{}/{}", self.stream_base, credential)
    }
}

impl StreamConnector for WsConnector {
    async fn connect(&self, credential: &str) -> Result<FrameStream, BridgeError> {
        let url = self.stream_url(credential);
        info!(stream = %format!("{}/<redacted>", self.stream_base), "connecting websocket");

        let connecting = connect_async(url.as_str());
        let connected = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connecting).await.map_err(|_| {
                BridgeError::new(
                    BridgeErrorCategory::Transport,
                    "connect_timeout",
                    format!("failed to set up websocket: no answer within {limit:?}"),
                )
            })?,
            None => connecting.await,
        };
        let (socket, response) = connected.map_err(map_connect_error)?;
        debug!(status = response.status().as_u16(), "websocket handshake complete");

        Ok(socket
            .filter_map(|message| future::ready(frame_text(message)))
            .boxed())
    }
}

/// Text payload of a frame. Control frames yield `None`; a close frame ends
/// the stream with an error.
fn frame_text(
    message: Result<Message, tungstenite::Error>,
) -> Option<Result<String, BridgeError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Ok(Message::Close(frame)) => {
            let reason = frame
                .map(|frame| frame.reason.as_str().to_owned())
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| "no reason given".to_owned());
            Some(Err(BridgeError::new(
                BridgeErrorCategory::Transport,
                "stream_closed",
                format!("websocket closed: {reason}"),
            )))
        }
        Err(err) => Some(Err(BridgeError::new(
            BridgeErrorCategory::Transport,
            "stream_error",
            format!("websocket error: {err}"),
        ))),
    }
}

fn map_connect_error(err: tungstenite::Error) -> BridgeError {
    match err {
        tungstenite::Error::Url(err) => BridgeError::new(
            BridgeErrorCategory::Config,
            "invalid_stream_url",
            format!("failed to set up websocket: {err}"),
        ),
        tungstenite::Error::HttpFormat(err) => BridgeError::new(
            BridgeErrorCategory::Config,
            "invalid_stream_url",
            format!("failed to set up websocket: {err}"),
        ),
        tungstenite::Error::Http(response) => {
            let status = response.status().as_u16();
            let mut error = BridgeError::new(
                BridgeErrorCategory::Auth,
                "stream_rejected",
                format!("failed to set up websocket: handshake rejected with {status}"),
            );
            error.status = Some(status);
            error
        }
        other => BridgeError::new(
            BridgeErrorCategory::Transport,
            "stream_connect_failed",
            format!("failed to set up websocket: {other}"),
        ),
    }
}
