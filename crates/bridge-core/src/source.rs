use std::{future::Future, sync::Arc};

use futures_util::stream::BoxStream;

use crate::{
    error::BridgeError,
    types::{PollBatch, PushItem},
};

/// Inbound frames of an open event stream, as text.
///
/// The stream ends when the connection closes; an `Err` item reports a
/// transport failure and is the last item yielded.
pub type FrameStream = BoxStream<'static, Result<String, BridgeError>>;

/// Request/response side of the push service.
pub trait NotificationSource: Send + Sync + 'static {
    /// Fetch pushes modified strictly after `modified_after`, in service order.
    fn fetch_pushes(
        &self,
        modified_after: f64,
    ) -> impl Future<Output = Result<PollBatch, BridgeError>> + Send;

    /// Create a push. Returns the raw response body on success.
    fn post_push(&self, push: &PushItem)
    -> impl Future<Output = Result<String, BridgeError>> + Send;
}

/// Persistent connection side of the push service.
pub trait StreamConnector: Send + Sync + 'static {
    /// Open the stream for `credential` and hand back its frames.
    fn connect(&self, credential: &str)
    -> impl Future<Output = Result<FrameStream, BridgeError>> + Send;
}

impl<T: NotificationSource> NotificationSource for Arc<T> {
    fn fetch_pushes(
        &self,
        modified_after: f64,
    ) -> impl Future<Output = Result<PollBatch, BridgeError>> + Send {
        (**self).fetch_pushes(modified_after)
    }

    fn post_push(
        &self,
        push: &PushItem,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send {
        (**self).post_push(push)
    }
}
