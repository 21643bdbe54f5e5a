use std::sync::Arc;

use delivery_core::{DeliveryError, SendAck, SendRequest};
use tracing::debug;

use crate::transport::ChatTransport;

/// One-shot message send, independent of the retrieval strategies.
///
/// A successful send does not touch either retrieval loop; the new
/// message becomes visible through their own next cycle, so there is an
/// inherent latency window bounded by the poll interval or the long-poll
/// round trip.
#[derive(Debug)]
pub struct Sender<T> {
    transport: Arc<T>,
}

impl<T: ChatTransport> Sender<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Post a new message and return the server's acknowledgment.
    ///
    /// Errors are surfaced to the caller; there is no automatic retry.
    pub async fn send(
        &self,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<SendAck, DeliveryError> {
        let request = SendRequest {
            user: user.into(),
            text: text.into(),
        };

        let ack = self.transport.post_message(&request).await?;
        debug!(user = %request.user, "send acknowledged");
        Ok(ack)
    }
}
