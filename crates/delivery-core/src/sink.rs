use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::types::{ChatMessage, DeliveryEvent};

/// Broadcast event stream type handed to sink subscribers.
pub type EventStream = broadcast::Receiver<DeliveryEvent>;

/// Shared message sink both retrieval strategies publish into.
///
/// The sink holds the published copy of the current message list in a
/// `watch` channel and fans out [`DeliveryEvent`]s over `broadcast`.
/// Consumers read; only the retrieval strategies write.
#[derive(Clone, Debug)]
pub struct MessageSink {
    inner: Arc<SinkInner>,
}

#[derive(Debug)]
struct SinkInner {
    messages: watch::Sender<Vec<ChatMessage>>,
    events: broadcast::Sender<DeliveryEvent>,
}

impl MessageSink {
    /// Create a sink with the given event fan-out buffer.
    pub fn new(event_buffer: usize) -> Self {
        let (messages, _) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(event_buffer.max(1));

        Self {
            inner: Arc::new(SinkInner { messages, events }),
        }
    }

    /// Subscribe to delivery events.
    pub fn subscribe(&self) -> EventStream {
        self.inner.events.subscribe()
    }

    /// Watch the published message list.
    pub fn watch_messages(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.inner.messages.subscribe()
    }

    /// Copy of the currently published message list.
    pub fn latest_messages(&self) -> Vec<ChatMessage> {
        self.inner.messages.borrow().clone()
    }

    /// Replace the published message list wholesale with a poll snapshot.
    pub fn publish_snapshot(&self, messages: Vec<ChatMessage>) {
        self.inner.messages.send_replace(messages.clone());
        self.emit(DeliveryEvent::SnapshotReplaced { messages });
    }

    /// Append a single long-poll delivery to the published list.
    pub fn publish_message(&self, message: ChatMessage) {
        self.inner
            .messages
            .send_modify(|items| items.push(message.clone()));
        self.emit(DeliveryEvent::MessageReceived { message });
    }

    /// Emit an event to all subscribers.
    ///
    /// Emission is best-effort; lagged subscribers are handled by
    /// `broadcast`.
    pub fn emit(&self, event: DeliveryEvent) {
        let _ = self.inner.events.send(event);
    }
}
