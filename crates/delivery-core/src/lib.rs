//! Core contract shared by the message-delivery strategies and their
//! consumers.
//!
//! This crate defines the wire/domain types, the error taxonomy, the
//! long-poll reconnection state machine, the poll schedule gate, and the
//! common buffer/sink abstractions. It performs no I/O; the HTTP drivers
//! live in `delivery-http`.

/// Bounded message retention owned by each retrieval strategy.
pub mod buffer;
/// Stable error types and HTTP classification helpers.
pub mod error;
/// Fixed reconnect-delay policy for the long-poll loop.
pub mod retry;
/// Tick gate serializing snapshot fetches.
pub mod schedule;
/// Shared watch/broadcast message sink.
pub mod sink;
/// Long-poll reconnection state machine.
pub mod state_machine;
/// Wire and domain types.
pub mod types;

pub use buffer::MessageBuffer;
pub use error::{DeliveryError, DeliveryErrorCategory, classify_http_status};
pub use retry::BackoffPolicy;
pub use schedule::PollSchedule;
pub use sink::{EventStream, MessageSink};
pub use state_machine::{
    ConnectionStateMachine, NextAction, StreamOutcome, classify_stream_status,
};
pub use types::{
    ChatMessage, ConnectionState, DeliveryEvent, DeliveryTuning, SendAck, SendRequest,
    SnapshotPayload,
};
