use serde::{Deserialize, Serialize};

/// A single chat message as minted by the server.
///
/// Messages are immutable once created; the server assigns `id` and `time`
/// when a send is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Opaque server-assigned unique identifier.
    ///
    /// The stream endpoint may deliver a bare `{user, text}` body; missing
    /// identifiers default to empty.
    #[serde(default)]
    pub id: String,
    /// Display name of the author.
    pub user: String,
    /// Message body.
    pub text: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    #[serde(default)]
    pub time: u64,
}

/// Wire body returned by the snapshot endpoint (`GET /poll`).
///
/// `msg` holds the full current message set in server-reported order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotPayload {
    /// Full replacement message set.
    pub msg: Vec<ChatMessage>,
}

/// Wire body posted to the send endpoint (`POST /poll`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendRequest {
    /// Display name of the author.
    pub user: String,
    /// Message body.
    pub text: String,
}

/// Opaque acknowledgment body returned by the send endpoint.
///
/// The shape is caller-defined; retrieval strategies never consume it.
/// A sent message becomes visible through their own next cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SendAck(pub serde_json::Value);

/// Long-poll connection state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionState {
    /// No request outstanding and no reconnect pending.
    Idle,
    /// A stream request is outstanding; the server may hold it open.
    AwaitingResponse,
    /// A request failed; the client is waiting out the reconnect delay.
    Backoff,
}

/// Optional runtime tuning overrides for the retrieval strategies.
///
/// `None` fields fall back to crate defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeliveryTuning {
    /// Snapshot poll interval in milliseconds (default 3000).
    pub poll_interval_ms: Option<u64>,
    /// Fixed reconnect delay after a stream error, in milliseconds
    /// (default 1000).
    pub backoff_ms: Option<u64>,
    /// Client-side timeout for snapshot and send requests, in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Client-side ceiling on how long a held stream request may stay open,
    /// in milliseconds.
    pub stream_hold_timeout_ms: Option<u64>,
    /// Retention cap for locally buffered messages.
    pub buffer_max_items: Option<usize>,
}

/// Event fan-out emitted by the retrieval strategies through the sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// The polling strategy replaced the message set wholesale.
    SnapshotReplaced {
        /// The new message set, exactly as the server reported it.
        messages: Vec<ChatMessage>,
    },
    /// The long-poll strategy delivered a single new message.
    MessageReceived {
        /// The delivered message.
        message: ChatMessage,
    },
    /// The long-poll connection state changed.
    ConnectionStateChanged {
        /// New connection state.
        state: ConnectionState,
    },
    /// A retrieval request failed; the strategy keeps running.
    RetrievalFault {
        /// Stable machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}
