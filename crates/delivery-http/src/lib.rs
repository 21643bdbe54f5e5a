//! HTTP drivers for the message-delivery core.
//!
//! This crate hosts the two retrieval strategies (`Poller`, `LongPollClient`)
//! and the one-shot `Sender`, all generic over the [`ChatTransport`] seam,
//! plus the production `reqwest` implementation of that seam.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Long-poll retrieval strategy.
pub mod longpoll;
/// Snapshot-polling retrieval strategy.
pub mod poller;
/// One-shot message send.
pub mod sender;
/// Transport seam and its `reqwest` implementation.
pub mod transport;

pub use longpoll::LongPollClient;
pub use poller::Poller;
pub use sender::Sender;
pub use transport::{ChatTransport, HttpChatClient, HttpChatConfig, StreamReply};

/// Snapshot poll interval when no override is configured.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
/// Reconnect delay after a failed stream request.
pub const DEFAULT_BACKOFF_MS: u64 = 1_000;
/// Client-side timeout for snapshot and send requests.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Client-side ceiling on a held stream request. Long enough that the
/// server's own idle timeout fires first, bounded so a silent server
/// cannot hang the loop forever.
pub const DEFAULT_STREAM_HOLD_TIMEOUT_MS: u64 = 90_000;
/// Retention cap for locally buffered messages.
pub const DEFAULT_BUFFER_MAX_ITEMS: usize = 1_200;
/// Granularity of the poller's clock signal. The gate in
/// `delivery_core::PollSchedule` decides when a tick actually fetches.
pub const POLL_TICK_MS: u64 = 250;

/// Handle pair for a running retrieval task.
#[derive(Debug)]
pub(crate) struct RunningTask {
    pub(crate) stop: CancellationToken,
    pub(crate) task: JoinHandle<()>,
}
