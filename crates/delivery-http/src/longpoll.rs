use std::sync::Arc;

use delivery_core::{
    BackoffPolicy, ConnectionStateMachine, DeliveryError, DeliveryErrorCategory, DeliveryEvent,
    DeliveryTuning, MessageBuffer, MessageSink, NextAction, StreamOutcome,
};
use tokio::{sync::Mutex, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{
    DEFAULT_BACKOFF_MS, DEFAULT_BUFFER_MAX_ITEMS, RunningTask,
    transport::{ChatTransport, StreamReply},
};

/// Long-poll retrieval strategy.
///
/// Holds exactly one stream request open at a time. A 502 is the server's
/// idle-timeout signal and triggers an immediate reconnect; a delivered
/// message is published and the request is re-issued at once; everything
/// else pays the fixed reconnect delay first.
#[derive(Debug)]
pub struct LongPollClient<T> {
    transport: Arc<T>,
    sink: MessageSink,
    backoff: BackoffPolicy,
    buffer_max_items: usize,
    task: Mutex<Option<RunningTask>>,
}

impl<T: ChatTransport + 'static> LongPollClient<T> {
    pub fn new(transport: Arc<T>, sink: MessageSink, tuning: &DeliveryTuning) -> Self {
        Self {
            transport,
            sink,
            backoff: BackoffPolicy::new(tuning.backoff_ms.unwrap_or(DEFAULT_BACKOFF_MS)),
            buffer_max_items: tuning.buffer_max_items.unwrap_or(DEFAULT_BUFFER_MAX_ITEMS),
            task: Mutex::new(None),
        }
    }

    /// Start the stream loop. A no-op when the loop is already running.
    pub async fn start(&self) {
        let mut guard = self.task.lock().await;
        if guard.is_some() {
            debug!("long-poll client already running; start is a no-op");
            return;
        }

        let stop = CancellationToken::new();
        let stop_child = stop.child_token();
        let transport = Arc::clone(&self.transport);
        let sink = self.sink.clone();
        let backoff = self.backoff;
        let buffer_max_items = self.buffer_max_items;
        let task = tokio::spawn(async move {
            run_stream_loop(transport, sink, backoff, buffer_max_items, stop_child).await;
        });

        *guard = Some(RunningTask { stop, task });
    }

    /// Stop the stream loop, aborting a held request if one is open.
    pub async fn stop(&self) -> Result<(), DeliveryError> {
        let running = {
            let mut guard = self.task.lock().await;
            guard.take()
        };

        let Some(running) = running else {
            return Err(DeliveryError::new(
                DeliveryErrorCategory::Internal,
                "stream_not_running",
                "the stream loop is not running",
            ));
        };

        running.stop.cancel();
        let _ = running.task.await;
        Ok(())
    }
}

async fn run_stream_loop<T: ChatTransport>(
    transport: Arc<T>,
    sink: MessageSink,
    backoff: BackoffPolicy,
    buffer_max_items: usize,
    stop: CancellationToken,
) {
    let mut machine = ConnectionStateMachine::default();
    if let Err(err) = machine.on_start() {
        error!(code = %err.code, "stream loop failed to arm");
        return;
    }
    sink.emit(DeliveryEvent::ConnectionStateChanged {
        state: machine.state(),
    });

    let mut buffer = MessageBuffer::new(buffer_max_items);

    loop {
        let reply = tokio::select! {
            _ = stop.cancelled() => break,
            reply = transport.poll_stream() => reply,
        };

        let outcome = match reply {
            Ok(StreamReply::Delivered(message)) => {
                buffer.push(message.clone());
                sink.publish_message(message);
                StreamOutcome::Delivered
            }
            Ok(StreamReply::IdleTimeout) => {
                debug!("server closed an idle hold; reconnecting");
                StreamOutcome::IdleTimeout
            }
            Ok(StreamReply::Failed { status }) => {
                warn!(status, "stream request answered an error status");
                sink.emit(DeliveryEvent::RetrievalFault {
                    code: "stream_status".to_owned(),
                    message: format!("stream endpoint answered status {status}"),
                });
                StreamOutcome::Failed
            }
            // A failure before any status arrived takes the same backoff
            // path as an error status.
            Err(err) => {
                warn!(code = %err.code, "stream request failed before a status arrived");
                sink.emit(DeliveryEvent::RetrievalFault {
                    code: err.code,
                    message: err.message,
                });
                StreamOutcome::Failed
            }
        };

        match machine.on_settled(outcome) {
            Ok(NextAction::ReissueNow) => {}
            Ok(NextAction::BackoffThenReissue) => {
                sink.emit(DeliveryEvent::ConnectionStateChanged {
                    state: machine.state(),
                });

                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = time::sleep(backoff.delay()) => {}
                }

                if let Err(err) = machine.on_backoff_elapsed() {
                    error!(code = %err.code, "stream loop lost track of its state");
                    break;
                }
                sink.emit(DeliveryEvent::ConnectionStateChanged {
                    state: machine.state(),
                });
            }
            Err(err) => {
                error!(code = %err.code, "stream loop lost track of its state");
                break;
            }
        }
    }

    machine.on_stop();
    sink.emit(DeliveryEvent::ConnectionStateChanged {
        state: machine.state(),
    });
}
