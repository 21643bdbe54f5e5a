use std::{sync::Arc, time::Duration};

use delivery_core::{
    DeliveryError, DeliveryErrorCategory, DeliveryEvent, DeliveryTuning, MessageBuffer,
    MessageSink, PollSchedule,
};
use tokio::{
    sync::Mutex,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    DEFAULT_BUFFER_MAX_ITEMS, DEFAULT_POLL_INTERVAL_MS, POLL_TICK_MS, RunningTask,
    transport::ChatTransport,
};

/// Snapshot-polling retrieval strategy.
///
/// Fetches the full current message set on a fixed cadence and replaces
/// the published state wholesale with each successful snapshot. Failures
/// keep the previous snapshot; the next cycle retries.
#[derive(Debug)]
pub struct Poller<T> {
    transport: Arc<T>,
    sink: MessageSink,
    interval: Duration,
    buffer_max_items: usize,
    task: Mutex<Option<RunningTask>>,
}

impl<T: ChatTransport + 'static> Poller<T> {
    pub fn new(transport: Arc<T>, sink: MessageSink, tuning: &DeliveryTuning) -> Self {
        Self {
            transport,
            sink,
            interval: Duration::from_millis(
                tuning.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            buffer_max_items: tuning.buffer_max_items.unwrap_or(DEFAULT_BUFFER_MAX_ITEMS),
            task: Mutex::new(None),
        }
    }

    /// Start the poll loop. A no-op when the loop is already running.
    pub async fn start(&self) {
        let mut guard = self.task.lock().await;
        if guard.is_some() {
            debug!("poller already running; start is a no-op");
            return;
        }

        let stop = CancellationToken::new();
        let stop_child = stop.child_token();
        let transport = Arc::clone(&self.transport);
        let sink = self.sink.clone();
        let interval = self.interval;
        let buffer_max_items = self.buffer_max_items;
        let task = tokio::spawn(async move {
            run_poll_loop(transport, sink, interval, buffer_max_items, stop_child).await;
        });

        *guard = Some(RunningTask { stop, task });
    }

    /// Stop the poll loop after the current fetch, if any, settles.
    pub async fn stop(&self) -> Result<(), DeliveryError> {
        let running = {
            let mut guard = self.task.lock().await;
            guard.take()
        };

        let Some(running) = running else {
            return Err(DeliveryError::new(
                DeliveryErrorCategory::Internal,
                "poller_not_running",
                "the poll loop is not running",
            ));
        };

        running.stop.cancel();
        let _ = running.task.await;
        Ok(())
    }
}

async fn run_poll_loop<T: ChatTransport>(
    transport: Arc<T>,
    sink: MessageSink,
    interval: Duration,
    buffer_max_items: usize,
    stop: CancellationToken,
) {
    let started = Instant::now();
    let mut schedule = PollSchedule::new(interval);
    let mut buffer = MessageBuffer::new(buffer_max_items);
    let mut ticker = time::interval(Duration::from_millis(POLL_TICK_MS));
    // The clock signal has no guaranteed period; late ticks collapse.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !schedule.try_begin(started.elapsed()) {
            continue;
        }

        match transport.fetch_snapshot().await {
            Ok(messages) => {
                buffer.replace(messages);
                sink.publish_snapshot(buffer.items().to_vec());
            }
            Err(err) => {
                warn!(code = %err.code, "snapshot poll failed; keeping previous snapshot");
                sink.emit(DeliveryEvent::RetrievalFault {
                    code: err.code,
                    message: err.message,
                });
            }
        }

        schedule.settle(started.elapsed());

        // Stop is observed at the re-arm point, after the fetch settled.
        if stop.is_cancelled() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        future,
        sync::{
            Mutex as StdMutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use delivery_core::{ChatMessage, SendAck, SendRequest};
    use tokio::time::timeout;

    use super::*;
    use crate::transport::StreamReply;

    struct ScriptedSnapshots {
        replies: StdMutex<VecDeque<Result<Vec<ChatMessage>, DeliveryError>>>,
        attempts: AtomicUsize,
        fetches: AtomicUsize,
    }

    impl ScriptedSnapshots {
        fn new(replies: Vec<Result<Vec<ChatMessage>, DeliveryError>>) -> Self {
            Self {
                replies: StdMutex::new(replies.into()),
                attempts: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            }
        }

        /// Fetches entered, including ones that never settle.
        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        /// Fetches that settled with a scripted reply.
        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl ChatTransport for ScriptedSnapshots {
        async fn fetch_snapshot(&self) -> Result<Vec<ChatMessage>, DeliveryError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().expect("script lock").pop_front();
            match next {
                Some(reply) => {
                    self.fetches.fetch_add(1, Ordering::SeqCst);
                    reply
                }
                // Script exhausted: hang like a server that never answers.
                None => future::pending().await,
            }
        }

        async fn poll_stream(&self) -> Result<StreamReply, DeliveryError> {
            future::pending().await
        }

        async fn post_message(&self, _request: &SendRequest) -> Result<SendAck, DeliveryError> {
            future::pending().await
        }
    }

    fn message(id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_owned(),
            user: "alice".to_owned(),
            text: text.to_owned(),
            time: 1_754_000_000_000,
        }
    }

    async fn next_event(events: &mut delivery_core::EventStream) -> DeliveryEvent {
        timeout(Duration::from_secs(30), events.recv())
            .await
            .expect("event timeout")
            .expect("event receive")
    }

    #[tokio::test(start_paused = true)]
    async fn replaces_the_published_snapshot_wholesale() {
        let transport = Arc::new(ScriptedSnapshots::new(vec![
            Ok(vec![message("1", "stale")]),
            Ok(vec![message("2", "m1"), message("3", "m2")]),
        ]));
        let sink = MessageSink::new(16);
        let mut events = sink.subscribe();
        let poller = Poller::new(Arc::clone(&transport), sink.clone(), &DeliveryTuning::default());

        poller.start().await;

        match next_event(&mut events).await {
            DeliveryEvent::SnapshotReplaced { messages } => assert_eq!(messages.len(), 1),
            other => panic!("unexpected event: {other:?}"),
        }
        match next_event(&mut events).await {
            DeliveryEvent::SnapshotReplaced { messages } => {
                let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
                assert_eq!(ids, vec!["2", "3"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let latest = sink.latest_messages();
        let ids: Vec<&str> = latest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_a_full_interval_between_fetches() {
        let transport = Arc::new(ScriptedSnapshots::new(vec![
            Ok(vec![message("1", "first")]),
            Ok(vec![message("2", "second")]),
        ]));
        let sink = MessageSink::new(16);
        let mut events = sink.subscribe();
        let poller = Poller::new(Arc::clone(&transport), sink.clone(), &DeliveryTuning::default());

        poller.start().await;
        next_event(&mut events).await;
        assert_eq!(transport.fetches(), 1);

        // Well inside the 3000 ms interval: no second fetch yet.
        time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(transport.fetches(), 1);

        time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(transport.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_the_previous_snapshot_when_a_poll_fails() {
        let transport = Arc::new(ScriptedSnapshots::new(vec![
            Ok(vec![message("1", "kept")]),
            Err(DeliveryError::new(
                DeliveryErrorCategory::Network,
                "transport_error",
                "connection refused",
            )),
        ]));
        let sink = MessageSink::new(16);
        let mut events = sink.subscribe();
        let poller = Poller::new(Arc::clone(&transport), sink.clone(), &DeliveryTuning::default());

        poller.start().await;
        next_event(&mut events).await;

        match next_event(&mut events).await {
            DeliveryEvent::RetrievalFault { code, .. } => assert_eq!(code, "transport_error"),
            other => panic!("unexpected event: {other:?}"),
        }

        let latest = sink.latest_messages();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, "1");
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_a_noop_while_running() {
        let transport = Arc::new(ScriptedSnapshots::new(Vec::new()));
        let sink = MessageSink::new(16);
        let poller = Poller::new(Arc::clone(&transport), sink, &DeliveryTuning::default());

        poller.start().await;
        poller.start().await;
        time::sleep(Duration::from_millis(500)).await;

        // A second loop would have entered a second (hanging) fetch.
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_loop_between_cycles() {
        let transport = Arc::new(ScriptedSnapshots::new(vec![Ok(vec![message("1", "only")])]));
        let sink = MessageSink::new(16);
        let mut events = sink.subscribe();
        let poller = Poller::new(Arc::clone(&transport), sink, &DeliveryTuning::default());

        poller.start().await;
        next_event(&mut events).await;

        poller.stop().await.expect("stop should join the loop");
        let err = poller.stop().await.expect_err("second stop must fail");
        assert_eq!(err.code, "poller_not_running");
    }
}
