use crate::{
    error::DeliveryError,
    types::ConnectionState,
};

/// Classification of a settled stream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Status 200: the server delivered a new message body.
    Delivered,
    /// Status 502: the server closed an idle hold; reconnect immediately.
    IdleTimeout,
    /// Any other status, or a transport failure before a status arrived.
    Failed,
}

/// What the long-poll driver must do after a settled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Re-issue the stream request with no delay.
    ReissueNow,
    /// Wait out the fixed reconnect delay, then re-issue.
    BackoffThenReissue,
}

/// Map a stream response status to its outcome class.
pub fn classify_stream_status(status: u16) -> StreamOutcome {
    match status {
        200 => StreamOutcome::Delivered,
        502 => StreamOutcome::IdleTimeout,
        _ => StreamOutcome::Failed,
    }
}

/// Reconnection state machine for the long-poll client.
///
/// The driver holds exactly one request in flight at a time; every
/// transition below assumes strict request/response sequencing.
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self {
            state: ConnectionState::Idle,
        }
    }
}

impl ConnectionStateMachine {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Begin the request loop: `Idle -> AwaitingResponse`.
    ///
    /// Errors when the loop is already running; callers treat that as
    /// "already started" and make their `start` a no-op.
    pub fn on_start(&mut self) -> Result<(), DeliveryError> {
        if self.state != ConnectionState::Idle {
            return Err(DeliveryError::invalid_state(self.state, "on_start"));
        }
        self.state = ConnectionState::AwaitingResponse;
        Ok(())
    }

    /// Record a settled request and decide the next step.
    ///
    /// 200 and 502 keep the machine in `AwaitingResponse` and the next
    /// request goes out immediately. Anything else enters `Backoff`.
    pub fn on_settled(&mut self, outcome: StreamOutcome) -> Result<NextAction, DeliveryError> {
        if self.state != ConnectionState::AwaitingResponse {
            return Err(DeliveryError::invalid_state(self.state, "on_settled"));
        }

        match outcome {
            StreamOutcome::Delivered | StreamOutcome::IdleTimeout => Ok(NextAction::ReissueNow),
            StreamOutcome::Failed => {
                self.state = ConnectionState::Backoff;
                Ok(NextAction::BackoffThenReissue)
            }
        }
    }

    /// The reconnect delay elapsed: `Backoff -> AwaitingResponse`.
    pub fn on_backoff_elapsed(&mut self) -> Result<(), DeliveryError> {
        if self.state != ConnectionState::Backoff {
            return Err(DeliveryError::invalid_state(self.state, "on_backoff_elapsed"));
        }
        self.state = ConnectionState::AwaitingResponse;
        Ok(())
    }

    /// Stop the loop from any state.
    pub fn on_stop(&mut self) {
        self.state = ConnectionState::Idle;
    }
}
