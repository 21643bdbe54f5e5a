use std::time::Duration;

/// Tick gate that serializes snapshot fetches for the polling strategy.
///
/// The driver feeds it a monotonic `now` on every clock tick; the gate
/// decides whether a fetch is due. At most one fetch is in flight at a
/// time: ticks arriving while a fetch is outstanding are no-ops, and the
/// next due time is only re-armed when the fetch settles. The initial due
/// time is zero, so the very first tick fires.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    next_request_at: Duration,
    in_flight: bool,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_request_at: Duration::ZERO,
            in_flight: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Gate check for one tick. Returns `true` when a fetch should be
    /// issued now, and marks it outstanding.
    pub fn try_begin(&mut self, now: Duration) -> bool {
        if self.in_flight || now < self.next_request_at {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Record settlement of the outstanding fetch (success or failure)
    /// and re-arm the gate one interval from `now`.
    pub fn settle(&mut self, now: Duration) {
        self.in_flight = false;
        self.next_request_at = now + self.interval;
    }
}
