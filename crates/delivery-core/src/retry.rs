use std::time::Duration;

/// Fixed reconnect delay applied after a failed stream request.
///
/// The server distinguishes its own idle timeout (502, reconnect at once)
/// from real errors; only the latter pay this delay.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    delay_ms: u64,
}

impl BackoffPolicy {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_one_second() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_ms(), 1_000);
        assert_eq!(policy.delay(), Duration::from_millis(1_000));
    }

    #[test]
    fn applies_the_configured_delay_unchanged() {
        let policy = BackoffPolicy::new(250);
        assert_eq!(policy.delay(), Duration::from_millis(250));
    }
}
