//! Retransmission timing
//!
//! A constant-rate gate on frame emission: after every transmission the
//! next one is suppressed until a fixed delay has elapsed, whether or not
//! an acknowledgment arrived in the interim. This caps the outbound rate
//! on the carrier while guaranteeing that anything unacknowledged is
//! eventually re-sent. There is no backoff.

use std::time::{Duration, Instant};

/// Default delay between transmission attempts
pub const DEFAULT_RETRANSMIT_DELAY: Duration = Duration::from_millis(1000);

/// Fixed-delay gate on transmission attempts
#[derive(Debug)]
pub struct RetransmitTimer {
    delay: Duration,
    last_transmit: Option<Instant>,
}

impl RetransmitTimer {
    /// Create a timer that permits one transmission per `delay`
    ///
    /// The first transmission is always permitted immediately.
    pub fn new(delay: Duration) -> Self {
        RetransmitTimer {
            delay,
            last_transmit: None,
        }
    }

    /// Check whether a transmission is currently permitted
    pub fn ready(&self) -> bool {
        match self.last_transmit {
            None => true,
            Some(at) => at.elapsed() >= self.delay,
        }
    }

    /// Record a transmission, closing the gate for another delay interval
    pub fn mark_transmit(&mut self) {
        self.last_transmit = Some(Instant::now());
    }

    /// Time until the gate reopens
    pub fn time_until_ready(&self) -> Duration {
        match self.last_transmit {
            None => Duration::ZERO,
            Some(at) => self.delay.saturating_sub(at.elapsed()),
        }
    }
}

impl Default for RetransmitTimer {
    fn default() -> Self {
        RetransmitTimer::new(DEFAULT_RETRANSMIT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_transmit_allowed() {
        let timer = RetransmitTimer::new(Duration::from_secs(60));
        assert!(timer.ready());
        assert_eq!(timer.time_until_ready(), Duration::ZERO);
    }

    #[test]
    fn test_gate_closes_after_transmit() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(50));
        timer.mark_transmit();
        assert!(!timer.ready());
        assert!(timer.time_until_ready() > Duration::ZERO);
    }

    #[test]
    fn test_gate_reopens_after_delay() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(10));
        timer.mark_transmit();
        assert!(!timer.ready());

        thread::sleep(Duration::from_millis(11));
        assert!(timer.ready());
        assert_eq!(timer.time_until_ready(), Duration::ZERO);
    }

    #[test]
    fn test_zero_delay_always_ready() {
        let mut timer = RetransmitTimer::new(Duration::ZERO);
        timer.mark_transmit();
        assert!(timer.ready());
    }
}
