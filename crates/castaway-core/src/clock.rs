//! Session clock and the single one-shot timer.
//!
//! The clock does not read wall time. It records the elapsed time carried
//! by each tick event, and a timer is only ever checked when a tick
//! arrives, so timers fire with tick granularity. At most one timer can be
//! armed; arming replaces whatever was armed before.

use std::time::Duration;

/// Elapsed session time plus at most one pending deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionClock {
    /// Elapsed time reported by the most recent tick.
    elapsed: Duration,

    /// Absolute deadline of the armed timer, if any.
    deadline: Option<Duration>,
}

impl SessionClock {
    /// Create a clock at zero with no timer armed.
    pub const fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            deadline: None,
        }
    }

    /// Time since the session started, as of the last tick.
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The armed deadline, if any.
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Arm the timer `duration` after the current elapsed time, replacing
    /// any armed timer.
    pub const fn set_timeout(&mut self, duration: Duration) {
        self.deadline = Some(self.elapsed.saturating_add(duration));
    }

    /// Disarm the timer.
    pub const fn clear_timeout(&mut self) {
        self.deadline = None;
    }

    /// Record a tick. Returns `true` exactly once per armed timer, on the
    /// first tick strictly past its deadline; the timer is disarmed when
    /// it fires.
    pub fn advance_to(&mut self, elapsed: Duration) -> bool {
        self.elapsed = elapsed;
        match self.deadline {
            Some(deadline) if elapsed > deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(300);

    fn ticks(n: u32) -> Duration {
        TICK.saturating_mul(n)
    }

    #[test]
    fn clock_starts_at_zero_without_timer() {
        let clock = SessionClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert_eq!(clock.deadline(), None);
    }

    #[test]
    fn timer_fires_once_on_first_tick_past_deadline() {
        let mut clock = SessionClock::new();
        clock.set_timeout(Duration::from_millis(600));

        assert!(!clock.advance_to(ticks(1)));
        // Exactly at the deadline is not yet past it.
        assert!(!clock.advance_to(ticks(2)));
        assert!(clock.advance_to(ticks(3)));
        // One-shot: later ticks do not fire again.
        assert!(!clock.advance_to(ticks(4)));
        assert_eq!(clock.deadline(), None);
    }

    #[test]
    fn arming_replaces_previous_timer() {
        let mut clock = SessionClock::new();
        clock.set_timeout(Duration::from_millis(100));
        clock.set_timeout(Duration::from_secs(10));

        assert!(!clock.advance_to(ticks(1)));
        assert_eq!(clock.deadline(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn timeout_is_relative_to_last_tick() {
        let mut clock = SessionClock::new();
        clock.advance_to(ticks(10));
        clock.set_timeout(Duration::from_secs(2));
        assert_eq!(clock.deadline(), Some(ticks(10).saturating_add(Duration::from_secs(2))));
    }

    #[test]
    fn cleared_timer_never_fires() {
        let mut clock = SessionClock::new();
        clock.set_timeout(Duration::from_millis(100));
        clock.clear_timeout();
        assert!(!clock.advance_to(ticks(5)));
    }
}
