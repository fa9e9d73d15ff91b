//! Leading-edge throttle with a trailing coalesced call.
//!
//! One shared utility for every rate-limited path in the engine: the first
//! call in a window fires immediately; calls arriving inside the window
//! coalesce into a single trailing fire at window end. Time is injected
//! through [`Clock`] so throttle behavior is tested with a fake clock.

use std::time::{Duration, Instant};

/// Monotonic time source. Returns elapsed time since an arbitrary epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Real clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Outcome of asking the throttle for permission to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Outside the window: run now.
    Fire,
    /// Inside the window: coalesced into the pending trailing fire.
    Deferred,
}

/// Leading-edge throttle state machine.
#[derive(Debug)]
pub struct Throttle<C: Clock> {
    window: Duration,
    clock: C,
    last_fire: Option<Duration>,
    trailing: bool,
}

impl<C: Clock> Throttle<C> {
    pub fn new(window: Duration, clock: C) -> Self {
        Self {
            window,
            clock,
            last_fire: None,
            trailing: false,
        }
    }

    /// Ask to run. [`Gate::Fire`] consumes the window; [`Gate::Deferred`]
    /// marks a trailing fire as pending.
    pub fn acquire(&mut self) -> Gate {
        let now = self.clock.now();
        match self.last_fire {
            Some(prev) if now < prev + self.window => {
                self.trailing = true;
                Gate::Deferred
            }
            _ => {
                self.last_fire = Some(now);
                self.trailing = false;
                Gate::Fire
            }
        }
    }

    /// Time remaining until the pending trailing fire is due, if one is
    /// pending.
    pub fn remaining(&self) -> Option<Duration> {
        if !self.trailing {
            return None;
        }
        let deadline = self.last_fire? + self.window;
        Some(deadline.saturating_sub(self.clock.now()))
    }

    /// Consume the pending trailing fire, if any, and open a fresh window.
    /// Returns whether the caller should run now. Callers decide when the
    /// window has ended (their timer expiring is that signal); the throttle
    /// only tracks whether a trailing call is owed.
    pub fn take_trailing(&mut self) -> bool {
        if !self.trailing {
            return false;
        }
        self.trailing = false;
        self.last_fire = Some(self.clock.now());
        true
    }

    /// Whether a trailing fire is pending.
    pub fn has_trailing(&self) -> bool {
        self.trailing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Default)]
    struct FakeClock(Rc<Cell<Duration>>);

    impl FakeClock {
        fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Duration {
            self.0.get()
        }
    }

    fn throttle_ms(window_ms: u64) -> (Throttle<FakeClock>, FakeClock) {
        let clock = FakeClock::default();
        let throttle = Throttle::new(Duration::from_millis(window_ms), clock.clone());
        (throttle, clock)
    }

    #[test]
    fn test_first_call_fires_immediately() {
        let (mut throttle, _clock) = throttle_ms(100);
        assert_eq!(throttle.acquire(), Gate::Fire);
    }

    #[test]
    fn test_calls_inside_window_deferred() {
        let (mut throttle, clock) = throttle_ms(100);
        assert_eq!(throttle.acquire(), Gate::Fire);
        clock.advance(Duration::from_millis(30));
        assert_eq!(throttle.acquire(), Gate::Deferred);
        clock.advance(Duration::from_millis(30));
        assert_eq!(throttle.acquire(), Gate::Deferred);
        assert!(throttle.has_trailing());
    }

    #[test]
    fn test_call_after_window_fires_again() {
        let (mut throttle, clock) = throttle_ms(100);
        assert_eq!(throttle.acquire(), Gate::Fire);
        clock.advance(Duration::from_millis(100));
        assert_eq!(throttle.acquire(), Gate::Fire);
    }

    #[test]
    fn test_deferred_calls_coalesce_into_one_trailing_take() {
        let (mut throttle, clock) = throttle_ms(100);
        throttle.acquire();
        clock.advance(Duration::from_millis(50));
        throttle.acquire();
        throttle.acquire();
        assert!(throttle.has_trailing());

        clock.advance(Duration::from_millis(50));
        assert!(throttle.take_trailing());
        // Consumed: a second take does nothing
        assert!(!throttle.take_trailing());
        assert!(!throttle.has_trailing());
    }

    #[test]
    fn test_take_trailing_without_pending_is_noop() {
        let (mut throttle, _clock) = throttle_ms(100);
        assert!(!throttle.take_trailing());
        throttle.acquire();
        // A leading fire leaves nothing trailing to take
        assert!(!throttle.take_trailing());
    }

    #[test]
    fn test_remaining_counts_down() {
        let (mut throttle, clock) = throttle_ms(100);
        throttle.acquire();
        assert_eq!(throttle.remaining(), None);

        clock.advance(Duration::from_millis(40));
        throttle.acquire();
        assert_eq!(throttle.remaining(), Some(Duration::from_millis(60)));

        clock.advance(Duration::from_millis(70));
        assert_eq!(throttle.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_trailing_take_restarts_window() {
        let (mut throttle, clock) = throttle_ms(100);
        throttle.acquire();
        clock.advance(Duration::from_millis(50));
        throttle.acquire();
        clock.advance(Duration::from_millis(50));
        assert!(throttle.take_trailing());

        // The trailing fire opened a fresh window
        clock.advance(Duration::from_millis(10));
        assert_eq!(throttle.acquire(), Gate::Deferred);
    }
}
