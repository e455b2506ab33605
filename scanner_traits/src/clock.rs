use std::thread;
use std::time::{Duration, Instant};

/// Time source shared by the move engine and the simulated backend.
///
/// Both sides of a simulated move read the same clock, so a manual clock
/// drives interpolation and timeout detection in lockstep.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Time elapsed since `since`, saturating at zero.
    fn elapsed(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        u64::try_from(self.elapsed(epoch).as_millis()).unwrap_or(u64::MAX)
    }
}

/// Wall-clock implementation backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Manual clock for lifecycle tests.
    ///
    /// `now()` is `origin + offset`; `sleep(d)` advances the offset by `d`
    /// without blocking, so a polling loop runs through virtual time.
    /// Clones share the same offset.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Virtual time elapsed since construction.
        pub fn offset(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}
