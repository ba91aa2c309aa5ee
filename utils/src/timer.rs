use std::{fmt, time::Instant};

/// A source of monotonic wall time, in seconds.
///
/// Only differences between two readings are meaningful; the epoch is up to the
/// implementation.
pub trait Clock {
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline(always)]
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Clock backed by `std::time::Instant`, with the epoch at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Accumulates busy time over any number of `start`/`stop` intervals.
///
/// The accumulated value only moves on `stop`, so reading it in the middle of an
/// interval returns the total of the intervals closed so far.
///
/// Calling `stop` without a pending `start`, or `start` twice in a row, is a
/// usage error and panics.
pub struct Timer<C: Clock = MonotonicClock> {
    clock: C,
    seconds: f64,
    started_at: Option<f64>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    #[inline]
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::default())
    }
}

impl<C: Clock> Timer<C> {
    #[inline]
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            seconds: 0.0,
            started_at: None,
        }
    }

    /// Begin, or resume, accumulating.
    #[inline]
    pub fn start(&mut self) {
        assert!(
            self.started_at.is_none(),
            "timer started twice without an intervening stop"
        );
        self.started_at = Some(self.clock.now());
    }

    /// Close the current interval and return the accumulated seconds.
    #[inline]
    pub fn stop(&mut self) -> f64 {
        let started_at = match self.started_at.take() {
            Some(t) => t,
            None => panic!("timer stopped without a matching start"),
        };
        self.seconds += self.clock.now() - started_at;
        self.seconds
    }

    #[inline(always)]
    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    #[inline(always)]
    pub fn total(&self) -> f64 {
        self.seconds()
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

impl<C: Clock> fmt::Debug for Timer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("seconds", &self.seconds)
            .field("running", &self.is_running())
            .finish()
    }
}

impl<C: Clock> fmt::Display for Timer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.seconds)
    }
}
