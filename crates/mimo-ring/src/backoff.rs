use std::hint;
use std::thread;
use std::time::Duration;

/// Adaptive backoff strategy (Crossbeam-style): spin with PAUSE hints, then
/// yield to the OS scheduler, then fall back to short sleeps.
///
/// The slot buffer's blocking operations (`acquire_write`/`acquire_read` on
/// an exhausted queue) are the only suspension points in the whole runtime.
/// Because producers and consumers here are separate OS processes rather
/// than threads in one address space, there is no portable futex to park on
/// across the shared-memory boundary, so `Backoff` is the blocking
/// primitive, not just an optimization.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;
    const SLEEP_LIMIT: u32 = 20;

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Light spin with PAUSE hints.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1 << self.step.min(Self::SPIN_LIMIT);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
    }

    /// Heavier backoff: spin, then yield, then sleep in growing steps.
    ///
    /// Never gives up: callers that must block indefinitely (blocking
    /// `acquire_write`/`acquire_read`) call this in a loop until their
    /// condition is satisfied. `is_exhausted` tells callers that are allowed
    /// to give up (none in this crate today, but kept for symmetry) when
    /// spinning has stopped being worthwhile.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            self.spin();
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
            self.step += 1;
        } else {
            let millis = 1u64 << (self.step - Self::YIELD_LIMIT - 1).min(4);
            thread::sleep(Duration::from_millis(millis));
            if self.step <= Self::SLEEP_LIMIT {
                self.step += 1;
            }
        }
    }

    /// True once spinning and yielding are exhausted and `snooze` has moved
    /// on to sleeping.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    /// Reset for the next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::new();
        assert_eq!(b.step, 0);

        b.spin();
        assert!(b.step > 0);

        for _ in 0..30 {
            b.snooze();
        }
        assert!(b.is_exhausted());

        b.reset();
        assert_eq!(b.step, 0);
        assert!(!b.is_exhausted());
    }
}
