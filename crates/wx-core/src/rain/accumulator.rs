use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};

/// Accumulator shared between the gauge task and the serving loop.
pub type SharedPulses = PulseAccumulator<CriticalSectionRawMutex>;

/// Raw gauge pulse count behind a blocking mutex.
///
/// `increment` and `drain_and_reset` are the only ways to touch the count;
/// both hold the lock for a single read-modify-write so neither context can
/// observe a half-applied update from the other.
pub struct PulseAccumulator<M: RawMutex> {
    count: Mutex<M, Cell<u32>>,
}

impl<M: RawMutex> Default for PulseAccumulator<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> PulseAccumulator<M> {
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(0)),
        }
    }

    /// Records one gauge tip.
    ///
    /// Saturates at `u32::MAX` rather than wrapping back to zero.
    pub fn increment(&self) {
        self.count.lock(|count| count.set(count.get().saturating_add(1)));
    }

    /// Returns the pulses recorded since the previous drain and zeroes the count.
    pub fn drain_and_reset(&self) -> u32 {
        self.count.lock(|count| count.replace(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::thread;
    use std::vec::Vec;

    #[test]
    fn drain_returns_every_increment_and_resets() {
        let pulses = PulseAccumulator::<NoopRawMutex>::new();
        for _ in 0..37 {
            pulses.increment();
        }

        assert_eq!(pulses.drain_and_reset(), 37);
        assert_eq!(pulses.drain_and_reset(), 0);
    }

    #[test]
    fn increment_saturates_instead_of_wrapping() {
        let pulses = PulseAccumulator::<NoopRawMutex>::new();
        pulses.count.lock(|count| count.set(u32::MAX - 1));

        pulses.increment();
        pulses.increment();

        assert_eq!(pulses.drain_and_reset(), u32::MAX);
    }

    #[test]
    fn concurrent_increments_and_drains_conserve_count() {
        const PRODUCERS: u64 = 4;
        const PULSES_PER_PRODUCER: u64 = 25_000;

        let pulses = Arc::new(SharedPulses::new());
        let done = Arc::new(AtomicBool::new(false));
        let drained = Arc::new(AtomicU64::new(0));

        let drainer = {
            let pulses = Arc::clone(&pulses);
            let done = Arc::clone(&done);
            let drained = Arc::clone(&drained);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    drained.fetch_add(pulses.drain_and_reset() as u64, Ordering::Relaxed);
                    thread::yield_now();
                }
            })
        };

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let pulses = Arc::clone(&pulses);
                thread::spawn(move || {
                    for _ in 0..PULSES_PER_PRODUCER {
                        pulses.increment();
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        drainer.join().unwrap();

        let outstanding = pulses.drain_and_reset() as u64;
        assert_eq!(
            drained.load(Ordering::Relaxed) + outstanding,
            PRODUCERS * PULSES_PER_PRODUCER
        );
    }
}
