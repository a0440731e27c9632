use embedded_hal::digital::{InputPin, PinState};
use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};

use super::accumulator::PulseAccumulator;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Falling-edge detector for a polled, active-low input.
///
/// A tip is reported when the previous sample was high and the current one
/// is low; a line held low reports nothing further until it has gone high
/// again. The first sample is compared against a low level, so a line that
/// starts low does not count.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    last: PinState,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeDetector {
    pub const fn new() -> Self {
        Self {
            last: PinState::Low,
        }
    }

    /// Feeds one sample, returning `true` on a high-to-low transition.
    pub fn observe(&mut self, level: PinState) -> bool {
        let falling = self.last == PinState::High && level == PinState::Low;
        self.last = level;
        falling
    }
}

/// Counts gauge tips into a shared [`PulseAccumulator`].
pub struct PulseCounter<'a, M: RawMutex> {
    pulses: &'a PulseAccumulator<M>,
    edges: EdgeDetector,
}

impl<'a, M: RawMutex> PulseCounter<'a, M> {
    pub const fn new(pulses: &'a PulseAccumulator<M>) -> Self {
        Self {
            pulses,
            edges: EdgeDetector::new(),
        }
    }

    /// Processes one sample of the gauge line, returning whether it counted a tip.
    pub fn sample(&mut self, level: PinState) -> bool {
        let tipped = self.edges.observe(level);
        if tipped {
            self.pulses.increment();
            debug!("Rain gauge tip");
        }
        tipped
    }

    /// Reads the pin once and processes the result.
    ///
    /// A failed read skips the sample and leaves the previous level in place.
    pub fn poll<P: InputPin>(&mut self, pin: &mut P) -> bool {
        match pin.is_high() {
            Ok(high) => self.sample(PinState::from(high)),
            Err(e) => {
                warn!("Rain gauge pin read failed: {:?}", e);
                false
            }
        }
    }

    /// Polls the gauge forever, sleeping `interval_ms` between samples.
    pub async fn run<P: InputPin, D: DelayNs>(
        &mut self,
        mut pin: P,
        mut delay: D,
        interval_ms: u32,
    ) -> ! {
        loop {
            self.poll(&mut pin);
            delay.delay_ms(interval_ms).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use std::vec::Vec;

    use PinState::{High, Low};

    fn count_edges(levels: &[PinState]) -> u32 {
        let pulses = PulseAccumulator::<NoopRawMutex>::new();
        let mut counter = PulseCounter::new(&pulses);
        for &level in levels {
            counter.sample(level);
        }
        pulses.drain_and_reset()
    }

    #[test]
    fn counts_once_per_falling_edge_not_per_low_sample() {
        let levels = [High, High, Low, Low, Low, Low, High, Low, Low, High];
        assert_eq!(count_edges(&levels), 2);
    }

    #[test]
    fn line_starting_low_is_not_a_tip() {
        assert_eq!(count_edges(&[Low, Low, Low]), 0);
        assert_eq!(count_edges(&[Low, High, Low]), 1);
    }

    #[test]
    fn n_edges_without_drain_are_all_counted() {
        let mut levels = Vec::new();
        for _ in 0..250 {
            levels.extend_from_slice(&[High, High, Low, Low]);
        }
        assert_eq!(count_edges(&levels), 250);
    }

    struct ScriptedPin {
        levels: Vec<Result<bool, ()>>,
    }

    #[derive(Debug)]
    struct PinFault;

    impl embedded_hal::digital::Error for PinFault {
        fn kind(&self) -> embedded_hal::digital::ErrorKind {
            embedded_hal::digital::ErrorKind::Other
        }
    }

    impl embedded_hal::digital::ErrorType for ScriptedPin {
        type Error = PinFault;
    }

    impl InputPin for ScriptedPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.levels.remove(0).map_err(|_| PinFault)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.is_high().map(|high| !high)
        }
    }

    #[test]
    fn failed_read_keeps_previous_level() {
        let pulses = PulseAccumulator::<NoopRawMutex>::new();
        let mut counter = PulseCounter::new(&pulses);
        let mut pin = ScriptedPin {
            levels: [Ok(true), Err(()), Ok(false), Ok(false)].into_iter().collect(),
        };

        let tips: Vec<bool> = (0..4).map(|_| counter.poll(&mut pin)).collect();

        assert_eq!(tips, [false, false, true, false]);
        assert_eq!(pulses.drain_and_reset(), 1);
    }

    struct AlwaysHigh;

    impl embedded_hal::digital::ErrorType for AlwaysHigh {
        type Error = Infallible;
    }

    impl InputPin for AlwaysHigh {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(true)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(false)
        }
    }

    #[test]
    fn idle_line_never_counts() {
        let pulses = PulseAccumulator::<NoopRawMutex>::new();
        let mut counter = PulseCounter::new(&pulses);
        let mut pin = AlwaysHigh;
        for _ in 0..100 {
            assert!(!counter.poll(&mut pin));
        }
        assert_eq!(pulses.drain_and_reset(), 0);
    }
}
