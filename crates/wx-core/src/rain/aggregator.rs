use embassy_sync::blocking_mutex::raw::RawMutex;
use log::debug;

use super::accumulator::PulseAccumulator;

/// Running rainfall total fed from a [`PulseAccumulator`].
///
/// Owned by the serving loop; the gauge task only ever sees the accumulator.
pub struct RainfallAggregator<'a, M: RawMutex> {
    pulses: &'a PulseAccumulator<M>,
    mm_per_pulse: f32,
    total_mm: f32,
}

impl<'a, M: RawMutex> RainfallAggregator<'a, M> {
    pub const fn new(pulses: &'a PulseAccumulator<M>, mm_per_pulse: f32) -> Self {
        Self {
            pulses,
            mm_per_pulse,
            total_mm: 0.0,
        }
    }

    /// Drains the pulses recorded since the last tick into the total and returns it.
    pub fn tick(&mut self) -> f32 {
        let drained = self.pulses.drain_and_reset();
        if drained > 0 {
            self.total_mm += drained as f32 * self.mm_per_pulse;
            debug!("Drained {} rain pulses, total {} mm", drained, self.total_mm);
        }
        self.total_mm
    }

    pub fn total_mm(&self) -> f32 {
        self.total_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn total_is_half_mm_per_drained_pulse() {
        let pulses = PulseAccumulator::<NoopRawMutex>::new();
        let mut rain = RainfallAggregator::new(&pulses, 0.5);

        let mut drained = 0u32;
        let mut previous = 0.0;
        for batch in [3u32, 0, 7, 1, 0, 12] {
            for _ in 0..batch {
                pulses.increment();
            }
            drained += batch;

            let total = rain.tick();
            assert_eq!(total, 0.5 * drained as f32);
            assert!(total >= previous);
            previous = total;
        }

        assert_eq!(rain.total_mm(), 11.5);
    }

    #[test]
    fn tick_without_pulses_keeps_total() {
        let pulses = PulseAccumulator::<NoopRawMutex>::new();
        let mut rain = RainfallAggregator::new(&pulses, 0.2794);

        assert_eq!(rain.tick(), 0.0);
        pulses.increment();
        let after_one = rain.tick();
        assert_eq!(rain.tick(), after_one);
    }
}
