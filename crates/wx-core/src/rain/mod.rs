//! Rain gauge pulse counting and rainfall aggregation
//!
//! The gauge tips a small bucket for every fixed depth of rain and pulls its
//! output line low for each tip. Two contexts cooperate over one
//! [`PulseAccumulator`]:
//!
//! - the [`PulseCounter`] polls the line and increments the accumulator once
//!   per falling edge,
//! - the serving loop owns a [`RainfallAggregator`] that drains the
//!   accumulator once per serve cycle and keeps the running total.
//!
//! ```rust,ignore
//! static RAIN_PULSES: SharedPulses = PulseAccumulator::new();
//!
//! // Gauge task
//! PulseCounter::new(&RAIN_PULSES).run(pin, embassy_time::Delay, 10).await;
//!
//! // Serving task
//! let mut rain = RainfallAggregator::new(&RAIN_PULSES, 0.5);
//! let total_mm = rain.tick();
//! ```

pub mod accumulator;
pub mod aggregator;
pub mod pulse_counter;

pub use accumulator::{PulseAccumulator, SharedPulses};
pub use aggregator::RainfallAggregator;
pub use pulse_counter::{EdgeDetector, PulseCounter};
