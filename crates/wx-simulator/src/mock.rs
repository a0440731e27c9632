//! Synthetic hardware: analog probes, a barometer and a tipping-bucket gauge

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::digital::PinState;
use log::info;
use wx_core::rain::{PulseCounter, SharedPulses};
use wx_core::sensors::{AnalogChannels, AnalogConversion, AnalogInput, PressureSensor, SensorError};

/// How long the simulated reed switch stays closed per tip.
const TIP_CLOSURE_MS: u32 = 50;

/// Temperature in °C, `t` seconds into the run.
fn temperature_at(t: f64) -> f64 {
    23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos()
}

/// Relative humidity in %, `t` seconds into the run.
fn humidity_at(t: f64) -> f64 {
    50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos()
}

/// Pressure in hPa, `t` seconds into the run.
fn pressure_at(t: f64) -> f64 {
    1013.25 + 4.0 * (t / 600.0).sin()
}

/// An ADC whose channels carry slowly drifting temperature and humidity
/// probe voltages.
///
/// Codes are produced by inverting `conversion`, so the values the station
/// computes from them follow the curves above to within one code.
pub struct SimulatedAdc {
    conversion: AnalogConversion,
    channels: AnalogChannels,
    started: Instant,
}

impl SimulatedAdc {
    pub fn new(conversion: AnalogConversion, channels: AnalogChannels) -> Self {
        Self {
            conversion,
            channels,
            started: Instant::now(),
        }
    }

    fn code_for_volts(&self, volts: f64) -> u16 {
        let max_code = (1u32 << self.conversion.resolution_bits) - 1;
        let code = volts / f64::from(self.conversion.vref) * f64::from(max_code + 1);
        code.round().clamp(0.0, f64::from(max_code)) as u16
    }

    fn code_at(&self, channel: u8, t: f64) -> Result<u16, SensorError> {
        let volts = if channel == self.channels.temperature {
            temperature_at(t) / f64::from(self.conversion.temperature_scale)
                + f64::from(self.conversion.temperature_offset)
        } else if channel == self.channels.humidity {
            humidity_at(t) / 100.0
        } else {
            return Err(SensorError::InvalidChannel {
                sensor: "simulated ADC",
                channel,
            });
        };
        Ok(self.code_for_volts(volts))
    }
}

impl AnalogInput for SimulatedAdc {
    async fn read_channel(&mut self, channel: u8) -> Result<u16, SensorError> {
        self.code_at(channel, self.started.elapsed().as_secs_f64())
    }
}

pub struct SimulatedBarometer {
    started: Instant,
}

impl SimulatedBarometer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SimulatedBarometer {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureSensor for SimulatedBarometer {
    async fn read_pressure(&mut self) -> Result<f32, SensorError> {
        Ok(pressure_at(self.started.elapsed().as_secs_f64()) as f32)
    }
}

/// Level of a gauge that tips once every `tip_period_ms`.
///
/// The line idles high and is held low for the last [`TIP_CLOSURE_MS`] of
/// each period.
pub fn gauge_level(elapsed_ms: u64, tip_period_ms: u32) -> PinState {
    let closure = u64::from(TIP_CLOSURE_MS.min(tip_period_ms / 2).max(1));
    let period = u64::from(tip_period_ms);
    if elapsed_ms % period >= period - closure {
        PinState::Low
    } else {
        PinState::High
    }
}

/// Runs a simulated gauge on its own thread, feeding `pulses` the way the
/// firmware's gauge task does.
pub fn spawn_gauge(
    pulses: &'static SharedPulses,
    poll_interval_ms: u32,
    tip_period_ms: u32,
) -> io::Result<JoinHandle<()>> {
    info!(
        "Simulated gauge tipping every {} ms, polled every {} ms",
        tip_period_ms, poll_interval_ms
    );
    thread::Builder::new()
        .name("rain-gauge".into())
        .spawn(move || {
            let mut counter = PulseCounter::new(pulses);
            let started = Instant::now();
            loop {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                counter.sample(gauge_level(elapsed_ms, tip_period_ms));
                thread::sleep(Duration::from_millis(u64::from(poll_interval_ms)));
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use wx_core::rain::PulseAccumulator;
    use wx_core::sensors::{Sensor, StationSensors};

    #[test]
    fn station_sees_simulated_curves() {
        let conversion = AnalogConversion::default();
        let channels = AnalogChannels::default();
        let adc = SimulatedAdc::new(conversion, channels);
        let t = 0.0;
        let expected_temperature = temperature_at(t) as f32;
        let expected_humidity = humidity_at(t) as f32;

        let mut sensors = StationSensors::new(adc, SimulatedBarometer::new(), conversion, channels);
        let reading = block_on(sensors.read()).unwrap();

        // One 10-bit code is ~0.32 °C and ~0.32 %RH
        assert!((reading.temperature_celsius - expected_temperature).abs() < 0.5);
        assert!((reading.humidity_percent - expected_humidity).abs() < 0.5);
        assert!((1009.0..=1018.0).contains(&reading.pressure));
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let adc = SimulatedAdc::new(AnalogConversion::default(), AnalogChannels::default());

        assert_eq!(
            adc.code_at(5, 0.0),
            Err(SensorError::InvalidChannel {
                sensor: "simulated ADC",
                channel: 5,
            })
        );
    }

    #[test]
    fn codes_stay_in_adc_range() {
        let conversion = AnalogConversion::default();
        let adc = SimulatedAdc::new(conversion, AnalogChannels::default());

        assert_eq!(adc.code_for_volts(-1.0), 0);
        assert_eq!(adc.code_for_volts(10.0), 1023);
    }

    #[test]
    fn sampled_gauge_counts_one_pulse_per_tip() {
        let pulses: SharedPulses = PulseAccumulator::new();
        let mut counter = PulseCounter::new(&pulses);

        // Five periods of a 1 s gauge polled every 10 ms
        for elapsed_ms in (0..5_000).step_by(10) {
            counter.sample(gauge_level(elapsed_ms, 1_000));
        }

        assert_eq!(pulses.drain_and_reset(), 5);
    }

    #[test]
    fn short_periods_still_have_an_open_phase() {
        assert_eq!(gauge_level(0, 2), PinState::High);
        assert_eq!(gauge_level(1, 2), PinState::Low);
    }
}
