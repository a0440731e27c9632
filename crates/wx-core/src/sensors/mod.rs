#[cfg(feature = "sensor-bme280")]
mod bme280_pressure;
mod mcp3008;

use thiserror_no_std::Error;

#[cfg(feature = "sensor-bme280")]
pub use bme280_pressure::Bme280Pressure;
pub use mcp3008::{CHANNELS as MCP3008_CHANNELS, Mcp3008};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: failed to {operation} ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: initialization failed ({details})")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: channel {channel} does not exist")]
    InvalidChannel { sensor: &'static str, channel: u8 },
}

/// One set of station readings in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    /// Pressure exactly as the environmental sensor reports it
    pub pressure: f32,
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Readings;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}

/// A multi-channel ADC returning raw conversion codes.
pub trait AnalogInput {
    fn read_channel(&mut self, channel: u8) -> impl Future<Output = Result<u16, SensorError>>;
}

/// A sensor that reports barometric pressure.
pub trait PressureSensor {
    fn read_pressure(&mut self) -> impl Future<Output = Result<f32, SensorError>>;
}

/// Linear conversion from ADC codes to temperature and relative humidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogConversion {
    pub vref: f32,
    pub resolution_bits: u8,
    pub temperature_offset: f32,
    pub temperature_scale: f32,
}

impl Default for AnalogConversion {
    fn default() -> Self {
        Self {
            vref: 3.3,
            resolution_bits: 10,
            temperature_offset: 0.5,
            temperature_scale: 100.0,
        }
    }
}

impl AnalogConversion {
    pub fn volts(&self, raw: u16) -> f32 {
        raw as f32 * self.vref / (1u32 << self.resolution_bits) as f32
    }

    /// `(V - offset) * scale`, the transfer function of a TMP36-style probe.
    pub fn temperature_celsius(&self, raw: u16) -> f32 {
        (self.volts(raw) - self.temperature_offset) * self.temperature_scale
    }

    /// Relative humidity as a direct percentage of the reference voltage.
    pub fn humidity_percent(&self, raw: u16) -> f32 {
        self.volts(raw) * 100.0
    }
}

/// Channel assignment for the analog probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogChannels {
    pub temperature: u8,
    pub humidity: u8,
}

impl Default for AnalogChannels {
    fn default() -> Self {
        Self {
            temperature: 1,
            humidity: 0,
        }
    }
}

/// Reads the analog probes and the pressure sensor into one [`SensorReading`].
///
/// Every call goes to the hardware; nothing is cached between reads.
pub struct StationSensors<A, P> {
    adc: A,
    pressure: P,
    conversion: AnalogConversion,
    channels: AnalogChannels,
}

impl<A: AnalogInput, P: PressureSensor> StationSensors<A, P> {
    pub fn new(
        adc: A,
        pressure: P,
        conversion: AnalogConversion,
        channels: AnalogChannels,
    ) -> Self {
        Self {
            adc,
            pressure,
            conversion,
            channels,
        }
    }
}

impl<A: AnalogInput, P: PressureSensor> Sensor for StationSensors<A, P> {
    type Readings = SensorReading;

    async fn read(&mut self) -> Result<SensorReading, SensorError> {
        let temperature_raw = self.adc.read_channel(self.channels.temperature).await?;
        let humidity_raw = self.adc.read_channel(self.channels.humidity).await?;
        let pressure = self.pressure.read_pressure().await?;

        Ok(SensorReading {
            temperature_celsius: self.conversion.temperature_celsius(temperature_raw),
            humidity_percent: self.conversion.humidity_percent(humidity_raw),
            pressure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::vec::Vec;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn reference_conversion() {
        let conversion = AnalogConversion::default();

        // 233 counts is ~0.751 V, just over 25 °C on a TMP36
        let celsius = conversion.temperature_celsius(233);
        assert!(close(celsius, (233.0 * 3.3 / 1024.0 - 0.5) * 100.0));
        assert!((celsius - 25.0).abs() < 0.5, "{}", celsius);

        assert!(close(conversion.humidity_percent(0), 0.0));
        assert!(close(conversion.humidity_percent(512), 165.0));
        assert!(close(conversion.temperature_celsius(0), -50.0));
    }

    struct FakeAdc {
        codes: [u16; 8],
        reads: Vec<u8>,
    }

    impl AnalogInput for FakeAdc {
        async fn read_channel(&mut self, channel: u8) -> Result<u16, SensorError> {
            self.reads.push(channel);
            Ok(self.codes[channel as usize])
        }
    }

    struct FakePressure(Result<f32, SensorError>);

    impl PressureSensor for FakePressure {
        async fn read_pressure(&mut self) -> Result<f32, SensorError> {
            self.0
        }
    }

    #[test]
    fn station_sensors_read_each_source_fresh() {
        let mut codes = [0u16; 8];
        codes[0] = 310;
        codes[1] = 233;
        let adc = FakeAdc {
            codes,
            reads: Vec::new(),
        };
        let mut sensors = StationSensors::new(
            adc,
            FakePressure(Ok(101_325.0)),
            AnalogConversion::default(),
            AnalogChannels::default(),
        );

        let first = block_on(sensors.read()).unwrap();
        let second = block_on(sensors.read()).unwrap();

        assert_eq!(first, second);
        assert_eq!(sensors.adc.reads, [1, 0, 1, 0]);
        assert!(close(first.temperature_celsius, (233.0 * 3.3 / 1024.0 - 0.5) * 100.0));
        assert!(close(first.humidity_percent, 310.0 * 3.3 / 1024.0 * 100.0));
        assert_eq!(first.pressure, 101_325.0);
    }

    #[test]
    fn pressure_failure_propagates() {
        let failure = SensorError::ReadFailed {
            sensor: "BME280",
            operation: "measure",
            details: "I2C communication error",
        };
        let mut sensors = StationSensors::new(
            FakeAdc {
                codes: [0; 8],
                reads: Vec::new(),
            },
            FakePressure(Err(failure)),
            AnalogConversion::default(),
            AnalogChannels::default(),
        );

        assert_eq!(block_on(sensors.read()), Err(failure));
    }
}
