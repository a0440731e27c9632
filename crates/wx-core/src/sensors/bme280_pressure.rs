use bme280::i2c::AsyncBME280;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{PressureSensor, SensorError};

const PASCALS_PER_HECTOPASCAL: f32 = 100.0;

/// The driver reports Pa; the station reports hPa.
fn hectopascals(pascals: f32) -> f32 {
    pascals / PASCALS_PER_HECTOPASCAL
}

/// BME280 used as the station's pressure source, reporting hPa.
pub struct Bme280Pressure<I, D> {
    sensor: AsyncBME280<I>,
    delay: D,
    initialized: bool,
}

impl<I: I2c, D: DelayNs> Bme280Pressure<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            sensor: AsyncBME280::new_primary(i2c),
            delay,
            initialized: false,
        }
    }

    /// Load calibration data and configure oversampling.
    async fn initialize(&mut self) -> Result<(), SensorError> {
        self.sensor.init(&mut self.delay).await.map_err(|e| {
            error!("BME280 init failed: {:?}", e);
            SensorError::InitializationFailed {
                sensor: "BME280",
                details: "Failed to read calibration data",
            }
        })?;

        info!("BME280 initialized");
        self.initialized = true;
        Ok(())
    }
}

impl<I: I2c, D: DelayNs> PressureSensor for Bme280Pressure<I, D> {
    async fn read_pressure(&mut self) -> Result<f32, SensorError> {
        // Initialize on first read, and again after a failed measurement
        if !self.initialized {
            self.initialize().await?;
        }

        let measurements = self.sensor.measure(&mut self.delay).await.map_err(|e| {
            error!("BME280 measurement failed: {:?}", e);
            self.initialized = false;
            SensorError::ReadFailed {
                sensor: "BME280",
                operation: "measure pressure",
                details: "I2C communication error or sensor not responding",
            }
        })?;

        Ok(hectopascals(measurements.pressure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_pascals_become_hectopascals() {
        assert_eq!(hectopascals(101_325.0), 1013.25);
        assert_eq!(hectopascals(0.0), 0.0);
    }
}
