use embedded_hal_async::spi::SpiDevice;
use log::error;

use super::{AnalogInput, SensorError};

/// Single-ended inputs on the converter.
pub const CHANNELS: u8 = 8;
const START_BIT: u8 = 0x01;
const SINGLE_ENDED: u8 = 0x80;

/// MCP3008 8-channel 10-bit ADC on an SPI device.
pub struct Mcp3008<S> {
    spi: S,
}

impl<S: SpiDevice> Mcp3008<S> {
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Single-ended conversion of `channel`, returning the 10-bit code.
    pub async fn read(&mut self, channel: u8) -> Result<u16, SensorError> {
        if channel >= CHANNELS {
            return Err(SensorError::InvalidChannel {
                sensor: "MCP3008",
                channel,
            });
        }

        let command = [START_BIT, SINGLE_ENDED | (channel << 4), 0x00];
        let mut response = [0u8; 3];
        self.spi
            .transfer(&mut response, &command)
            .await
            .map_err(|e| {
                error!("MCP3008 transfer on channel {} failed: {:?}", channel, e);
                SensorError::ReadFailed {
                    sensor: "MCP3008",
                    operation: "convert analog channel",
                    details: "SPI communication error",
                }
            })?;

        Ok((((response[1] & 0x03) as u16) << 8) | response[2] as u16)
    }
}

impl<S: SpiDevice> AnalogInput for Mcp3008<S> {
    async fn read_channel(&mut self, channel: u8) -> Result<u16, SensorError> {
        self.read(channel).await
    }
}
