//! Peripheral bring-up for the station board
//!
//! Pin assignment:
//! - rain gauge reed switch: GPIO1, pulled up, closes to ground
//! - BME280: I2C0 on SDA GPIO8 / SCL GPIO9
//! - MCP3008: SPI3 on SCK GPIO10 / MOSI GPIO11 / MISO GPIO12 / CS GPIO13
//! - SD card: SPI2 on SCK GPIO36 / MOSI GPIO35 / MISO GPIO37 / CS GPIO38

use embassy_time::Delay;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals;
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::{Async, Blocking};
use log::{error, info, warn};
use wx_core::app_state::{StationError, short_message};

/// SPI device the MCP3008 sits on.
pub type AdcSpi = ExclusiveDevice<Spi<'static, Async>, Output<'static>, NoDelay>;

/// SPI device the SD card sits on.
pub type SdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>;

pub type SdCard = embedded_sdmmc::SdCard<SdSpi, Delay>;

/// Configures the rain gauge input.
///
/// The reed switch pulls the line low while the bucket tips.
pub fn create_rain_gauge_pin(pin: peripherals::GPIO1<'static>) -> Input<'static> {
    Input::new(pin, InputConfig::default().with_pull(Pull::Up))
}

/// Initialize the I2C bus the pressure sensor is on
pub fn create_i2c_bus(
    i2c0: peripherals::I2C0<'static>,
    sda: peripherals::GPIO8<'static>,
    scl: peripherals::GPIO9<'static>,
) -> Result<I2c<'static, Async>, StationError> {
    let bus = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(100)))
        .map_err(|e| {
            error!("I2C config rejected: {:?}", e);
            StationError::Sensor(short_message(format_args!("I2C config: {:?}", e)))
        })?
        .with_sda(sda)
        .with_scl(scl)
        .into_async();

    info!("I2C bus ready");
    Ok(bus)
}

/// Initialize the SPI bus and chip select for the MCP3008
pub fn create_adc_device(
    spi3: peripherals::SPI3<'static>,
    sck: peripherals::GPIO10<'static>,
    mosi: peripherals::GPIO11<'static>,
    miso: peripherals::GPIO12<'static>,
    cs: peripherals::GPIO13<'static>,
) -> Result<AdcSpi, StationError> {
    let config = SpiConfig::default()
        .with_frequency(Rate::from_khz(1000))
        .with_mode(Mode::_0);
    let bus = Spi::new(spi3, config)
        .map_err(|e| {
            error!("ADC SPI config rejected: {:?}", e);
            StationError::Sensor(short_message(format_args!("ADC SPI config: {:?}", e)))
        })?
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso)
        .into_async();
    let cs = Output::new(cs, Level::High, OutputConfig::default());

    let Ok(device) = ExclusiveDevice::new_no_delay(bus, cs);
    info!("ADC SPI ready");
    Ok(device)
}

/// SPI clock once the card has left its identification phase.
const SD_DATA_RATE_MHZ: u32 = 16;

/// Initialize SPI hardware for the SD card
///
/// Starts at the 400 kHz the card accepts before it has been initialized,
/// then brings the card up and moves to [`SD_DATA_RATE_MHZ`] so log writes
/// hold the bus for as short a time as possible.
pub fn create_sd_card(
    spi2: peripherals::SPI2<'static>,
    sck: peripherals::GPIO36<'static>,
    mosi: peripherals::GPIO35<'static>,
    miso: peripherals::GPIO37<'static>,
    cs: peripherals::GPIO38<'static>,
) -> Result<SdCard, StationError> {
    let config = SpiConfig::default()
        .with_frequency(Rate::from_khz(400))
        .with_mode(Mode::_0);
    let bus = Spi::new(spi2, config)
        .map_err(|e| {
            error!("SD card SPI config rejected: {:?}", e);
            StationError::Storage(short_message(format_args!("SD SPI config: {:?}", e)))
        })?
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso);
    let cs = Output::new(cs, Level::High, OutputConfig::default());

    let Ok(device) = ExclusiveDevice::new(bus, cs, Delay);
    let card = embedded_sdmmc::SdCard::new(device, Delay);
    speed_up_sd_card(&card);
    info!("SD card SPI ready");
    Ok(card)
}

/// Initializes the card and raises the bus clock.
///
/// A missing or unresponsive card stays at 400 kHz; storage errors surface
/// later through the log writer.
fn speed_up_sd_card(card: &SdCard) {
    match card.num_bytes() {
        Ok(bytes) => info!("SD card initialized, {} MB", bytes / (1024 * 1024)),
        Err(e) => {
            warn!("SD card not initialized, staying at 400 kHz: {:?}", e);
            return;
        }
    }

    let fast = SpiConfig::default()
        .with_frequency(Rate::from_mhz(SD_DATA_RATE_MHZ))
        .with_mode(Mode::_0);
    if let Err(e) = card.spi(|device| device.bus_mut().apply_config(&fast)) {
        warn!("SD card SPI clock change rejected: {:?}", e);
    }
}
