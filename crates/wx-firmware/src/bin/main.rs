#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::convert::Infallible;

use embassy_executor::Spawner;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::Delay;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Input;
use esp_hal::interrupt::Priority;
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::rng::Rng;
use esp_hal::system::software_reset;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::WifiDevice;
use esp_rtos::embassy::InterruptExecutor;
use log::{error, info, warn};
use static_cell::StaticCell;

use wx_core::app_state::{RunState, StationError, StationState, short_message};
use wx_core::config::{CONFIG_FILE, StationConfig};
use wx_core::network::join_with_retry;
use wx_core::rain::{PulseAccumulator, PulseCounter, RainfallAggregator, SharedPulses};
use wx_core::sensors::{Bme280Pressure, Mcp3008, StationSensors};
use wx_core::server::{ServingLoop, Station};
use wx_core::storage::sd_card::SdCardStorage;
use wx_core::storage::{LOG_FILE, WeatherLog};
use wx_firmware::clock::UptimeClock;
use wx_firmware::hardware::{
    SdSpi, create_adc_device, create_i2c_bus, create_rain_gauge_pin, create_sd_card,
};
use wx_firmware::net::{TcpListener, WifiLink};
use wx_firmware::wifi_secrets;

/// Pulses counted by the gauge task and drained by the serving loop.
static RAIN_PULSES: SharedPulses = PulseAccumulator::new();

const TCP_BUFFER_SIZE: usize = 4096;

/// Runs the gauge task above thread mode, so blocking SD card writes and
/// sensor reads on the serving loop cannot delay its polls.
static GAUGE_EXECUTOR: StaticCell<InterruptExecutor<2>> = StaticCell::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    software_reset()
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn rain_gauge_task(pin: Input<'static>, interval_ms: u32) {
    info!("Rain gauge polling every {} ms", interval_ms);
    PulseCounter::new(&RAIN_PULSES)
        .run(pin, Delay, interval_ms)
        .await
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let mut state = StationState::new();
    match run(spawner, &mut state).await {
        Ok(never) => match never {},
        Err(e) => {
            state.transition(RunState::Error);
            error!("Station stopped: {}", e);
            software_reset()
        }
    }
}

async fn run(spawner: Spawner, state: &mut StationState) -> Result<Infallible, StationError> {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let clock = UptimeClock::new(wifi_secrets::station_epoch_secs());

    // SD card first: the stored configuration shapes everything after it
    let sd_card = create_sd_card(
        peripherals.SPI2,
        peripherals.GPIO36,
        peripherals.GPIO35,
        peripherals.GPIO37,
        peripherals.GPIO38,
    )?;
    let storage = SdCardStorage::new(sd_card, clock);
    let station_config = load_config(&storage);

    let sw_ints = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    let gauge_executor = GAUGE_EXECUTOR.init(InterruptExecutor::new(sw_ints.software_interrupt2));
    let gauge_spawner = gauge_executor.start(Priority::Priority2);

    let gauge_pin = create_rain_gauge_pin(peripherals.GPIO1);
    let gauge_task = rain_gauge_task(gauge_pin, station_config.rain_poll_interval_ms)
        .map_err(|e| {
            error!("Rain gauge task spawn failed: {:?}", e);
            StationError::Unknown
        })?;
    gauge_spawner.spawn(gauge_task);

    // Wi-Fi
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = RADIO.init(esp_radio::init().map_err(|e| {
        error!("Radio init failed: {:?}", e);
        StationError::Wifi(short_message(format_args!("radio init: {:?}", e)))
    })?);
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()).map_err(|e| {
            error!("Wi-Fi driver init failed: {:?}", e);
            StationError::Wifi(short_message(format_args!("driver init: {:?}", e)))
        })?;

    state.transition(RunState::WifiConnecting);
    let mut link = WifiLink::new(wifi_controller, &wifi_secrets::internet_config());
    join_with_retry(
        &mut link,
        &mut Delay,
        station_config.join_attempts,
        station_config.join_retry_interval_ms,
    )
    .await?;
    state.transition(RunState::WifiConnected);

    let stack = start_network(spawner, interfaces.sta).await?;

    // Sensors
    let i2c = create_i2c_bus(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9)?;
    let adc = create_adc_device(
        peripherals.SPI3,
        peripherals.GPIO10,
        peripherals.GPIO11,
        peripherals.GPIO12,
        peripherals.GPIO13,
    )?;
    let sensors = StationSensors::new(
        Mcp3008::new(adc),
        Bme280Pressure::new(i2c, Delay),
        station_config.analog(),
        station_config.analog_channels(),
    );

    static RX_BUFFER: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();
    static TX_BUFFER: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();
    let listener = TcpListener::new(
        stack,
        station_config.http_port,
        RX_BUFFER.init([0; TCP_BUFFER_SIZE]),
        TX_BUFFER.init([0; TCP_BUFFER_SIZE]),
    );

    let station = Station::new(
        sensors,
        RainfallAggregator::new(&RAIN_PULSES, station_config.mm_per_pulse),
        WeatherLog::new(storage, LOG_FILE),
        clock,
        station_config.refresh_secs(),
    );
    let mut serving = ServingLoop::new(listener, station, &station_config);

    state.transition(RunState::Serving);
    info!("Serving on port {}", station_config.http_port);
    serving.run(&mut Delay).await
}

/// Brings up the IP stack on the joined interface and waits for DHCP.
async fn start_network(
    spawner: Spawner,
    device: WifiDevice<'static>,
) -> Result<Stack<'static>, StationError> {
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        device,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );
    let runner_task = net_task(runner).map_err(|e| {
        error!("Network task spawn failed: {:?}", e);
        StationError::Network(short_message(format_args!("net task spawn: {:?}", e)))
    })?;
    spawner.spawn(runner_task);

    stack.wait_config_up().await;
    match stack.config_v4() {
        Some(config) => info!("IPv4 address: {}", config.address.address()),
        None => warn!("Network up without an IPv4 configuration"),
    }

    Ok(stack)
}

/// Reads the station configuration from the SD card, falling back to the
/// defaults when the file is missing or unreadable.
fn load_config(storage: &SdCardStorage<SdSpi, Delay, UptimeClock>) -> StationConfig {
    let mut buf = [0u8; 128];
    match storage.read_file(CONFIG_FILE, &mut buf) {
        Ok(len) => match StationConfig::from_bytes(&buf[..len]) {
            Ok(config) => {
                info!("Loaded {} from SD card", CONFIG_FILE);
                config
            }
            Err(e) => {
                warn!("Ignoring invalid {}: {:?}", CONFIG_FILE, e);
                StationConfig::default()
            }
        },
        Err(e) => {
            info!("No usable {} ({:?}), using defaults", CONFIG_FILE, e);
            StationConfig::default()
        }
    }
}
