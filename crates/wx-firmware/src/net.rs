//! Wi-Fi association and TCP serving over esp-radio and embassy-net

use alloc::string::String;

use embassy_net::Stack;
use embassy_net::tcp::{self, AcceptError, TcpSocket};
use embassy_time::Duration;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiError};
use log::{debug, info, warn};
use wx_core::config::InternetConfig;
use wx_core::network::NetworkLink;
use wx_core::server::{Connection, Listener};

/// Idle time after which a stalled client is dropped.
const SOCKET_TIMEOUT_SECS: u64 = 10;

/// Station-mode Wi-Fi link driven by the core's join policy.
pub struct WifiLink<'a> {
    controller: WifiController<'a>,
    ssid: String,
    password: String,
}

impl<'a> WifiLink<'a> {
    pub fn new(controller: WifiController<'a>, credentials: &InternetConfig<'_>) -> Self {
        Self {
            controller,
            ssid: String::from(credentials.ssid),
            password: String::from(credentials.password),
        }
    }
}

impl NetworkLink for WifiLink<'_> {
    type Error = WifiError;

    async fn begin_join(&mut self) -> Result<(), WifiError> {
        let client_config = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(self.ssid.clone())
                .with_password(self.password.clone()),
        );

        if !matches!(self.controller.is_started(), Ok(true)) {
            self.controller.set_config(&client_config)?;
            info!("Starting Wi-Fi STA");
            self.controller.start_async().await?;
        }

        info!("Connecting to Wi-Fi SSID=\"{}\"", self.ssid);
        self.controller.connect()
    }

    fn is_joined(&mut self) -> bool {
        self.controller.is_connected().unwrap_or(false)
    }
}

/// Accepts one client at a time on a fixed port.
///
/// A fresh socket is opened per connection over the same pair of buffers, so
/// only one connection can be alive at once.
pub struct TcpListener<'a> {
    stack: Stack<'a>,
    port: u16,
    rx_buffer: &'a mut [u8],
    tx_buffer: &'a mut [u8],
}

impl<'a> TcpListener<'a> {
    pub fn new(
        stack: Stack<'a>,
        port: u16,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
    ) -> Self {
        Self {
            stack,
            port,
            rx_buffer,
            tx_buffer,
        }
    }
}

impl Listener for TcpListener<'_> {
    type Error = AcceptError;
    type Connection<'c>
        = TcpConnection<'c>
    where
        Self: 'c;

    async fn accept(&mut self) -> Result<TcpConnection<'_>, AcceptError> {
        let mut socket = TcpSocket::new(self.stack, self.rx_buffer, self.tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));

        socket.accept(self.port).await?;
        debug!("Client connected from {:?}", socket.remote_endpoint());

        Ok(TcpConnection { socket })
    }
}

pub struct TcpConnection<'a> {
    socket: TcpSocket<'a>,
}

impl Connection for TcpConnection<'_> {
    type Error = tcp::Error;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, tcp::Error> {
        self.socket.read(buf).await
    }

    async fn write_all(&mut self, mut buf: &[u8]) -> Result<(), tcp::Error> {
        while !buf.is_empty() {
            let written = self.socket.write(buf).await?;
            if written == 0 {
                return Err(tcp::Error::ConnectionReset);
            }
            buf = &buf[written..];
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.socket.close();
        if let Err(e) = self.socket.flush().await {
            warn!("Failed to flush closing socket: {:?}", e);
        }
        self.socket.abort();
    }
}
