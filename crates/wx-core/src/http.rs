//! The station's single HTML page and its HTTP framing
//!
//! Every request gets the same answer, so there is no routing: the request
//! is read only far enough to clear it off the socket.

use alloc::string::String;
use core::fmt::Write;

use crate::sensors::SensorReading;

/// Status line and headers sent ahead of every page.
pub const RESPONSE_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";

/// Upper bound on request bytes read before responding.
pub const REQUEST_BUFFER_SIZE: usize = 1024;

const STYLE: &str = "body { background: #1d2b3a; color: white; text-align: center; \
font-family: Arial, sans-serif; margin: 0; padding: 40px 0; } \
h1 { font-size: 48px; border: 2px solid white; padding: 20px; display: inline-block; \
background: rgba(0, 0, 0, 0.5); border-radius: 10px; } \
.container { display: grid; gap: 20px; max-width: 800px; margin: auto; } \
.row { display: flex; justify-content: space-around; gap: 20px; } \
.box { border: 2px solid white; padding: 20px; background: rgba(0, 0, 0, 0.5); \
border-radius: 10px; flex: 1; min-width: 200px; } \
.box h2 { font-size: 24px; margin-bottom: 10px; } .box p { font-size: 20px; margin: 0; }";

/// Renders the station page for one reading and rainfall total.
///
/// Temperature, humidity and rainfall are shown to two decimals; pressure is
/// shown as the sensor reported it.
pub fn render_page(reading: &SensorReading, rainfall_mm: f32, refresh_secs: u32) -> String {
    let mut html = String::with_capacity(2048);
    // Writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Weather Station</title>\n\
         <meta http-equiv=\"refresh\" content=\"{refresh_secs}\">\n\
         <style>{STYLE}</style>\n</head>\n<body>\n<h1>WEATHER STATION</h1>\n\
         <div class=\"container\">\n<div class=\"row\">\n\
         <div class=\"box\"><h2>Temperature</h2><p>{temperature:.2} &deg;C</p></div>\n\
         <div class=\"box\"><h2>Humidity</h2><p>{humidity:.2} %</p></div>\n\
         </div>\n<div class=\"row\">\n\
         <div class=\"box\"><h2>Pressure</h2><p>{pressure} </p></div>\n\
         <div class=\"box\"><h2>Rainfall</h2><p>{rainfall_mm:.2} mm</p></div>\n\
         </div>\n</div>\n</body>\n</html>\n",
        temperature = reading.temperature_celsius,
        humidity = reading.humidity_percent,
        pressure = reading.pressure,
    );
    html
}

/// Returns how many leading bytes of `buf` make up a complete header block,
/// if the blank line ending it has arrived.
pub fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|start| start + 4)
}
