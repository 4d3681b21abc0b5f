//! ESP32 hardware abstraction layer for the waste-sorting kiosk.
//!
//! This module provides hardware implementations for an ESP32 DevKit
//! weighing deposits on an HX711 load cell and uploading them over WiFi.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32 (Xtensa dual core, 4MB Flash)
//! - **Scale**: load cell on an HX711 24-bit ADC
//! - **Buttons**: three category buttons plus commit, active low
//! - **Buzzer**: passive piezo on an LEDC channel
//! - **Display**: SSD1306 128x64 OLED (I2C)
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments.

mod buttons;
mod buzzer;
mod clock;
mod display;
mod http;
mod hx711;
mod ping;
mod watchdog;
mod wifi;

pub use buttons::Esp32Buttons;
pub use buzzer::Esp32Buzzer;
pub use clock::{Esp32Clock, SntpClock};
pub use display::{DisplayError, Esp32Display};
pub use http::{Esp32Http, Esp32HttpError};
pub use hx711::Esp32Hx711;
pub use ping::Esp32Ping;
pub use watchdog::Esp32Watchdog;
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-mqtt")]
mod mqtt;
#[cfg(feature = "esp32-mqtt")]
pub use mqtt::{Esp32Mqtt, Esp32MqttError};

use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::ledc::LowSpeed;

use crate::traits::{Board, BoardParts};

/// Pin assignments for the kiosk board.
pub mod pins {
    // =========================================================================
    // Load Cell (HX711)
    // =========================================================================

    /// HX711 data out
    pub const HX711_DOUT: i32 = 2;

    /// HX711 serial clock
    pub const HX711_SCK: i32 = 4;

    // =========================================================================
    // Buttons (active low, internal pull-up)
    // =========================================================================

    /// Category button 1
    pub const BUTTON_ONE: i32 = 27;

    /// Category button 2
    pub const BUTTON_TWO: i32 = 26;

    /// Category button 3
    pub const BUTTON_THREE: i32 = 25;

    /// Commit button
    pub const BUTTON_COMMIT: i32 = 33;

    // =========================================================================
    // Buzzer
    // =========================================================================

    /// Buzzer output (LEDC)
    pub const BUZZER: i32 = 5;

    // =========================================================================
    // I2C Display (SSD1306)
    // =========================================================================

    /// I2C data line
    pub const I2C_SDA: i32 = 21;

    /// I2C clock line
    pub const I2C_SCL: i32 = 22;

    /// Default I2C address for SSD1306 OLED
    pub const OLED_I2C_ADDR: u8 = 0x3C;
}

/// The physical kiosk: every ESP32 driver in one [`Board`].
pub struct Esp32Board<'d> {
    /// HX711 load cell.
    pub scale: Esp32Hx711<'d, AnyIOPin, AnyIOPin>,
    /// Debounced buttons.
    pub buttons: Esp32Buttons<'d>,
    /// OLED panel.
    pub display: Esp32Display<'d>,
    /// Piezo buzzer.
    pub buzzer: Esp32Buzzer<'d, LowSpeed>,
    /// WiFi station.
    pub link: Esp32Wifi<'d>,
    /// ICMP probe.
    pub probe: Esp32Ping,
    /// SNTP wall clock.
    pub wall_clock: SntpClock,
    /// Task watchdog.
    pub watchdog: Esp32Watchdog,
}

impl<'d> Board for Esp32Board<'d> {
    type Scale = Esp32Hx711<'d, AnyIOPin, AnyIOPin>;
    type Buttons = Esp32Buttons<'d>;
    type Display = Esp32Display<'d>;
    type Buzzer = Esp32Buzzer<'d, LowSpeed>;
    type Link = Esp32Wifi<'d>;
    type Probe = Esp32Ping;
    type WallClock = SntpClock;
    type Watchdog = Esp32Watchdog;

    fn parts(&mut self) -> BoardParts<'_, Self> {
        BoardParts {
            scale: &mut self.scale,
            buttons: &mut self.buttons,
            display: &mut self.display,
            buzzer: &mut self.buzzer,
            link: &mut self.link,
            probe: &mut self.probe,
            wall_clock: &mut self.wall_clock,
            watchdog: &mut self.watchdog,
        }
    }
}
