//! SSD1306 OLED display implementation for ESP32.
//!
//! Renders the four text rows of the kiosk screen on a 128x64 panel. The
//! big weight readout replaces rows 1-2 and carries the "kg" unit; the
//! corner icon sits at the left of row 3.
//!
//! # Wiring
//!
//! - SDA → GPIO21
//! - SCL → GPIO22
//! - VCC → 3.3V
//! - GND → GND

use core::fmt::Write;

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
};
use esp_idf_hal::i2c::I2cDriver;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use crate::traits::{Icon, KioskDisplay, DISPLAY_ROWS};

/// SSD1306 display type alias for cleaner code.
type DisplayDriver<'d> = Ssd1306<
    I2CInterface<I2cDriver<'d>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

type Row = heapless::String<32>;

/// Pixel height of one text row.
const ROW_HEIGHT: i32 = 16;

/// SSD1306 OLED display for ESP32.
///
/// # Display Layout
///
/// ```text
/// ┌────────────────────────────┐
/// │Jenis: Botol                │  row 0
/// │                            │
/// │   12.34 kg                 │  big readout (rows 1-2)
/// │                            │
/// │x                       -67 │  row 3: icon + RSSI
/// └────────────────────────────┘
/// ```
pub struct Esp32Display<'d> {
    display: DisplayDriver<'d>,
    rows: [Row; DISPLAY_ROWS as usize],
    big_number: Option<f32>,
    icon: Icon,
}

impl<'d> Esp32Display<'d> {
    /// Creates a new display instance.
    ///
    /// # Arguments
    ///
    /// * `i2c` - I2C driver configured for the panel's pins
    pub fn new(i2c: I2cDriver<'d>) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        Self {
            display,
            rows: Default::default(),
            big_number: None,
            icon: Icon::Blank,
        }
    }

    /// Redraws the whole frame from the retained state.
    fn redraw(&mut self) -> Result<(), DisplayError> {
        self.display.clear(BinaryColor::Off)?;
        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        for (i, row) in self.rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let y = i as i32 * ROW_HEIGHT;
            Text::with_baseline(row, Point::new(0, y), small, Baseline::Top)
                .draw(&mut self.display)?;
        }

        if let Some(kg) = self.big_number {
            let large = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
            let mut text: Row = heapless::String::new();
            let _ = write!(text, "{:>6.2}", kg);
            let end = Text::with_baseline(&text, Point::new(4, 20), large, Baseline::Top)
                .draw(&mut self.display)?;
            Text::with_baseline("kg", end + Point::new(4, 8), small, Baseline::Top)
                .draw(&mut self.display)?;
        }

        let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
        let top = 3 * ROW_HEIGHT + 2;
        match self.icon {
            Icon::Blank => {}
            Icon::Dash => {
                Line::new(Point::new(0, top + 4), Point::new(7, top + 4))
                    .into_styled(stroke)
                    .draw(&mut self.display)?;
            }
            Icon::NoInternet => {
                Line::new(Point::new(0, top), Point::new(7, top + 7))
                    .into_styled(stroke)
                    .draw(&mut self.display)?;
                Line::new(Point::new(7, top), Point::new(0, top + 7))
                    .into_styled(stroke)
                    .draw(&mut self.display)?;
            }
        }

        self.display.flush()?;
        Ok(())
    }
}

impl KioskDisplay for Esp32Display<'_> {
    type Error = DisplayError;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.display.init()?;
        self.clear()
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        for row in self.rows.iter_mut() {
            row.clear();
        }
        self.big_number = None;
        self.icon = Icon::Blank;
        self.redraw()
    }

    fn show_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error> {
        let slot = self.rows.get_mut(usize::from(row)).ok_or(DisplayError)?;
        slot.clear();
        for c in text.chars() {
            if slot.push(c).is_err() {
                break;
            }
        }
        // Text rows 1-2 take over the area of the big readout.
        if row == 1 || row == 2 {
            self.big_number = None;
        }
        self.redraw()
    }

    fn show_big_number(&mut self, value: f32) -> Result<(), Self::Error> {
        self.big_number = Some(value);
        self.redraw()
    }

    fn show_icon(&mut self, icon: Icon) -> Result<(), Self::Error> {
        self.icon = icon;
        self.redraw()
    }
}

/// Display error type.
#[derive(Debug)]
pub struct DisplayError;

impl From<display_interface::DisplayError> for DisplayError {
    fn from(_: display_interface::DisplayError) -> Self {
        DisplayError
    }
}
