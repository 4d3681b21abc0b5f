//! HX711 load-cell amplifier on two GPIOs.
//!
//! The HX711 signals a finished conversion by pulling DOUT low. Reading
//! clocks 24 data bits out on SCK, then one extra pulse selects channel A
//! with gain 128 for the next conversion.
//!
//! # Wiring
//!
//! - DOUT → GPIO2
//! - SCK → GPIO4
//! - VCC → 3.3V
//! - GND → GND

use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{Input, InputPin, Output, OutputPin, PinDriver};
use esp_idf_hal::peripheral::Peripheral;
use log::debug;

use crate::traits::{Clock, LoadCell};

use super::Esp32Clock;

/// Samples averaged for the startup tare.
const TARE_SAMPLES: u32 = 10;

/// Extra SCK pulses after the data bits: 1 = channel A, gain 128.
const GAIN_PULSES: u8 = 1;

/// HX711 driver.
///
/// [`poll_raw`](LoadCell::poll_raw) never waits: it returns `None` while
/// no conversion is ready. Readings are offset-corrected by the tare.
pub struct Esp32Hx711<'d, DT, SCK>
where
    DT: InputPin,
    SCK: OutputPin,
{
    dout: PinDriver<'d, DT, Input>,
    sck: PinDriver<'d, SCK, Output>,
    offset: i32,
    clock: Esp32Clock,
}

impl<'d, DT, SCK> Esp32Hx711<'d, DT, SCK>
where
    DT: InputPin,
    SCK: OutputPin,
{
    /// Configures the pins and idles the clock low.
    pub fn new(
        dout_pin: impl Peripheral<P = DT> + 'd,
        sck_pin: impl Peripheral<P = SCK> + 'd,
    ) -> Result<Self, esp_idf_hal::sys::EspError> {
        let dout = PinDriver::input(dout_pin)?;
        let mut sck = PinDriver::output(sck_pin)?;
        sck.set_low()?;

        Ok(Self {
            dout,
            sck,
            offset: 0,
            clock: Esp32Clock::new(),
        })
    }

    /// True when a conversion is waiting.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.dout.is_low()
    }

    /// Current tare offset in counts.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    fn pulse(&mut self) -> bool {
        // Pin writes on an already configured output cannot fail.
        let _ = self.sck.set_high();
        Ets::delay_us(1);
        let bit = self.dout.is_high();
        let _ = self.sck.set_low();
        Ets::delay_us(1);
        bit
    }

    /// Clocks out one conversion. Caller checks readiness first.
    fn read_counts(&mut self) -> i32 {
        // SCK high for more than 60 µs powers the chip down, so the
        // transfer must not be interrupted.
        let raw = esp_idf_hal::interrupt::free(|| {
            let mut value: u32 = 0;
            for _ in 0..24 {
                value = (value << 1) | u32::from(self.pulse());
            }
            for _ in 0..GAIN_PULSES {
                self.pulse();
            }
            value
        });
        // Sign-extend 24-bit two's complement.
        ((raw << 8) as i32) >> 8
    }
}

impl<DT, SCK> LoadCell for Esp32Hx711<'_, DT, SCK>
where
    DT: InputPin,
    SCK: OutputPin,
{
    fn poll_raw(&mut self) -> Option<f32> {
        if !self.is_ready() {
            return None;
        }
        let counts = self.read_counts().wrapping_sub(self.offset);
        Some(counts as f32)
    }

    fn tare(&mut self, timeout_ms: u32) -> bool {
        let deadline = self.clock.now_ms() + u64::from(timeout_ms);
        let mut sum: i64 = 0;
        let mut taken = 0;

        while taken < TARE_SAMPLES {
            if self.clock.now_ms() >= deadline {
                debug!("hx711: tare timed out after {} samples", taken);
                return false;
            }
            if self.is_ready() {
                sum += i64::from(self.read_counts());
                taken += 1;
            } else {
                FreeRtos::delay_ms(1);
            }
        }

        self.offset = (sum / i64::from(TARE_SAMPLES)) as i32;
        debug!("hx711: tare offset {}", self.offset);
        true
    }
}
