//! Passive buzzer driven by an LEDC channel.
//!
//! A tone sets the timer frequency and a 50% duty; [`Buzzer::update`]
//! silences it once the duration has elapsed, so no call blocks.
//!
//! # Wiring
//!
//! - Buzzer + → GPIO5
//! - Buzzer − → GND

use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use log::warn;

use crate::traits::Buzzer;

/// LEDC-driven buzzer.
pub struct Esp32Buzzer<'d, S>
where
    S: esp_idf_hal::ledc::SpeedMode,
{
    timer: LedcTimerDriver<'d, S>,
    channel: LedcDriver<'d>,
    /// Duration of a tone started since the last update.
    pending_ms: Option<u32>,
    /// When the current tone ends.
    until_ms: Option<u64>,
}

impl<'d, S> Esp32Buzzer<'d, S>
where
    S: esp_idf_hal::ledc::SpeedMode,
{
    /// Initial timer frequency before the first tone.
    const IDLE_FREQ_HZ: u32 = 2_000;

    /// 8-bit duty is plenty for a square wave.
    const RESOLUTION: Resolution = Resolution::Bits8;

    /// Creates the buzzer, silent.
    pub fn new<T, TI, C, CI, P, PI>(
        pin: P,
        timer: T,
        channel: C,
    ) -> Result<Self, esp_idf_hal::sys::EspError>
    where
        TI: esp_idf_hal::ledc::LedcTimer<SpeedMode = S> + 'd,
        T: Peripheral<P = TI> + 'd,
        CI: esp_idf_hal::ledc::LedcChannel<SpeedMode = S> + 'd,
        C: Peripheral<P = CI> + 'd,
        PI: esp_idf_hal::gpio::OutputPin + 'd,
        P: Peripheral<P = PI> + 'd,
    {
        let timer_config = TimerConfig::default()
            .frequency(Self::IDLE_FREQ_HZ.Hz())
            .resolution(Self::RESOLUTION);
        let timer = LedcTimerDriver::new(timer, &timer_config)?;
        let mut channel = LedcDriver::new(channel, &timer, pin)?;
        channel.set_duty(0)?;

        Ok(Self {
            timer,
            channel,
            pending_ms: None,
            until_ms: None,
        })
    }

    fn silence(&mut self) {
        if let Err(e) = self.channel.set_duty(0) {
            warn!("buzzer: set_duty failed: {:?}", e);
        }
        self.until_ms = None;
    }
}

impl<S> Buzzer for Esp32Buzzer<'_, S>
where
    S: esp_idf_hal::ledc::SpeedMode,
{
    fn tone(&mut self, frequency_hz: u32, duration_ms: u32) {
        if frequency_hz == 0 || duration_ms == 0 {
            self.silence();
            return;
        }
        if let Err(e) = self.timer.set_frequency(frequency_hz.Hz()) {
            warn!("buzzer: cannot set {} Hz: {:?}", frequency_hz, e);
            return;
        }
        let half = self.channel.get_max_duty() / 2;
        if let Err(e) = self.channel.set_duty(half) {
            warn!("buzzer: set_duty failed: {:?}", e);
            return;
        }
        self.pending_ms = Some(duration_ms);
    }

    fn update(&mut self, now_ms: u64) {
        if let Some(duration) = self.pending_ms.take() {
            self.until_ms = Some(now_ms + u64::from(duration));
        }
        if let Some(until) = self.until_ms {
            if now_ms >= until {
                self.silence();
            }
        }
    }
}
