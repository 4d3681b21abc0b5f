//! ESP32 time sources: the monotonic boot timer and an SNTP wall clock.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use log::{info, warn};

use crate::traits::{Clock, WallClock};

/// ESP32 clock using the hardware timer.
///
/// Provides millisecond-resolution timing using the ESP-IDF `esp_timer_get_time()`
/// function, which returns microseconds since boot.
///
/// # Example
///
/// ```ignore
/// use ecoscale::hal::esp32::Esp32Clock;
/// use ecoscale::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let start = clock.now_ms();
/// // ... do work ...
/// let elapsed = clock.now_ms() - start;
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Safe: a plain read of the hardware timer, no side effects
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}

/// Poll period while waiting for SNTP.
const SYNC_POLL_MS: u32 = 100;

/// UTC wall clock set by SNTP.
///
/// Each [`sync`](WallClock::sync) restarts the SNTP service and waits for
/// the first completed exchange. The system time stays valid after a
/// successful sync even if later syncs fail.
#[derive(Default)]
pub struct SntpClock {
    sntp: Option<EspSntp<'static>>,
    synced: bool,
    clock: Esp32Clock,
}

impl SntpClock {
    /// Creates an unsynchronised clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WallClock for SntpClock {
    fn sync(&mut self, timeout_ms: u32) -> bool {
        // Dropping the old service stops it before a fresh start.
        self.sntp = None;
        let sntp = match EspSntp::new_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("sntp: start failed: {:?}", e);
                return false;
            }
        };

        let deadline = self.clock.now_ms() + u64::from(timeout_ms);
        let mut completed = false;
        while self.clock.now_ms() < deadline {
            if sntp.get_sync_status() == SyncStatus::Completed {
                completed = true;
                break;
            }
            FreeRtos::delay_ms(SYNC_POLL_MS);
        }
        self.sntp = Some(sntp);

        if completed {
            self.synced = true;
            info!("sntp: synchronised, now {:?}", self.now_utc());
        } else {
            warn!("sntp: no answer within {} ms", timeout_ms);
        }
        completed
    }

    fn now_utc(&self) -> Option<DateTime<Utc>> {
        if self.synced {
            Some(DateTime::<Utc>::from(SystemTime::now()))
        } else {
            None
        }
    }
}
