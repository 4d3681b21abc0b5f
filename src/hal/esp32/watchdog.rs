//! Task Watchdog Timer (TWDT).
//!
//! Subscribes the loop task to the ESP-IDF task watchdog. The device
//! panics and restarts if the task goes longer than the timeout without
//! a feed.

use esp_idf_hal::sys::{
    esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, esp_task_wdt_reset, ESP_OK,
};
use log::{info, warn};

use crate::traits::Watchdog;

/// Task watchdog subscription for the calling task.
pub struct Esp32Watchdog {
    subscribed: bool,
}

impl Esp32Watchdog {
    /// Reconfigures the TWDT and subscribes the current task.
    pub fn new(timeout_ms: u32) -> Self {
        // SAFETY: plain ESP-IDF calls on the current task; the config
        // struct lives for the duration of the call.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                warn!("watchdog: reconfigure returned {} (may already be configured)", ret);
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK;
            if subscribed {
                info!("watchdog: subscribed ({} ms, panic on trigger)", timeout_ms);
            } else {
                warn!("watchdog: failed to subscribe ({})", ret);
            }
            Self { subscribed }
        }
    }

    /// Whether the task is subscribed.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

impl Watchdog for Esp32Watchdog {
    fn feed(&mut self) {
        if self.subscribed {
            // SAFETY: resets the countdown of the subscribed current task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
