//! WiFi station link for ESP32.
//!
//! Wraps the non-blocking `EspWifi` driver so connection attempts can be
//! bounded by the caller's timeout and re-association can be kicked off
//! without waiting.
//!
//! # Example
//!
//! ```ignore
//! use ecoscale::hal::esp32::Esp32Wifi;
//! use ecoscale::config::WifiConfig;
//! use ecoscale::traits::NetworkLink;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("Kampus")
//!     .with_password("secret123");
//!
//! let mut wifi = Esp32Wifi::new(modem, sysloop, nvs, &config)?;
//! if wifi.connect(10_000) {
//!     println!("IP: {:?}", wifi.ip_addr());
//! }
//! ```

use std::net::Ipv4Addr;

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use crate::config::WifiConfig;
use crate::traits::{Clock, NetworkLink};

use super::Esp32Clock;

/// Poll period while waiting for association and DHCP.
const CONNECT_POLL_MS: u32 = 100;

/// WiFi station link.
///
/// The driver is configured and started on construction; association
/// happens in [`NetworkLink::connect`].
pub struct Esp32Wifi<'a> {
    wifi: EspWifi<'a>,
    clock: Esp32Clock,
}

impl<'a> Esp32Wifi<'a> {
    /// Initializes the driver in station mode with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be created, configured or
    /// started.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let mut wifi = EspWifi::new(modem, sysloop, nvs)?;

        let mut ssid: heapless::String<32> = heapless::String::new();
        let _ = ssid.push_str(config.ssid.as_str());
        let mut password: heapless::String<64> = heapless::String::new();
        let _ = password.push_str(config.password.as_str());

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            ..Default::default()
        }))?;
        wifi.start()?;
        info!("wifi: started, ssid '{}'", config.ssid);

        Ok(Self {
            wifi,
            clock: Esp32Clock::new(),
        })
    }

    /// Current IP address, if the interface is up.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }

    /// Factory MAC of the station interface.
    pub fn mac(&self) -> Option<[u8; 6]> {
        self.wifi.sta_netif().get_mac().ok()
    }
}

impl NetworkLink for Esp32Wifi<'_> {
    fn connect(&mut self, timeout_ms: u32) -> bool {
        if let Err(e) = self.wifi.connect() {
            warn!("wifi: connect request failed: {:?}", e);
            return false;
        }

        let deadline = self.clock.now_ms() + u64::from(timeout_ms);
        while self.clock.now_ms() < deadline {
            if self.is_up() {
                info!("wifi: connected, ip {:?}", self.ip_addr());
                return true;
            }
            FreeRtos::delay_ms(CONNECT_POLL_MS);
        }
        warn!("wifi: not connected after {} ms", timeout_ms);
        false
    }

    fn is_up(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn reconnect(&mut self) {
        let _ = self.wifi.disconnect();
        if let Err(e) = self.wifi.connect() {
            warn!("wifi: reconnect request failed: {:?}", e);
        }
    }

    fn rssi(&self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: fills a caller-owned record; fails cleanly when not associated.
        let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        if rc == esp_idf_svc::sys::ESP_OK {
            Some(ap_info.rssi)
        } else {
            None
        }
    }
}
