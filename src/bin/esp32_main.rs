//! ESP32 waste-sorting kiosk firmware.
//!
//! This is the main entry point for the physical kiosk. It wires the
//! board drivers and upload sinks into a [`Kiosk`] and runs the
//! cooperative control loop that:
//! - Polls the HX711 load cell and the four buttons
//! - Watches WiFi and internet reachability
//! - Uploads committed deposits to the configured sinks
//! - Renders the home screen and status messages to the OLED
//!
//! # Build
//!
//! ```bash
//! # HTTP / Firestore sinks
//! WIFI_SSID=... WIFI_PASSWORD=... cargo build --release --features esp32
//!
//! # With MQTT telemetry
//! cargo build --release --features esp32-mqtt
//!
//! # Flash and monitor
//! espflash flash --monitor target/xtensa-esp32-espidf/release/esp32_main
//! ```

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::IOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use ecoscale::hal::esp32::{
    Esp32Board, Esp32Buttons, Esp32Buzzer, Esp32Clock, Esp32Display, Esp32Http, Esp32Hx711,
    Esp32Ping, Esp32Watchdog, Esp32Wifi, SntpClock,
};
use ecoscale::traits::Clock;
use ecoscale::{
    BootReport, Config, FirestoreConfig, FirestoreSink, FormPostSink, HttpSinkConfig, Kiosk,
    SiteConfig, UploadDispatcher, WifiConfig,
};

/// Pause between control loop iterations.
const LOOP_INTERVAL_MS: u32 = 10;

/// Pause between watchdog feeds once boot has failed.
const HALT_INTERVAL_MS: u32 = 500;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();

    info!("================================");
    info!("  ecoscale kiosk");
    info!("================================");

    // =========================================================================
    // Configuration
    // =========================================================================
    let mut http = HttpSinkConfig::default()
        .with_api_key(option_env!("UPLOAD_API_KEY").unwrap_or(""));
    if let Some(url) = option_env!("UPLOAD_URL") {
        http = http.with_url(url);
    }

    let config = Config::default()
        .with_site(SiteConfig::default().with_tag(option_env!("SITE_TAG").unwrap_or("FSM")))
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_http(http)
        .with_firestore(
            FirestoreConfig::default()
                .with_project_id(option_env!("FIRESTORE_PROJECT").unwrap_or(""))
                .with_api_key(option_env!("FIRESTORE_API_KEY").unwrap_or(""))
                .with_enabled(option_env!("FIRESTORE_PROJECT").is_some()),
        );
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // =========================================================================
    // Board
    // =========================================================================
    let scale = Esp32Hx711::new(
        peripherals.pins.gpio2.downgrade(), // DOUT
        peripherals.pins.gpio4.downgrade(), // SCK
    )?;

    let buttons = Esp32Buttons::new([
        peripherals.pins.gpio27.downgrade(),
        peripherals.pins.gpio26.downgrade(),
        peripherals.pins.gpio25.downgrade(),
        peripherals.pins.gpio33.downgrade(),
    ])?;

    let buzzer = Esp32Buzzer::new(
        peripherals.pins.gpio5,
        peripherals.ledc.timer0,
        peripherals.ledc.channel0,
    )?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21, // SDA
        peripherals.pins.gpio22, // SCL
        &I2cConfig::new().baudrate(400.kHz().into()),
    )?;
    let display = Esp32Display::new(i2c);

    let link = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?;
    let mac_suffix = link
        .mac()
        .map(|mac| u16::from_be_bytes([mac[4], mac[5]]))
        .unwrap_or(0);

    let board = Esp32Board {
        scale,
        buttons,
        display,
        buzzer,
        link,
        probe: Esp32Ping::new(&config.network),
        wall_clock: SntpClock::new(),
        watchdog: Esp32Watchdog::new(config.network.watchdog_timeout_ms),
    };
    info!("[OK] board initialized");

    // =========================================================================
    // Upload sinks (first enabled one decides the outcome)
    // =========================================================================
    let mut dispatcher = UploadDispatcher::new(config.site.tag.as_str());

    if config.http.enabled {
        dispatcher.add_sink(Box::new(FormPostSink::new(
            Esp32Http::new(config.http.timeout_ms),
            &config.http,
        )));
    }

    if config.firestore.enabled {
        dispatcher.add_sink(Box::new(FirestoreSink::new(
            Esp32Http::new(config.firestore.timeout_ms),
            &config.firestore,
        )));
    }

    #[cfg(feature = "esp32-mqtt")]
    if config.mqtt.enabled {
        use ecoscale::hal::esp32::Esp32Mqtt;
        use ecoscale::MqttSink;

        match Esp32Mqtt::new(&config.mqtt, mac_suffix) {
            Ok(client) => dispatcher.add_sink(Box::new(MqttSink::new(
                client,
                &config.mqtt,
                config.timing.mqtt_retry_ms,
            ))),
            Err(e) => warn!("[WARN] MQTT client failed: {:?}", e),
        }
    }
    #[cfg(not(feature = "esp32-mqtt"))]
    let _ = mac_suffix;

    if dispatcher.sink_count() == 0 {
        warn!("[WARN] no upload sinks configured; commits will be rejected");
    }

    // =========================================================================
    // Boot
    // =========================================================================
    let clock = Esp32Clock::new();
    let mut kiosk = Kiosk::new(board, config, dispatcher);

    match kiosk.boot(clock.now_ms()) {
        Ok(BootReport::Online) => info!("[OK] online"),
        Ok(BootReport::Degraded(reason)) => warn!("[WARN] running offline: {}", reason),
        Err(e) => {
            error!("!! boot failed: {} !!", e);
            loop {
                kiosk.tick_halted(clock.now_ms());
                FreeRtos::delay_ms(HALT_INTERVAL_MS);
            }
        }
    }

    // =========================================================================
    // Main Control Loop
    // =========================================================================
    loop {
        kiosk.tick(clock.now_ms());
        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}
