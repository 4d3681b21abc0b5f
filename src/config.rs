//! Kiosk configuration, read once at startup.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use ecoscale::config::{Config, HttpSinkConfig, SiteConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert!(config.validate().is_ok());
//!
//! // Or customize
//! let config = Config::default()
//!     .with_site(SiteConfig::default().with_tag("FIB"))
//!     .with_http(HttpSinkConfig::default().with_api_key("secret"));
//! ```

use heapless::String as HString;

use crate::error::ConfigError;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (URLs, API keys)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Largest prefix of `s` that fits in `max` bytes without splitting a char.
fn fitting_prefix(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let _ = hs.push_str(fitting_prefix(s, MAX_SHORT_STRING));
    hs
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    let mut hs = LongString::new();
    let _ = hs.push_str(fitting_prefix(s, MAX_LONG_STRING));
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete kiosk configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Site identification
    pub site: SiteConfig,
    /// Load cell calibration and sampling
    pub scale: ScaleConfig,
    /// Loop timers
    pub timing: TimingConfig,
    /// WiFi credentials
    pub wifi: WifiConfig,
    /// MQTT telemetry sink
    pub mqtt: MqttConfig,
    /// HTTP form-post sink
    pub http: HttpSinkConfig,
    /// Firestore document sink
    pub firestore: FirestoreConfig,
    /// Connectivity policy and network timeouts
    pub network: NetworkConfig,
    /// Display language
    pub display: DisplayConfig,
}

impl Config {
    /// Set site configuration
    pub fn with_site(mut self, site: SiteConfig) -> Self {
        self.site = site;
        self
    }

    /// Set scale configuration
    pub fn with_scale(mut self, scale: ScaleConfig) -> Self {
        self.scale = scale;
        self
    }

    /// Set timing configuration
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set HTTP sink configuration
    pub fn with_http(mut self, http: HttpSinkConfig) -> Self {
        self.http = http;
        self
    }

    /// Set Firestore configuration
    pub fn with_firestore(mut self, firestore: FirestoreConfig) -> Self {
        self.firestore = firestore;
        self
    }

    /// Set network configuration
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set display configuration
    pub fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }

    /// Checks that every blocking call stays within half the watchdog
    /// period and that calibration and timer values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale.counts_per_kg.is_finite() && self.scale.counts_per_kg > 0.0) {
            return Err(ConfigError::InvalidCalibration);
        }

        let intervals = [
            ("read interval", self.scale.read_interval_ms),
            ("link check interval", self.timing.link_check_ms),
            ("health check interval", self.timing.health_check_ms),
            ("status duration", self.timing.status_duration_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }

        let limit_ms = self.network.watchdog_timeout_ms / 2;
        let timeouts = [
            ("tare timeout", self.scale.tare_timeout_ms),
            ("link connect timeout", self.network.link_connect_timeout_ms),
            ("time sync timeout", self.network.time_sync_timeout_ms),
            ("ping timeout", self.network.ping_timeout_ms),
            ("http timeout", self.http.timeout_ms),
            // A send without a token signs up and then creates the
            // document under one watchdog feed.
            (
                "firestore sign-up and create",
                self.firestore.timeout_ms.saturating_mul(2),
            ),
        ];
        for (setting, timeout_ms) in timeouts {
            if timeout_ms > limit_ms {
                return Err(ConfigError::TimeoutExceedsWatchdog {
                    setting,
                    timeout_ms,
                    limit_ms,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Site Config
// ============================================================================

/// Site identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiteConfig {
    /// Location tag stamped on every record (e.g. faculty code)
    pub tag: ShortString,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            tag: short_string("FSM"),
        }
    }
}

impl SiteConfig {
    /// Set the location tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = short_string(tag);
        self
    }
}

// ============================================================================
// Scale Config
// ============================================================================

/// Load cell configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleConfig {
    /// Raw ADC counts per kilogram
    pub counts_per_kg: f32,
    /// Readings below this many kilograms are forced to zero
    pub noise_floor_kg: f32,
    /// Minimum spacing between accepted samples in milliseconds
    pub read_interval_ms: u32,
    /// Startup tare timeout in milliseconds
    pub tare_timeout_ms: u32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            counts_per_kg: 12_333.372,
            noise_floor_kg: 0.05,
            read_interval_ms: 50,
            tare_timeout_ms: 2000,
        }
    }
}

impl ScaleConfig {
    /// Set the calibration factor
    pub fn with_counts_per_kg(mut self, counts: f32) -> Self {
        self.counts_per_kg = counts;
        self
    }

    /// Set the noise floor
    pub fn with_noise_floor_kg(mut self, kg: f32) -> Self {
        self.noise_floor_kg = kg.max(0.0);
        self
    }

    /// Set the read interval
    pub fn with_read_interval_ms(mut self, ms: u32) -> Self {
        self.read_interval_ms = ms;
        self
    }

    /// Set the tare timeout
    pub fn with_tare_timeout_ms(mut self, ms: u32) -> Self {
        self.tare_timeout_ms = ms;
        self
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Control loop timers
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Weight readout refresh interval in milliseconds
    pub lcd_refresh_ms: u32,
    /// Minimum change in kilograms before the readout is redrawn
    pub redraw_threshold_kg: f32,
    /// Link check interval in milliseconds
    pub link_check_ms: u32,
    /// Health probe interval in milliseconds
    pub health_check_ms: u32,
    /// Status bar refresh interval in milliseconds
    pub indicator_refresh_ms: u32,
    /// How long a commit outcome stays on screen in milliseconds
    pub status_duration_ms: u32,
    /// Minimum spacing between MQTT reconnect attempts in milliseconds
    pub mqtt_retry_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lcd_refresh_ms: 100,
            redraw_threshold_kg: 0.01,
            link_check_ms: 15_000,
            health_check_ms: 10_000,
            indicator_refresh_ms: 1000,
            status_duration_ms: 2000,
            mqtt_retry_ms: 5000,
        }
    }
}

impl TimingConfig {
    /// Set the readout refresh interval
    pub fn with_lcd_refresh_ms(mut self, ms: u32) -> Self {
        self.lcd_refresh_ms = ms;
        self
    }

    /// Set the redraw threshold
    pub fn with_redraw_threshold_kg(mut self, kg: f32) -> Self {
        self.redraw_threshold_kg = kg.max(0.0);
        self
    }

    /// Set the link check interval
    pub fn with_link_check_ms(mut self, ms: u32) -> Self {
        self.link_check_ms = ms;
        self
    }

    /// Set the health check interval
    pub fn with_health_check_ms(mut self, ms: u32) -> Self {
        self.health_check_ms = ms;
        self
    }

    /// Set the status bar refresh interval
    pub fn with_indicator_refresh_ms(mut self, ms: u32) -> Self {
        self.indicator_refresh_ms = ms;
        self
    }

    /// Set the status display duration
    pub fn with_status_duration_ms(mut self, ms: u32) -> Self {
        self.status_duration_ms = ms;
        self
    }

    /// Set the MQTT reconnect spacing
    pub fn with_mqtt_retry_ms(mut self, ms: u32) -> Self {
        self.mqtt_retry_ms = ms;
        self
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT telemetry sink configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID prefix; a per-device hex suffix is appended
    pub client_id_prefix: ShortString,
    /// Topic each commit is published to
    pub topic: LongString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Whether the MQTT sink is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("broker.hivemq.com"),
            port: 1883,
            client_id_prefix: short_string("ESP32Scale-"),
            topic: long_string("undip/scale/new"),
            keep_alive_secs: 30,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID prefix
    pub fn with_client_id_prefix(mut self, prefix: &str) -> Self {
        self.client_id_prefix = short_string(prefix);
        self
    }

    /// Set the publish topic
    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = long_string(topic);
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build the client ID for a device with the given numeric suffix
    pub fn client_id(&self, suffix: u16) -> ShortString {
        use core::fmt::Write;
        let mut id = self.client_id_prefix.clone();
        let _ = write!(id, "{:x}", suffix);
        id
    }
}

// ============================================================================
// HTTP Sink Config
// ============================================================================

/// HTTP form-post sink configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HttpSinkConfig {
    /// Endpoint receiving the form post
    pub url: LongString,
    /// API key sent as the `api_key` field
    pub api_key: LongString,
    /// Request timeout in milliseconds
    pub timeout_ms: u32,
    /// Whether the HTTP sink is enabled
    pub enabled: bool,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            url: long_string("https://ecoscale.undip.us/api/receive-sampah"),
            api_key: LongString::new(),
            timeout_ms: 15_000,
            enabled: true,
        }
    }
}

impl HttpSinkConfig {
    /// Set the endpoint URL
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = long_string(url);
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = long_string(key);
        self
    }

    /// Set the request timeout
    pub fn with_timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Enable or disable the HTTP sink
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Firestore Config
// ============================================================================

/// Firestore document sink configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirestoreConfig {
    /// Google Cloud project ID
    pub project_id: ShortString,
    /// Web API key used for anonymous sign-up
    pub api_key: LongString,
    /// Collection new documents are created in
    pub collection: ShortString,
    /// Request timeout in milliseconds
    pub timeout_ms: u32,
    /// Whether the Firestore sink is enabled
    pub enabled: bool,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: ShortString::new(),
            api_key: LongString::new(),
            collection: short_string("sampah"),
            timeout_ms: 15_000,
            enabled: false,
        }
    }
}

impl FirestoreConfig {
    /// Set the project ID
    pub fn with_project_id(mut self, id: &str) -> Self {
        self.project_id = short_string(id);
        self
    }

    /// Set the web API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = long_string(key);
        self
    }

    /// Set the collection
    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = short_string(collection);
        self
    }

    /// Set the request timeout
    pub fn with_timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Enable or disable the Firestore sink
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Network Config
// ============================================================================

/// What boot does when link, time or sink setup fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SetupFailurePolicy {
    /// Show the failure and stop; only the watchdog is serviced.
    Halt,
    /// Start the loop in offline mode and recover via health checks.
    #[default]
    Degrade,
}

/// Connectivity policy and network timeouts
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConfig {
    /// Blocking link connect timeout at boot in milliseconds
    pub link_connect_timeout_ms: u32,
    /// Time sync timeout in milliseconds
    pub time_sync_timeout_ms: u32,
    /// Host pinged by the health probe
    pub ping_host: ShortString,
    /// Health probe timeout in milliseconds
    pub ping_timeout_ms: u32,
    /// Boot behaviour on setup failure
    pub setup_failure_policy: SetupFailurePolicy,
    /// Whether a failed health probe alone enters offline mode
    pub health_failure_forces_offline: bool,
    /// Hardware watchdog period in milliseconds
    pub watchdog_timeout_ms: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            link_connect_timeout_ms: 10_000,
            time_sync_timeout_ms: 3000,
            ping_host: short_string("8.8.8.8"),
            ping_timeout_ms: 1000,
            setup_failure_policy: SetupFailurePolicy::Degrade,
            health_failure_forces_offline: false,
            watchdog_timeout_ms: 60_000,
        }
    }
}

impl NetworkConfig {
    /// Set the boot link connect timeout
    pub fn with_link_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.link_connect_timeout_ms = ms;
        self
    }

    /// Set the time sync timeout
    pub fn with_time_sync_timeout_ms(mut self, ms: u32) -> Self {
        self.time_sync_timeout_ms = ms;
        self
    }

    /// Set the ping target
    pub fn with_ping_host(mut self, host: &str) -> Self {
        self.ping_host = short_string(host);
        self
    }

    /// Set the ping timeout
    pub fn with_ping_timeout_ms(mut self, ms: u32) -> Self {
        self.ping_timeout_ms = ms;
        self
    }

    /// Set the setup failure policy
    pub fn with_setup_failure_policy(mut self, policy: SetupFailurePolicy) -> Self {
        self.setup_failure_policy = policy;
        self
    }

    /// Set whether a failed health probe forces offline mode
    pub fn with_health_failure_forces_offline(mut self, forces: bool) -> Self {
        self.health_failure_forces_offline = forces;
        self
    }

    /// Set the watchdog period
    pub fn with_watchdog_timeout_ms(mut self, ms: u32) -> Self {
        self.watchdog_timeout_ms = ms;
        self
    }
}

// ============================================================================
// Display Config
// ============================================================================

/// Language of operator-facing text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Locale {
    /// Bahasa Indonesia
    #[default]
    Indonesian,
    /// English
    English,
}

/// Display configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayConfig {
    /// Text language
    pub locale: Locale,
}

impl DisplayConfig {
    /// Set the locale
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.site.tag.as_str(), "FSM");
        assert_eq!(config.scale.read_interval_ms, 50);
        assert_eq!(config.timing.status_duration_ms, 2000);
        assert_eq!(config.mqtt.topic.as_str(), "undip/scale/new");
        assert!(!config.firestore.enabled);
        assert_eq!(config.network.setup_failure_policy, SetupFailurePolicy::Degrade);
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_site(SiteConfig::default().with_tag("FIB"))
            .with_mqtt(MqttConfig::default().with_host("broker.local").with_port(8883))
            .with_display(DisplayConfig::default().with_locale(Locale::English));

        assert_eq!(config.site.tag.as_str(), "FIB");
        assert_eq!(config.mqtt.host.as_str(), "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.display.locale, Locale::English);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn http_timeout_beyond_watchdog_margin_rejected() {
        let config = Config::default().with_http(HttpSinkConfig::default().with_timeout_ms(45_000));
        assert_eq!(
            config.validate(),
            Err(ConfigError::TimeoutExceedsWatchdog {
                setting: "http timeout",
                timeout_ms: 45_000,
                limit_ms: 30_000,
            })
        );
    }

    #[test]
    fn firestore_timeout_counts_sign_up_and_create() {
        let config = Config::default()
            .with_firestore(FirestoreConfig::default().with_timeout_ms(20_000));
        assert_eq!(
            config.validate(),
            Err(ConfigError::TimeoutExceedsWatchdog {
                setting: "firestore sign-up and create",
                timeout_ms: 40_000,
                limit_ms: 30_000,
            })
        );

        let config = Config::default()
            .with_firestore(FirestoreConfig::default().with_timeout_ms(15_000));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn short_watchdog_rejects_default_timeouts() {
        let config = Config::default()
            .with_network(NetworkConfig::default().with_watchdog_timeout_ms(10_000));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimeoutExceedsWatchdog { .. })
        ));
    }

    #[test]
    fn zero_calibration_rejected() {
        let config = Config::default().with_scale(ScaleConfig::default().with_counts_per_kg(0.0));
        assert_eq!(config.validate(), Err(ConfigError::InvalidCalibration));
    }

    #[test]
    fn zero_interval_rejected() {
        let config =
            Config::default().with_timing(TimingConfig::default().with_status_duration_ms(0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval("status duration"))
        );
    }

    // =========================================================================
    // Sub-configs
    // =========================================================================

    #[test]
    fn mqtt_client_id_appends_hex_suffix() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.client_id(0xbeef).as_str(), "ESP32Scale-beef");
    }

    #[test]
    fn wifi_config_is_configured() {
        assert!(!WifiConfig::default().is_configured());
        assert!(WifiConfig::default().with_ssid("Kampus").is_configured());
    }

    #[test]
    fn noise_floor_never_negative() {
        let scale = ScaleConfig::default().with_noise_floor_kg(-1.0);
        assert_eq!(scale.noise_floor_kg, 0.0);
    }

    // =========================================================================
    // String Helper Tests
    // =========================================================================

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 3-byte chars: 22 of them is 66 bytes, only 21 fit in 64.
        let input = "€".repeat(22);
        let s = short_string(&input);
        assert_eq!(s.len(), 63);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
