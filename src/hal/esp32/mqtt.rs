//! MQTT client for ESP32.
//!
//! Wraps `EspMqttClient` and implements [`MqttClient`] for the telemetry
//! sink. The ESP-IDF client reconnects to the broker on its own; an event
//! thread only tracks whether the session is up.
//!
//! # Example
//!
//! ```ignore
//! use ecoscale::hal::esp32::Esp32Mqtt;
//! use ecoscale::config::MqttConfig;
//! use ecoscale::traits::MqttClient;
//!
//! let config = MqttConfig::default();
//! let mut mqtt = Esp32Mqtt::new(&config, 0xBEEF)?;
//! mqtt.publish("undip/scale/new", b"{}", false)?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use log::{info, warn};

use crate::config::MqttConfig;
use crate::traits::MqttClient;

/// MQTT client with a background event thread.
pub struct Esp32Mqtt {
    client: EspMqttClient<'static>,
    connected: Arc<AtomicBool>,
}

impl Esp32Mqtt {
    /// Creates the client and starts connecting to the broker.
    ///
    /// `id_suffix` is appended in hex to the configured client-id prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(config: &MqttConfig, id_suffix: u16) -> anyhow::Result<Self> {
        let broker_url = format!("mqtt://{}:{}", config.host.as_str(), config.port);
        let client_id = config.client_id(id_suffix);

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(client_id.as_str()),
            keep_alive_interval: Some(Duration::from_secs(u64::from(config.keep_alive_secs))),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(&broker_url, &mqtt_config)?;

        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();
        thread::Builder::new()
            .stack_size(6 * 1024)
            .spawn(move || handle_mqtt_events(&mut connection, flag))?;

        info!("mqtt: client {} connecting to {}", client_id, broker_url);

        Ok(Self { client, connected })
    }
}

/// Error type for ESP32 MQTT operations.
#[derive(Debug)]
pub struct Esp32MqttError(pub String);

impl core::fmt::Display for Esp32MqttError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "MQTT error: {}", self.0)
    }
}

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        self.client
            .publish(topic, qos, retain, payload)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        // The IDF client retries by itself; report where it stands.
        if self.is_connected() {
            Ok(())
        } else {
            Err(Esp32MqttError("broker session not up yet".into()))
        }
    }
}

fn handle_mqtt_events(connection: &mut EspMqttConnection, connected: Arc<AtomicBool>) {
    loop {
        match connection.next() {
            Err(e) => {
                warn!("mqtt: connection closed: {:?}", e);
                connected.store(false, Ordering::Relaxed);
                return;
            }
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    info!("mqtt: connected");
                    connected.store(true, Ordering::Relaxed);
                }
                EventPayload::Disconnected => {
                    warn!("mqtt: disconnected");
                    connected.store(false, Ordering::Relaxed);
                }
                _ => {}
            },
        }
    }
}
