//! Desktop MQTT client built on `rumqttc`.
//!
//! Implements [`MqttClient`] so the [`MqttSink`](crate::sinks::MqttSink)
//! can run against a real broker from a host machine, for bench testing
//! the upload path without the kiosk hardware.
//!
//! `rumqttc` drives the socket from its `Connection` iterator, so a
//! background thread owns the connection and tracks whether the session
//! is up. The kiosk only publishes, so inbound packets are not kept.
//!
//! # Example
//!
//! ```ignore
//! use ecoscale::config::MqttConfig;
//! use ecoscale::services::RumqttClient;
//! use ecoscale::sinks::MqttSink;
//!
//! let config = MqttConfig::default().with_host("localhost");
//! let client = RumqttClient::connect(&config, 0x1234)?;
//! let sink = MqttSink::new(client, &config, 5_000);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{Client, ConnectReturnCode, Event, MqttOptions, Packet, QoS};

use crate::config::MqttConfig;
use crate::traits::MqttClient;

/// Pause after a connection error before `rumqttc` retries.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Outbound request queue depth.
const REQUEST_CAPACITY: usize = 10;

// ============================================================================
// Client
// ============================================================================

/// Blocking `rumqttc` client with a connection thread.
pub struct RumqttClient {
    client: Client,
    connected: Arc<AtomicBool>,
}

impl RumqttClient {
    /// Starts a client for `config`'s broker.
    ///
    /// The session comes up asynchronously; [`MqttClient::is_connected`]
    /// reports false until the broker acknowledges.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection thread cannot be spawned.
    pub fn connect(config: &MqttConfig, id_suffix: u16) -> Result<Self, MqttError> {
        let client_id = config.client_id(id_suffix);
        let mut options = MqttOptions::new(client_id.as_str(), config.host.as_str(), config.port);
        options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));

        let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);

        thread::Builder::new()
            .name("mqtt-connection".into())
            .spawn(move || {
                for notification in connection.iter() {
                    match notification {
                        Ok(event) => handle_event(&event, &flag),
                        Err(e) => {
                            if flag.swap(false, Ordering::Relaxed) {
                                warn!("mqtt: connection lost: {}", e);
                            } else {
                                debug!("mqtt: connect failed: {}", e);
                            }
                            thread::sleep(RETRY_PAUSE);
                        }
                    }
                }
            })
            .map_err(|e| MqttError::Connect(e.to_string()))?;

        info!(
            "mqtt: client {} connecting to {}:{}",
            client_id, config.host, config.port
        );

        Ok(Self { client, connected })
    }
}

/// Applies one connection event to the session flag.
fn handle_event(event: &Event, connected: &AtomicBool) {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => {
            let ok = ack.code == ConnectReturnCode::Success;
            connected.store(ok, Ordering::Relaxed);
            if ok {
                info!("mqtt: connected");
            } else {
                warn!("mqtt: broker refused session: {:?}", ack.code);
            }
        }
        Event::Incoming(Packet::Disconnect) => {
            warn!("mqtt: broker closed session");
            connected.store(false, Ordering::Relaxed);
        }
        _ => {}
    }
}

impl MqttClient for RumqttClient {
    type Error = MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(MqttError::Publish("not connected".into()));
        }
        self.client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.to_vec())
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        // The connection thread keeps retrying on its own.
        if self.is_connected() {
            Ok(())
        } else {
            Err(MqttError::Connect("session not up".into()))
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// MQTT-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttError {
    /// Failed to connect to broker
    Connect(String),
    /// Failed to publish message
    Publish(String),
}

impl core::fmt::Display for MqttError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MqttError::Connect(e) => write!(f, "MQTT connect failed: {}", e),
            MqttError::Publish(e) => write!(f, "MQTT publish failed: {}", e),
        }
    }
}

impl std::error::Error for MqttError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::ConnAck;

    #[test]
    fn connack_success_marks_connected() {
        let flag = AtomicBool::new(false);
        let event = Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::Success,
            false,
        )));
        handle_event(&event, &flag);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn refused_connack_stays_disconnected() {
        let flag = AtomicBool::new(false);
        let event = Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::NotAuthorized,
            false,
        )));
        handle_event(&event, &flag);
        assert!(!flag.load(Ordering::Relaxed));
    }

    #[test]
    fn disconnect_clears_flag() {
        let flag = AtomicBool::new(true);
        handle_event(&Event::Incoming(Packet::Disconnect), &flag);
        assert!(!flag.load(Ordering::Relaxed));
    }

    #[test]
    fn keep_alive_traffic_leaves_session_up() {
        let flag = AtomicBool::new(true);
        handle_event(&Event::Incoming(Packet::PingResp), &flag);
        assert!(flag.load(Ordering::Relaxed));
    }
}
