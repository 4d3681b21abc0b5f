//! Host-side network services.
//!
//! - `mqtt` feature: a `rumqttc` implementation of
//!   [`MqttClient`](crate::traits::MqttClient) for driving the MQTT sink
//!   against a real broker from a desktop machine.

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
