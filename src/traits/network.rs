//! Network abstraction traits for link management, health probing, time,
//! HTTP delivery, and MQTT.
//!
//! These are the opaque services the kiosk consumes. The core never touches
//! sockets directly; it only sees these traits.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`NetworkLink`] | Radio association (WiFi station) |
//! | [`HealthProbe`] | End-to-end reachability (ping) |
//! | [`WallClock`] | UTC time after network time sync |
//! | [`HttpTransport`] | One-shot HTTP requests for record upload |
//! | [`MqttClient`] | Telemetry publishing |
//!
//! # Timeouts
//!
//! Every blocking call here must be bounded by its own transport timeout,
//! and that timeout must stay well below the watchdog period. See
//! [`Config::validate`](crate::config::Config::validate).

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};

// ============================================================================
// Link and Reachability
// ============================================================================

/// Link-layer connectivity (WiFi association).
///
/// # Implementation Notes
///
/// - `is_up` must be cheap; it is called every link-check tick
/// - `reconnect` is fire-and-forget: start the attempt and return, the link
///   layer owns retry policy
/// - `connect` is only used during boot and may block up to `timeout_ms`
pub trait NetworkLink {
    /// Blocking initial connection used during boot.
    ///
    /// Returns `true` once associated and addressed.
    fn connect(&mut self, timeout_ms: u32) -> bool;

    /// Returns true while associated with the access point.
    fn is_up(&self) -> bool;

    /// Kicks off a reconnect attempt without waiting for it.
    fn reconnect(&mut self);

    /// Signal strength in dBm, if associated.
    fn rssi(&self) -> Option<i8>;
}

/// End-to-end reachability check (e.g. ICMP ping to a public resolver).
///
/// Distinct from [`NetworkLink::is_up`]: a link can be associated while the
/// upstream internet is unreachable.
pub trait HealthProbe {
    /// Runs one probe. Blocks at most the probe's own timeout.
    fn check(&mut self) -> bool;
}

/// Network-synchronised UTC wall clock.
///
/// # Example
///
/// ```rust
/// use ecoscale::traits::WallClock;
/// use ecoscale::hal::MockWallClock;
///
/// let mut clock = MockWallClock::unsynced();
/// assert!(clock.now_utc().is_none());
///
/// clock.set_unix(1_700_000_000);
/// assert!(clock.sync(3000));
/// assert!(clock.now_utc().is_some());
/// ```
pub trait WallClock {
    /// Runs a time synchronisation, blocking at most `timeout_ms`.
    ///
    /// Returns `true` if the clock is synchronised afterwards.
    fn sync(&mut self, timeout_ms: u32) -> bool;

    /// Current UTC time, or `None` if the clock was never synchronised.
    fn now_utc(&self) -> Option<DateTime<Utc>>;
}

// ============================================================================
// HTTP Client Transport
// ============================================================================

/// HTTP request methods used by the upload sinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET request.
    Get,
    /// HTTP POST request (record creation, sign-up).
    Post,
}

/// An outgoing HTTP request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL, including any query string.
    pub url: String,
    /// Request headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a POST request with the given content type.
    pub fn post(url: impl Into<String>, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: alloc::vec![("Content-Type".into(), content_type.into())],
            body: body.into(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header value (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a UTF-8 string, if valid.
    pub fn body_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.body).ok()
    }
}

/// A received HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status: u16,
    /// Response body as bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body as a UTF-8 string, if valid.
    pub fn body_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.body).ok()
    }
}

/// Blocking HTTP client.
///
/// Implementations apply their own connect/read timeout and open a fresh
/// connection per request (the kiosk sends `Connection: close`).
pub trait HttpTransport {
    /// Error type for transport failures (no response received).
    type Error: core::fmt::Debug;

    /// Performs the request and returns the full response.
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, Self::Error>;
}

// ============================================================================
// MQTT Client Trait (Sync-First Design)
// ============================================================================

/// MQTT client trait for telemetry publishing.
///
/// This trait uses a **sync-first design** that works on both ESP32 (blocking I/O)
/// and desktop (a background thread drives the network).
///
/// # Implementation Notes
///
/// - `publish` is synchronous (enqueue or blocking send)
/// - `reconnect` starts a new session; implementations whose driver already
///   reconnects on its own can keep the default
///
/// # Example
///
/// ```rust,ignore
/// use ecoscale::traits::MqttClient;
///
/// fn publish_weight<M: MqttClient>(client: &mut M, kg: f32) {
///     let payload = format!("{:.2}", kg);
///     client.publish("scale/weight", payload.as_bytes(), false).unwrap();
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error: core::fmt::Debug;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;

    /// Attempt to re-establish the broker session.
    fn reconnect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_request_sets_content_type() {
        let req = HttpRequest::post("http://x/api", "application/json", b"{}".to_vec());
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body_str(), Some("{}"));
    }

    #[test]
    fn request_header_builder_appends() {
        let req = HttpRequest::post("http://x", "text/plain", Vec::new())
            .with_header("Connection", "close")
            .with_header("Authorization", "Bearer t");
        assert_eq!(req.headers.len(), 3);
        assert_eq!(req.header("CONNECTION"), Some("close"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn response_success_range() {
        assert!(HttpResponse::new(200, Vec::new()).is_success());
        assert!(HttpResponse::new(201, Vec::new()).is_success());
        assert!(!HttpResponse::new(302, Vec::new()).is_success());
        assert!(!HttpResponse::new(500, Vec::new()).is_success());
    }
}
