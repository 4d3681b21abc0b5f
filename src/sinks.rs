//! Concrete upload sinks.
//!
//! Each sink wraps one transport trait object from [`crate::traits`], so
//! the same sink code runs over the ESP-IDF clients on the kiosk and over
//! the mocks in tests.
//!
//! | Sink | Backend | Wire format |
//! |------|---------|-------------|
//! | [`FormPostSink`] | Web endpoint | `application/x-www-form-urlencoded` |
//! | [`FirestoreSink`] | Document store (anonymous sign-up + bearer token) | JSON typed fields |
//! | [`MqttSink`] | MQTT broker | JSON telemetry |

use alloc::format;
use alloc::string::String;

use log::{debug, info, warn};

use crate::config::{FirestoreConfig, HttpSinkConfig, LongString, MqttConfig, ShortString};
use crate::dispatch::{DepositRecord, Sink};
use crate::error::SinkError;
use crate::messages::{
    parse_sign_up, to_json, FirestoreDocument, FormBody, SignUpRequest, TelemetryPayload,
};
use crate::traits::{HttpRequest, HttpResponse, HttpTransport, MqttClient};

/// Marker the web endpoint puts in its reply on success.
pub const SUCCESS_MARKER: &str = "berhasil";

/// Anonymous sign-up endpoint of the identity toolkit.
pub const SIGN_UP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signUp";

/// Base URL of the document store REST API.
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1/projects";

/// How long before the id token expires it is renewed.
pub const TOKEN_REFRESH_MARGIN_MS: u64 = 60_000;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

fn transport_error<E: core::fmt::Debug>(e: E) -> SinkError {
    SinkError::Transport(format!("{:?}", e))
}

// ============================================================================
// Form POST
// ============================================================================

/// Posts each record as a form to the web endpoint.
///
/// The reply counts as accepted when the status is 2xx or the body
/// contains [`SUCCESS_MARKER`].
///
/// # Example
///
/// ```rust
/// use ecoscale::config::{short_string, HttpSinkConfig};
/// use ecoscale::dispatch::{DepositRecord, Sink};
/// use ecoscale::hal::MockHttp;
/// use ecoscale::sinks::FormPostSink;
///
/// let config = HttpSinkConfig::default().with_api_key("k");
/// let mut sink = FormPostSink::new(MockHttp::new(), &config);
///
/// let record = DepositRecord {
///     centi_kg: 150,
///     label: "Botol",
///     site: short_string("FSM"),
///     timestamp: "2024-01-01T00:00:00Z".into(),
/// };
/// assert!(sink.send(&record).is_ok());
/// assert!(sink.transport().requests[0].body_str().unwrap().contains("berat=1.50"));
/// ```
#[derive(Debug)]
pub struct FormPostSink<T: HttpTransport> {
    transport: T,
    url: LongString,
    api_key: LongString,
}

impl<T: HttpTransport> FormPostSink<T> {
    /// Creates the sink. Timeouts belong to the transport.
    pub fn new(transport: T, config: &HttpSinkConfig) -> Self {
        Self {
            transport,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request(&self, record: &DepositRecord) -> HttpRequest {
        let body = FormBody::new()
            .field("api_key", &self.api_key)
            .field("berat", &record.weight_text())
            .field("fakultas", &record.site)
            .field("jenis", record.label)
            .field("timestamp", &record.timestamp)
            .finish();
        HttpRequest::post(self.url.as_str(), FORM_CONTENT_TYPE, body)
            .with_header("Connection", "close")
    }
}

fn form_reply_accepted(resp: &HttpResponse) -> bool {
    resp.is_success()
        || resp
            .body_str()
            .map(|b| b.contains(SUCCESS_MARKER))
            .unwrap_or(false)
}

impl<T: HttpTransport> Sink for FormPostSink<T> {
    fn name(&self) -> &str {
        "http"
    }

    fn send(&mut self, record: &DepositRecord) -> Result<(), SinkError> {
        let request = self.request(record);
        let resp = self.transport.execute(&request).map_err(transport_error)?;
        debug!("http: status {} body {:?}", resp.status, resp.body_str());
        if form_reply_accepted(&resp) {
            Ok(())
        } else {
            Err(SinkError::Status(resp.status))
        }
    }
}

// ============================================================================
// Document Store
// ============================================================================

/// Creates one document per record in the document store.
///
/// `connect` performs an anonymous sign-up and keeps the returned id
/// token. While online, [`maintain`](Sink::maintain) signs up again
/// [`TOKEN_REFRESH_MARGIN_MS`] before the token expires. A send without a
/// token signs up first. A `401` drops the token so the next send signs up
/// again.
#[derive(Debug)]
pub struct FirestoreSink<T: HttpTransport> {
    transport: T,
    project_id: ShortString,
    api_key: LongString,
    collection: ShortString,
    token: Option<String>,
    refresh_at_ms: Option<u64>,
    now_ms: u64,
}

impl<T: HttpTransport> FirestoreSink<T> {
    /// Creates the sink without a token.
    pub fn new(transport: T, config: &FirestoreConfig) -> Self {
        Self {
            transport,
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            token: None,
            refresh_at_ms: None,
            now_ms: 0,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Loop time at which the token is renewed, if its lifetime is known.
    pub fn refresh_at_ms(&self) -> Option<u64> {
        self.refresh_at_ms
    }

    /// URL documents are created under.
    pub fn documents_url(&self) -> String {
        format!(
            "{}/{}/databases/(default)/documents/{}",
            FIRESTORE_BASE_URL, self.project_id, self.collection
        )
    }

    fn sign_up(&mut self) -> Result<(), SinkError> {
        let url = format!("{}?key={}", SIGN_UP_URL, self.api_key);
        let body = to_json(&SignUpRequest::default())?;
        let request = HttpRequest::post(url, JSON_CONTENT_TYPE, body);

        let resp = self.transport.execute(&request).map_err(transport_error)?;
        if !resp.is_success() {
            warn!("firestore: sign-up rejected with status {}", resp.status);
            return Err(SinkError::Status(resp.status));
        }
        let parsed = parse_sign_up(&resp.body)
            .ok_or_else(|| SinkError::Transport("sign-up reply without id token".into()))?;
        let lifetime_secs = parsed.expires_in_secs();
        info!("firestore: signed in (token valid {:?} s)", lifetime_secs);
        self.token = Some(parsed.id_token.into());
        self.refresh_at_ms = lifetime_secs.map(|secs| {
            (self.now_ms + u64::from(secs) * 1000).saturating_sub(TOKEN_REFRESH_MARGIN_MS)
        });
        Ok(())
    }

    fn drop_token(&mut self) {
        self.token = None;
        self.refresh_at_ms = None;
    }
}

impl<T: HttpTransport> Sink for FirestoreSink<T> {
    fn name(&self) -> &str {
        "firestore"
    }

    fn connect(&mut self) -> Result<(), SinkError> {
        self.sign_up()
    }

    fn send(&mut self, record: &DepositRecord) -> Result<(), SinkError> {
        if self.token.is_none() {
            self.sign_up()?;
        }
        let token = self.token.as_deref().ok_or(SinkError::NotConnected)?;

        let body = to_json(&FirestoreDocument::from(record))?;
        let request = HttpRequest::post(self.documents_url(), JSON_CONTENT_TYPE, body)
            .with_header("Authorization", &format!("Bearer {}", token));

        let resp = self.transport.execute(&request).map_err(transport_error)?;
        match resp.status {
            200..=299 => Ok(()),
            401 => {
                warn!("firestore: token rejected, will sign up again");
                self.drop_token();
                Err(SinkError::Status(401))
            }
            code => Err(SinkError::Status(code)),
        }
    }

    fn maintain(&mut self, now_ms: u64, online: bool) {
        self.now_ms = now_ms;
        if !online || self.token.is_none() {
            return;
        }
        match self.refresh_at_ms {
            Some(at) if now_ms >= at => {}
            _ => return,
        }
        if let Err(e) = self.sign_up() {
            // The next send signs up again.
            warn!("firestore: token refresh failed: {}", e);
            self.drop_token();
        }
    }

    fn is_connected(&self) -> bool {
        self.token.is_some()
    }
}

// ============================================================================
// MQTT
// ============================================================================

/// Publishes each record as JSON telemetry.
///
/// While online and disconnected, [`maintain`](Sink::maintain) retries
/// the broker connection at most once per retry interval. A send on a
/// disconnected client makes one immediate reconnect attempt.
#[derive(Debug)]
pub struct MqttSink<C: MqttClient> {
    client: C,
    topic: LongString,
    retry_ms: u32,
    last_retry_ms: Option<u64>,
}

impl<C: MqttClient> MqttSink<C> {
    /// Creates the sink.
    pub fn new(client: C, config: &MqttConfig, retry_ms: u32) -> Self {
        Self {
            client,
            topic: config.topic.clone(),
            retry_ms,
            last_retry_ms: None,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Mutable access to the client.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    fn reconnect(&mut self) -> Result<(), SinkError> {
        self.client.reconnect().map_err(|e| {
            debug!("mqtt: reconnect failed: {:?}", e);
            SinkError::NotConnected
        })
    }
}

impl<C: MqttClient> Sink for MqttSink<C> {
    fn name(&self) -> &str {
        "mqtt"
    }

    fn connect(&mut self) -> Result<(), SinkError> {
        if self.client.is_connected() {
            return Ok(());
        }
        self.reconnect()
    }

    fn send(&mut self, record: &DepositRecord) -> Result<(), SinkError> {
        if !self.client.is_connected() {
            self.reconnect()?;
        }
        let json = to_json(&TelemetryPayload::from(record))?;
        self.client
            .publish(&self.topic, json.as_bytes(), false)
            .map_err(transport_error)
    }

    fn maintain(&mut self, now_ms: u64, online: bool) {
        if !online || self.client.is_connected() {
            return;
        }
        let due = match self.last_retry_ms {
            Some(t) => now_ms.saturating_sub(t) >= u64::from(self.retry_ms),
            None => true,
        };
        if !due {
            return;
        }
        self.last_retry_ms = Some(now_ms);
        match self.reconnect() {
            Ok(()) => info!("mqtt: reconnected"),
            Err(_) => warn!("mqtt: broker unreachable, retry in {} ms", self.retry_ms),
        }
    }

    fn is_connected(&self) -> bool {
        self.client.is_connected()
    }
}
