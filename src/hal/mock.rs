//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without the kiosk board.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockLoadCell`] | [`LoadCell`] | Injected raw samples, scripted tare |
//! | [`MockButtons`] | [`ButtonInput`] | Queued presses |
//! | [`MockBuzzer`] | [`Buzzer`] | Records tones |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockWatchdog`] | [`Watchdog`] | Counts feeds |
//! | [`MockLink`] | [`NetworkLink`] | Scripted link state and RSSI |
//! | [`MockProbe`] | [`HealthProbe`] | Scripted probe result |
//! | [`MockWallClock`] | [`WallClock`] | Settable UTC time |
//! | [`MockHttp`] | [`HttpTransport`] | Queued responses, recorded requests |
//! | [`MockMqtt`] | [`MqttClient`] | Captures publishes |
//! | [`MockDisplay`] | [`KioskDisplay`] | Keeps the rendered rows |
//! | [`MockSink`] | [`Sink`] | Records delivered records |
//! | [`MockBoard`] | [`Board`] | All of the above in one board |
//!
//! # Example
//!
//! ```rust
//! use ecoscale::hal::MockBoard;
//! use ecoscale::traits::{Board, Button, ButtonInput};
//!
//! let mut board = MockBoard::new();
//! board.buttons.press(Button::One);
//!
//! let parts = board.parts();
//! assert_eq!(parts.buttons.next_press(), Some(Button::One));
//! ```
//!
//! [`LoadCell`]: crate::traits::LoadCell
//! [`ButtonInput`]: crate::traits::ButtonInput
//! [`Buzzer`]: crate::traits::Buzzer
//! [`Clock`]: crate::traits::Clock
//! [`Watchdog`]: crate::traits::Watchdog
//! [`NetworkLink`]: crate::traits::NetworkLink
//! [`HealthProbe`]: crate::traits::HealthProbe
//! [`WallClock`]: crate::traits::WallClock
//! [`HttpTransport`]: crate::traits::HttpTransport
//! [`MqttClient`]: crate::traits::MqttClient
//! [`KioskDisplay`]: crate::traits::KioskDisplay
//! [`Sink`]: crate::dispatch::Sink
//! [`Board`]: crate::traits::Board

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use chrono::{DateTime, Utc};

use crate::dispatch::{DepositRecord, Sink};
use crate::error::SinkError;
use crate::traits::{
    Board, BoardParts, Button, ButtonInput, Buzzer, Clock, HealthProbe, HttpRequest,
    HttpResponse, HttpTransport, Icon, KioskDisplay, LoadCell, MqttClient, NetworkLink,
    WallClock, Watchdog, DISPLAY_ROWS,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock load cell.
///
/// Holds at most one pending raw sample; pushing a new one replaces it,
/// the same way the real converter only exposes its latest conversion.
///
/// # Example
///
/// ```rust
/// use ecoscale::hal::MockLoadCell;
/// use ecoscale::traits::LoadCell;
///
/// let mut cell = MockLoadCell::new();
/// cell.push_raw(100.0);
/// cell.push_raw(250.0);
///
/// assert_eq!(cell.poll_raw(), Some(250.0));
/// assert_eq!(cell.poll_raw(), None);
/// ```
#[derive(Debug)]
pub struct MockLoadCell {
    /// Sample returned by the next `poll_raw`.
    pub pending: Option<f32>,
    /// Result of `tare`.
    pub tare_ok: bool,
    /// Number of tare calls.
    pub tares: usize,
}

impl MockLoadCell {
    /// Creates a load cell with no pending sample and a working tare.
    pub fn new() -> Self {
        Self {
            pending: None,
            tare_ok: true,
            tares: 0,
        }
    }

    /// Makes a raw sample available, replacing any unread one.
    pub fn push_raw(&mut self, raw: f32) {
        self.pending = Some(raw);
    }
}

impl Default for MockLoadCell {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadCell for MockLoadCell {
    fn poll_raw(&mut self) -> Option<f32> {
        self.pending.take()
    }

    fn tare(&mut self, _timeout_ms: u32) -> bool {
        self.tares += 1;
        self.tare_ok
    }
}

/// Mock buttons. Presses come out in the order they were queued.
#[derive(Debug, Default)]
pub struct MockButtons {
    queue: VecDeque<Button>,
    /// Number of `poll` calls.
    pub polls: usize,
}

impl MockButtons {
    /// Creates an idle button set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one press.
    pub fn press(&mut self, button: Button) {
        self.queue.push_back(button);
    }

    /// Number of unread presses.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl ButtonInput for MockButtons {
    fn poll(&mut self) {
        self.polls += 1;
    }

    fn next_press(&mut self) -> Option<Button> {
        self.queue.pop_front()
    }
}

/// Mock buzzer recording `(frequency_hz, duration_ms)` pairs.
#[derive(Debug, Default)]
pub struct MockBuzzer {
    /// Every tone started, oldest first.
    pub tones: Vec<(u32, u32)>,
    /// Last time passed to `update`.
    pub last_update_ms: Option<u64>,
}

impl Buzzer for MockBuzzer {
    fn tone(&mut self, frequency_hz: u32, duration_ms: u32) {
        self.tones.push((frequency_hz, duration_ms));
    }

    fn update(&mut self, now_ms: u64) {
        self.last_update_ms = Some(now_ms);
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use ecoscale::hal::MockClock;
/// use ecoscale::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

/// Mock watchdog counting feeds.
#[derive(Debug, Default)]
pub struct MockWatchdog {
    /// Number of `feed` calls.
    pub feeds: usize,
}

impl Watchdog for MockWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock network link.
///
/// `connect` brings the link up when `connect_ok` is set. `reconnect` only
/// counts; flip `up` directly to simulate re-association.
#[derive(Debug)]
pub struct MockLink {
    /// Current link state.
    pub up: bool,
    /// Result of `connect`.
    pub connect_ok: bool,
    /// Signal strength reported while up.
    pub rssi: Option<i8>,
    /// Number of `connect` calls.
    pub connects: usize,
    /// Number of `reconnect` calls.
    pub reconnects: usize,
}

impl MockLink {
    /// A link that is up and connects successfully.
    pub fn up() -> Self {
        Self {
            up: true,
            connect_ok: true,
            rssi: Some(-60),
            connects: 0,
            reconnects: 0,
        }
    }

    /// A link that is down and cannot connect.
    pub fn down() -> Self {
        Self {
            up: false,
            connect_ok: false,
            ..Self::up()
        }
    }
}

impl NetworkLink for MockLink {
    fn connect(&mut self, _timeout_ms: u32) -> bool {
        self.connects += 1;
        if self.connect_ok {
            self.up = true;
        }
        self.up
    }

    fn is_up(&self) -> bool {
        self.up
    }

    fn reconnect(&mut self) {
        self.reconnects += 1;
    }

    fn rssi(&self) -> Option<i8> {
        if self.up {
            self.rssi
        } else {
            None
        }
    }
}

/// Mock reachability probe.
#[derive(Debug)]
pub struct MockProbe {
    /// Result of the next `check`.
    pub result: bool,
    /// Number of `check` calls.
    pub checks: usize,
}

impl MockProbe {
    /// Creates a probe that always answers `result`.
    pub fn new(result: bool) -> Self {
        Self { result, checks: 0 }
    }
}

impl HealthProbe for MockProbe {
    fn check(&mut self) -> bool {
        self.checks += 1;
        self.result
    }
}

/// Mock wall clock.
///
/// `source_unix` is the time a sync would obtain. `sync` succeeds when
/// `sync_ok` is set and a source time exists.
#[derive(Debug)]
pub struct MockWallClock {
    /// Time a successful sync yields, in Unix seconds.
    pub source_unix: Option<i64>,
    /// Whether a sync has ever succeeded.
    pub synced: bool,
    /// Whether `sync` succeeds.
    pub sync_ok: bool,
    /// Number of `sync` calls.
    pub syncs: usize,
}

impl MockWallClock {
    /// A clock already synchronised to `unix` seconds.
    pub fn synced(unix: i64) -> Self {
        Self {
            source_unix: Some(unix),
            synced: true,
            sync_ok: true,
            syncs: 0,
        }
    }

    /// A clock that was never synchronised and has no time source.
    pub fn unsynced() -> Self {
        Self {
            source_unix: None,
            synced: false,
            sync_ok: true,
            syncs: 0,
        }
    }

    /// Sets the time the next sync obtains (and the current time, once synced).
    pub fn set_unix(&mut self, unix: i64) {
        self.source_unix = Some(unix);
    }
}

impl WallClock for MockWallClock {
    fn sync(&mut self, _timeout_ms: u32) -> bool {
        self.syncs += 1;
        let ok = self.sync_ok && self.source_unix.is_some();
        if ok {
            self.synced = true;
        }
        ok
    }

    fn now_utc(&self) -> Option<DateTime<Utc>> {
        if !self.synced {
            return None;
        }
        self.source_unix
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Mock HTTP transport.
///
/// Requests are recorded; responses are served from a queue. An empty
/// queue answers `200` with an empty body. Set `fail_transport` to make
/// every call fail before a response.
///
/// # Example
///
/// ```rust
/// use ecoscale::hal::MockHttp;
/// use ecoscale::traits::{HttpRequest, HttpTransport};
///
/// let mut http = MockHttp::new();
/// http.queue_response(201, "created");
///
/// let resp = http.execute(&HttpRequest::post("http://x/y", "text/plain", "hi")).unwrap();
/// assert_eq!(resp.status, 201);
/// assert_eq!(http.requests[0].url, "http://x/y");
/// ```
#[derive(Debug, Default)]
pub struct MockHttp {
    /// Requests received, oldest first.
    pub requests: Vec<HttpRequest>,
    /// Responses to serve, front first.
    pub responses: VecDeque<HttpResponse>,
    /// Fail every request at the transport level.
    pub fail_transport: bool,
}

impl MockHttp {
    /// Creates a transport with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn queue_response(&mut self, status: u16, body: impl Into<Vec<u8>>) {
        self.responses.push_back(HttpResponse::new(status, body));
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<&HttpRequest> {
        self.requests.last()
    }
}

impl HttpTransport for MockHttp {
    type Error = ();

    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, ()> {
        self.requests.push(request.clone());
        if self.fail_transport {
            return Err(());
        }
        Ok(self
            .responses
            .pop_front()
            .unwrap_or_else(|| HttpResponse::new(200, Vec::new())))
    }
}

/// Mock MQTT client for testing.
///
/// Records every publish. Publishing while disconnected fails.
///
/// # Example
///
/// ```rust
/// use ecoscale::hal::MockMqtt;
/// use ecoscale::traits::MqttClient;
///
/// let mut mqtt = MockMqtt::new();
/// mqtt.publish("undip/scale/new", b"{}", false).unwrap();
/// assert_eq!(mqtt.published_to("undip/scale/new").len(), 1);
///
/// mqtt.connected = false;
/// assert!(mqtt.publish("undip/scale/new", b"{}", false).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Whether the client is connected.
    pub connected: bool,
    /// Whether `reconnect` succeeds.
    pub reconnect_ok: bool,
    /// Number of `reconnect` calls.
    pub reconnects: usize,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            reconnect_ok: true,
            ..Default::default()
        }
    }

    /// Creates a disconnected client.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// Messages published to `topic`.
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published.iter().filter(|(t, _, _)| t == topic).collect()
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if !self.connected {
            return Err(());
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> Result<(), ()> {
        self.reconnects += 1;
        self.connected = self.reconnect_ok;
        if self.connected {
            Ok(())
        } else {
            Err(())
        }
    }
}

// ============================================================================
// Display Mock
// ============================================================================

/// Mock display keeping the text of every row.
///
/// Writing to a row outside the panel fails.
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// Current text of each row.
    pub rows: [String; DISPLAY_ROWS as usize],
    /// Every big number drawn, oldest first.
    pub big_numbers: Vec<f32>,
    /// Last corner icon drawn.
    pub icon: Option<Icon>,
    /// Number of `clear` calls.
    pub clears: usize,
    /// Whether `init` was called.
    pub initialized: bool,
}

impl MockDisplay {
    /// Creates a blank display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of row `index`, or `""` if out of range.
    pub fn row(&self, index: usize) -> &str {
        self.rows.get(index).map(String::as_str).unwrap_or("")
    }
}

impl KioskDisplay for MockDisplay {
    type Error = ();

    fn init(&mut self) -> Result<(), ()> {
        self.initialized = true;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ()> {
        for row in self.rows.iter_mut() {
            row.clear();
        }
        self.clears += 1;
        Ok(())
    }

    fn show_line(&mut self, row: u8, text: &str) -> Result<(), ()> {
        let slot = self.rows.get_mut(usize::from(row)).ok_or(())?;
        slot.clear();
        slot.push_str(text);
        Ok(())
    }

    fn show_big_number(&mut self, value: f32) -> Result<(), ()> {
        self.big_numbers.push(value);
        Ok(())
    }

    fn show_icon(&mut self, icon: Icon) -> Result<(), ()> {
        self.icon = Some(icon);
        Ok(())
    }
}

// ============================================================================
// Sink Mock
// ============================================================================

/// Mock upload sink.
///
/// `sent` and `attempts` are shared handles so a test can keep a clone
/// after the sink is boxed into a dispatcher.
#[derive(Debug)]
pub struct MockSink {
    name: String,
    /// Records accepted by this sink.
    pub sent: Rc<RefCell<Vec<DepositRecord>>>,
    /// Number of `send` calls, successful or not.
    pub attempts: Rc<Cell<usize>>,
    /// Error returned by every `send`.
    pub send_error: Option<SinkError>,
    /// Error returned by `connect`.
    pub connect_error: Option<SinkError>,
}

impl MockSink {
    /// A sink that accepts everything.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            sent: Rc::new(RefCell::new(Vec::new())),
            attempts: Rc::new(Cell::new(0)),
            send_error: None,
            connect_error: None,
        }
    }

    /// Makes every `send` fail with `error`.
    pub fn failing(mut self, error: SinkError) -> Self {
        self.send_error = Some(error);
        self
    }

    /// Makes `connect` fail with `error`.
    pub fn failing_connect(mut self, error: SinkError) -> Self {
        self.connect_error = Some(error);
        self
    }
}

impl Sink for MockSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> Result<(), SinkError> {
        match &self.connect_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn send(&mut self, record: &DepositRecord) -> Result<(), SinkError> {
        self.attempts.set(self.attempts.get() + 1);
        if let Some(e) = &self.send_error {
            return Err(e.clone());
        }
        self.sent.borrow_mut().push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Board Mock
// ============================================================================

/// A complete mock kiosk board.
///
/// Starts tared-capable, with the link up, the probe passing and the wall
/// clock synchronised to 2023-11-14T22:13:20Z.
#[derive(Debug)]
pub struct MockBoard {
    /// Load cell.
    pub scale: MockLoadCell,
    /// Buttons.
    pub buttons: MockButtons,
    /// Display.
    pub display: MockDisplay,
    /// Buzzer.
    pub buzzer: MockBuzzer,
    /// Network link.
    pub link: MockLink,
    /// Reachability probe.
    pub probe: MockProbe,
    /// UTC wall clock.
    pub wall_clock: MockWallClock,
    /// Watchdog.
    pub watchdog: MockWatchdog,
}

impl MockBoard {
    /// Creates a healthy board.
    pub fn new() -> Self {
        Self {
            scale: MockLoadCell::new(),
            buttons: MockButtons::new(),
            display: MockDisplay::new(),
            buzzer: MockBuzzer::default(),
            link: MockLink::up(),
            probe: MockProbe::new(true),
            wall_clock: MockWallClock::synced(1_700_000_000),
            watchdog: MockWatchdog::default(),
        }
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for MockBoard {
    type Scale = MockLoadCell;
    type Buttons = MockButtons;
    type Display = MockDisplay;
    type Buzzer = MockBuzzer;
    type Link = MockLink;
    type Probe = MockProbe;
    type WallClock = MockWallClock;
    type Watchdog = MockWatchdog;

    fn parts(&mut self) -> BoardParts<'_, Self> {
        BoardParts {
            scale: &mut self.scale,
            buttons: &mut self.buttons,
            display: &mut self.display,
            buzzer: &mut self.buzzer,
            link: &mut self.link,
            probe: &mut self.probe,
            wall_clock: &mut self.wall_clock,
            watchdog: &mut self.watchdog,
        }
    }
}
