//! End-to-end kiosk scenarios on the mock board.

use std::cell::RefCell;
use std::rc::Rc;

use ecoscale::{
    hal::{MockBoard, MockHttp, MockSink},
    BootReport, Button, Config, Deposit, DisplayConfig, FormPostSink, HttpRequest, HttpResponse,
    HttpSinkConfig, HttpTransport, Icon, Kiosk, Locale, RejectReason, SessionState, SetupFailure,
    SinkError, Subcategory, UploadDispatcher, UploadOutcome,
};

// ============================================================================
// Helpers
// ============================================================================

/// HTTP transport whose recorded traffic stays visible after the sink is
/// boxed into the dispatcher.
#[derive(Clone, Default)]
struct SharedHttp(Rc<RefCell<MockHttp>>);

impl HttpTransport for SharedHttp {
    type Error = ();

    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, ()> {
        self.0.borrow_mut().execute(request)
    }
}

fn kiosk(config: Config, dispatcher: UploadDispatcher) -> Kiosk<MockBoard> {
    Kiosk::new(MockBoard::new(), config, dispatcher)
}

fn single_sink(sink: MockSink) -> UploadDispatcher {
    UploadDispatcher::new("FSM").with_sink(Box::new(sink))
}

fn press(k: &mut Kiosk<MockBoard>, button: Button, now: u64) {
    k.board_mut().buttons.press(button);
    k.tick(now);
}

/// Feeds two readings so the smoothed weight settles on `kg`.
fn settle_weight(k: &mut Kiosk<MockBoard>, kg: f32, start: u64) -> u64 {
    let raw = kg * k.config().scale.counts_per_kg;
    let interval = u64::from(k.config().scale.read_interval_ms);

    k.board_mut().scale.push_raw(raw);
    k.tick(start);
    k.board_mut().scale.push_raw(raw);
    k.tick(start + interval);
    start + interval
}

// ============================================================================
// Happy Path
// ============================================================================

#[test]
fn english_kiosk_commits_organic_deposit() {
    let sink = MockSink::new("db");
    let sent = Rc::clone(&sink.sent);
    let config =
        Config::default().with_display(DisplayConfig::default().with_locale(Locale::English));
    let mut k = kiosk(config, single_sink(sink));
    assert_eq!(k.boot(0), Ok(BootReport::Online));

    let t = settle_weight(&mut k, 2.0, 10);
    assert!((k.weight().kg - 2.0).abs() < 0.001);

    press(&mut k, Button::One, t + 10);
    press(&mut k, Button::Commit, t + 20);

    assert_eq!(k.last_outcome(), Some(&UploadOutcome::Success));
    assert_eq!(k.board().display.row(0), "Status: Success!");
    assert_eq!(k.board().buzzer.tones.last(), Some(&(2000, 100)));

    let records = sent.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].label, "Organik");
    assert_eq!(records[0].weight_text(), "2.00");
    assert_eq!(records[0].site.as_str(), "FSM");
    assert_eq!(records[0].timestamp, "2023-11-14T22:13:20Z");
    drop(records);

    // The status holds for its full duration, then home with a fresh deposit.
    k.tick(t + 20 + 1999);
    assert_eq!(k.session_state(), SessionState::ShowingStatus);
    k.tick(t + 20 + 2000);
    assert_eq!(k.session_state(), SessionState::Idle);
    assert!(k.deposit().is_empty());
    assert_eq!(k.board().display.row(0), "Jenis: --");
}

#[test]
fn form_post_carries_the_record_fields() {
    let http = SharedHttp::default();
    let config = HttpSinkConfig::default()
        .with_url("https://example.test/api/receive")
        .with_api_key("k3y");
    let dispatcher =
        UploadDispatcher::new("FT").with_sink(Box::new(FormPostSink::new(http.clone(), &config)));
    let mut k = kiosk(Config::default(), dispatcher);
    k.boot(0).unwrap();

    let t = settle_weight(&mut k, 2.0, 10);
    press(&mut k, Button::Two, t + 10);
    press(&mut k, Button::Two, t + 20);
    assert_eq!(k.deposit(), Deposit::inorganic(Subcategory::Bottle));
    press(&mut k, Button::Commit, t + 30);

    assert_eq!(k.last_outcome(), Some(&UploadOutcome::Success));
    let transport = http.0.borrow();
    let request = transport.last_request().unwrap();
    assert_eq!(request.url, "https://example.test/api/receive");
    assert_eq!(request.header("Connection"), Some("close"));

    let body = request.body_str().unwrap();
    assert!(body.contains("api_key=k3y"));
    assert!(body.contains("berat=2.00"));
    assert!(body.contains("fakultas=FT"));
    assert!(body.contains("jenis=Botol"));
    assert!(body.contains("timestamp=2023-11-14T22%3A13%3A20Z"));
}

#[test]
fn success_marker_in_body_counts_as_accepted() {
    let http = SharedHttp::default();
    http.0
        .borrow_mut()
        .queue_response(302, "Data berhasil disimpan");
    let dispatcher = UploadDispatcher::new("FSM").with_sink(Box::new(FormPostSink::new(
        http.clone(),
        &HttpSinkConfig::default(),
    )));
    let mut k = kiosk(Config::default(), dispatcher);
    k.boot(0).unwrap();

    press(&mut k, Button::Three, 10);
    press(&mut k, Button::Commit, 20);
    assert_eq!(k.last_outcome(), Some(&UploadOutcome::Success));
}

// ============================================================================
// Delivery Failures
// ============================================================================

#[test]
fn failed_primary_keeps_deposit_for_retry() {
    let sink = MockSink::new("db").failing(SinkError::Status(500));
    let attempts = Rc::clone(&sink.attempts);
    let mut k = kiosk(Config::default(), single_sink(sink));
    k.boot(0).unwrap();

    press(&mut k, Button::Three, 10);
    press(&mut k, Button::Commit, 20);
    assert_eq!(
        k.last_outcome(),
        Some(&UploadOutcome::TransientFailure(SinkError::Status(500)))
    );
    assert_eq!(k.board().display.row(0), "Status: Gagal!");

    k.tick(2020);
    assert_eq!(k.session_state(), SessionState::Idle);
    assert_eq!(k.board().display.row(0), "Jenis: Residu");

    press(&mut k, Button::Commit, 2030);
    assert_eq!(attempts.get(), 2);
}

#[test]
fn secondary_failure_does_not_change_outcome() {
    let primary = MockSink::new("db");
    let secondary = MockSink::new("mqtt").failing(SinkError::NotConnected);
    let primary_sent = Rc::clone(&primary.sent);
    let secondary_attempts = Rc::clone(&secondary.attempts);
    let dispatcher = UploadDispatcher::new("FSM")
        .with_sink(Box::new(primary))
        .with_sink(Box::new(secondary));
    let mut k = kiosk(Config::default(), dispatcher);
    k.boot(0).unwrap();

    press(&mut k, Button::One, 10);
    press(&mut k, Button::Commit, 20);

    assert_eq!(k.last_outcome(), Some(&UploadOutcome::Success));
    assert_eq!(primary_sent.borrow().len(), 1);
    assert_eq!(secondary_attempts.get(), 1);
    assert!(k.deposit().is_empty());
}

// ============================================================================
// Connectivity
// ============================================================================

#[test]
fn link_loss_goes_offline_and_refuses_commits() {
    let sink = MockSink::new("db");
    let attempts = Rc::clone(&sink.attempts);
    let mut k = kiosk(Config::default(), single_sink(sink));
    k.boot(0).unwrap();

    k.board_mut().link.up = false;
    k.tick(15_000);
    assert!(k.connectivity().offline);
    assert_eq!(k.board().link.reconnects, 1);
    assert_eq!(k.board().display.icon, Some(Icon::NoInternet));
    assert!(k.board().display.row(3).ends_with("OFF"));

    press(&mut k, Button::One, 15_010);
    press(&mut k, Button::Commit, 15_020);
    assert_eq!(
        k.last_outcome(),
        Some(&UploadOutcome::Rejected(RejectReason::Offline))
    );
    assert_eq!(k.board().display.row(0), "Gagal: Offline!");
    assert_eq!(attempts.get(), 0);
    assert_eq!(k.deposit(), Deposit::with_category(ecoscale::Category::Organic));
}

#[test]
fn link_recovery_resyncs_clock_and_allows_commit() {
    let mut k = kiosk(Config::default(), single_sink(MockSink::new("db")));
    k.boot(0).unwrap();

    k.board_mut().link.up = false;
    k.tick(15_000);
    assert!(k.connectivity().offline);

    let syncs = k.board().wall_clock.syncs;
    k.board_mut().link.up = true;
    k.tick(25_000);
    assert!(!k.connectivity().offline);
    assert_eq!(k.board().wall_clock.syncs, syncs + 1);

    press(&mut k, Button::One, 25_010);
    press(&mut k, Button::Commit, 25_020);
    assert_eq!(k.last_outcome(), Some(&UploadOutcome::Success));
}

#[test]
fn never_synced_clock_refuses_commit_after_recovery() {
    let mut board = MockBoard::new();
    board.wall_clock.synced = false;
    board.wall_clock.sync_ok = false;
    let mut k = Kiosk::new(board, Config::default(), single_sink(MockSink::new("db")));

    assert_eq!(k.boot(0), Ok(BootReport::Degraded(SetupFailure::TimeSync)));
    assert!(k.connectivity().offline);

    // Probe passes at the next health check, but time sync still fails.
    k.tick(10_000);
    assert!(k.connectivity().is_online());

    press(&mut k, Button::One, 10_010);
    press(&mut k, Button::Commit, 10_020);
    assert_eq!(
        k.last_outcome(),
        Some(&UploadOutcome::Rejected(RejectReason::ClockUnsynced))
    );
    assert_eq!(k.board().display.row(0), "Gagal: Waktu NTP!");
}

#[test]
fn online_status_bar_shows_rssi() {
    let mut k = kiosk(Config::default(), single_sink(MockSink::new("db")));
    k.boot(0).unwrap();
    k.tick(10);

    assert!(k.board().display.row(3).ends_with("-60"));
    assert_ne!(k.board().display.icon, Some(Icon::NoInternet));
}
