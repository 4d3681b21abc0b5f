//! Commit handling: deposit → record → sinks → outcome.
//!
//! The [`UploadDispatcher`] owns the configured [`Sink`]s in priority order.
//! On commit it validates the deposit, checks connectivity and the wall
//! clock, builds one [`DepositRecord`] and delivers it. The first sink's
//! result decides the operator-visible [`UploadOutcome`]; later sinks are
//! best-effort and their failures are only logged.
//!
//! # Outcome Rules
//!
//! | Condition | Outcome | Sinks called |
//! |-----------|---------|--------------|
//! | no category | `Rejected(NoCategory)` | none |
//! | offline | `Rejected(Offline)` | none |
//! | clock never synced | `Rejected(ClockUnsynced)` | none |
//! | no sinks configured | `Rejected(NoSinks)` | none |
//! | primary sink error | `TransientFailure` | all |
//! | primary sink ok | `Success` | all |
//!
//! The deposit is reset only on `Success`.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use log::{debug, info, warn};

use crate::config::{short_string, ShortString};
use crate::connectivity::ConnectivityState;
use crate::deposit::Deposit;
use crate::error::SinkError;
use crate::traits::{WallClock, Watchdog};
use crate::weight::WeightSample;

/// `strftime` pattern for record timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// ============================================================================
// Outcome
// ============================================================================

/// Why a commit was refused without contacting any backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RejectReason {
    /// No category was selected.
    NoCategory,
    /// The kiosk is in offline mode.
    Offline,
    /// The wall clock was never synchronised, so no valid timestamp exists.
    ClockUnsynced,
    /// The dispatcher has no sinks.
    NoSinks,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCategory => write!(f, "no category selected"),
            Self::Offline => write!(f, "offline"),
            Self::ClockUnsynced => write!(f, "clock not synchronised"),
            Self::NoSinks => write!(f, "no sinks configured"),
        }
    }
}

/// Operator-relevant result of one commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The primary sink accepted the record.
    Success,
    /// Delivery was attempted and the primary sink failed.
    TransientFailure(SinkError),
    /// Refused locally; no sink was contacted.
    Rejected(RejectReason),
}

impl UploadOutcome {
    /// True for [`UploadOutcome::Success`].
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

// ============================================================================
// Record and Sink
// ============================================================================

/// One committed deposit as delivered to backends.
#[derive(Clone, Debug, PartialEq)]
pub struct DepositRecord {
    /// Weight in hundredths of a kilogram (rounded half up).
    pub centi_kg: u32,
    /// Classified label, e.g. "Botol".
    pub label: &'static str,
    /// Site/location tag.
    pub site: ShortString,
    /// UTC timestamp, `YYYY-MM-DDTHH:MM:SSZ`.
    pub timestamp: String,
}

impl DepositRecord {
    /// Builds a record, rounding the weight to two decimals.
    pub fn new(weight: WeightSample, deposit: &Deposit, site: &str, timestamp: String) -> Self {
        let kg = if weight.kg.is_finite() && weight.kg > 0.0 {
            weight.kg
        } else {
            0.0
        };
        Self {
            centi_kg: (kg * 100.0 + 0.5) as u32,
            label: deposit.label(),
            site: short_string(site),
            timestamp,
        }
    }

    /// Weight as a float, for JSON encoders.
    pub fn weight_kg(&self) -> f64 {
        f64::from(self.centi_kg) / 100.0
    }

    /// Weight formatted with exactly two decimals.
    pub fn weight_text(&self) -> String {
        alloc::format!("{}.{:02}", self.centi_kg / 100, self.centi_kg % 100)
    }
}

/// A delivery target for committed deposits.
///
/// Each `send` is a single attempt bounded by the sink's own transport
/// timeout; the dispatcher never retries within one commit.
pub trait Sink {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Establishes the backend session (sign-up, broker connect).
    ///
    /// Called once during boot. Default does nothing.
    fn connect(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Delivers one record.
    fn send(&mut self, record: &DepositRecord) -> Result<(), SinkError>;

    /// Periodic housekeeping from the control loop (session keep-alive,
    /// reconnects). Default does nothing.
    fn maintain(&mut self, _now_ms: u64, _online: bool) {}

    /// Whether the backend session is currently up.
    fn is_connected(&self) -> bool {
        true
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Delivers commits to an ordered list of sinks.
///
/// # Example
///
/// ```rust
/// use ecoscale::connectivity::ConnectivityState;
/// use ecoscale::deposit::{Category, Deposit};
/// use ecoscale::dispatch::{UploadDispatcher, UploadOutcome};
/// use ecoscale::hal::{MockSink, MockWallClock, MockWatchdog};
/// use ecoscale::weight::WeightSample;
///
/// let primary = MockSink::new("db");
/// let sent = primary.sent.clone();
///
/// let mut dispatcher = UploadDispatcher::new("FSM");
/// dispatcher.add_sink(Box::new(primary));
///
/// let mut deposit = Deposit::with_category(Category::Organic);
/// let outcome = dispatcher.commit(
///     &mut deposit,
///     WeightSample { kg: 1.25 },
///     &ConnectivityState::ONLINE,
///     &MockWallClock::synced(1_700_000_000),
///     &mut MockWatchdog::default(),
/// );
///
/// assert_eq!(outcome, UploadOutcome::Success);
/// assert!(deposit.is_empty());
/// assert_eq!(sent.borrow()[0].label, "Organik");
/// ```
pub struct UploadDispatcher {
    site: ShortString,
    sinks: Vec<Box<dyn Sink>>,
}

impl UploadDispatcher {
    /// Creates a dispatcher with no sinks.
    pub fn new(site: &str) -> Self {
        Self {
            site: short_string(site),
            sinks: Vec::new(),
        }
    }

    /// Appends a sink. The first sink added is the primary.
    pub fn add_sink(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`add_sink`](Self::add_sink).
    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.add_sink(sink);
        self
    }

    /// Number of configured sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Names of configured sinks, in priority order.
    pub fn sink_names(&self) -> impl Iterator<Item = &str> {
        self.sinks.iter().map(|s| s.name())
    }

    /// Site tag stamped on every record.
    pub fn site(&self) -> &str {
        self.site.as_str()
    }

    /// Whether the primary sink reports a live session.
    pub fn primary_connected(&self) -> bool {
        self.sinks.first().map(|s| s.is_connected()).unwrap_or(false)
    }

    /// Connects every sink.
    ///
    /// Returns the primary sink's error; secondary failures are logged.
    pub fn connect_all<D: Watchdog + ?Sized>(&mut self, watchdog: &mut D) -> Result<(), SinkError> {
        let mut primary = Ok(());
        for (i, sink) in self.sinks.iter_mut().enumerate() {
            watchdog.feed();
            match sink.connect() {
                Ok(()) => info!("sink {} connected", sink.name()),
                Err(e) if i == 0 => {
                    warn!("primary sink {} failed to connect: {}", sink.name(), e);
                    primary = Err(e);
                }
                Err(e) => warn!("sink {} failed to connect: {}", sink.name(), e),
            }
        }
        primary
    }

    /// Forwards loop housekeeping to every sink.
    pub fn maintain(&mut self, now_ms: u64, online: bool) {
        for sink in self.sinks.iter_mut() {
            sink.maintain(now_ms, online);
        }
    }

    /// Commits a deposit.
    ///
    /// Rejections are decided before any sink is touched. The deposit is
    /// reset to empty only when the outcome is `Success`.
    pub fn commit<C, D>(
        &mut self,
        deposit: &mut Deposit,
        weight: WeightSample,
        connectivity: &ConnectivityState,
        clock: &C,
        watchdog: &mut D,
    ) -> UploadOutcome
    where
        C: WallClock + ?Sized,
        D: Watchdog + ?Sized,
    {
        let outcome = self.deliver(deposit, weight, connectivity, clock, watchdog);
        if outcome.is_success() {
            deposit.reset();
        }
        outcome
    }

    fn deliver<C, D>(
        &mut self,
        deposit: &Deposit,
        weight: WeightSample,
        connectivity: &ConnectivityState,
        clock: &C,
        watchdog: &mut D,
    ) -> UploadOutcome
    where
        C: WallClock + ?Sized,
        D: Watchdog + ?Sized,
    {
        if deposit.is_empty() {
            debug!("commit rejected: no category");
            return UploadOutcome::Rejected(RejectReason::NoCategory);
        }
        if !connectivity.is_online() {
            info!("commit rejected: offline");
            return UploadOutcome::Rejected(RejectReason::Offline);
        }
        let Some(now) = clock.now_utc() else {
            warn!("commit rejected: wall clock not synchronised");
            return UploadOutcome::Rejected(RejectReason::ClockUnsynced);
        };
        if self.sinks.is_empty() {
            warn!("commit rejected: no sinks configured");
            return UploadOutcome::Rejected(RejectReason::NoSinks);
        }

        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let record = DepositRecord::new(weight, deposit, self.site.as_str(), timestamp);
        info!(
            "committing {} kg, {} ({})",
            record.weight_text(),
            record.label,
            record.timestamp
        );

        let mut outcome = UploadOutcome::Success;
        for (i, sink) in self.sinks.iter_mut().enumerate() {
            watchdog.feed();
            match sink.send(&record) {
                Ok(()) => debug!("sink {} accepted record", sink.name()),
                Err(e) if i == 0 => {
                    warn!("primary sink {} failed: {}", sink.name(), e);
                    outcome = UploadOutcome::TransientFailure(e);
                }
                Err(e) => warn!("secondary sink {} failed: {}", sink.name(), e),
            }
        }
        outcome
    }
}

impl fmt::Debug for UploadDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadDispatcher")
            .field("site", &self.site)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit::{Category, Subcategory};
    use crate::hal::{MockSink, MockWallClock, MockWatchdog};

    const NOW: i64 = 1_700_000_000; // 2023-11-14T22:13:20Z

    fn weight(kg: f32) -> WeightSample {
        WeightSample { kg }
    }

    fn commit(
        d: &mut UploadDispatcher,
        deposit: &mut Deposit,
        conn: ConnectivityState,
        clock: &MockWallClock,
    ) -> UploadOutcome {
        d.commit(deposit, weight(2.5), &conn, clock, &mut MockWatchdog::default())
    }

    // ========================================================================
    // Record Formatting
    // ========================================================================

    #[test]
    fn record_rounds_to_two_decimals() {
        let deposit = Deposit::inorganic(Subcategory::Bottle);
        let r = DepositRecord::new(weight(1.005_1), &deposit, "FIB", "t".into());
        assert_eq!(r.centi_kg, 101);
        assert_eq!(r.weight_text(), "1.01");
        assert_eq!(r.label, "Botol");
        assert_eq!(r.site.as_str(), "FIB");

        let r = DepositRecord::new(weight(0.1), &deposit, "FIB", "t".into());
        assert_eq!(r.weight_text(), "0.10");
    }

    #[test]
    fn record_clamps_invalid_weight() {
        let deposit = Deposit::with_category(Category::Organic);
        assert_eq!(DepositRecord::new(weight(f32::NAN), &deposit, "", "t".into()).centi_kg, 0);
        assert_eq!(DepositRecord::new(weight(-3.0), &deposit, "", "t".into()).centi_kg, 0);
    }

    // ========================================================================
    // Rejections
    // ========================================================================

    #[test]
    fn empty_deposit_rejected_regardless_of_connectivity() {
        let sink = MockSink::new("db");
        let sent = sink.sent.clone();
        let mut d = UploadDispatcher::new("FSM").with_sink(Box::new(sink));
        let clock = MockWallClock::synced(NOW);

        for conn in [ConnectivityState::ONLINE, ConnectivityState::OFFLINE] {
            let mut deposit = Deposit::EMPTY;
            assert_eq!(
                commit(&mut d, &mut deposit, conn, &clock),
                UploadOutcome::Rejected(RejectReason::NoCategory)
            );
        }
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn offline_rejected_without_send() {
        let sink = MockSink::new("db");
        let sent = sink.sent.clone();
        let mut d = UploadDispatcher::new("FSM").with_sink(Box::new(sink));
        let mut deposit = Deposit::inorganic(Subcategory::Bottle);

        let outcome = commit(
            &mut d,
            &mut deposit,
            ConnectivityState::OFFLINE,
            &MockWallClock::synced(NOW),
        );
        assert_eq!(outcome, UploadOutcome::Rejected(RejectReason::Offline));
        assert_eq!(deposit, Deposit::inorganic(Subcategory::Bottle));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn unsynced_clock_rejected() {
        let sink = MockSink::new("db");
        let sent = sink.sent.clone();
        let mut d = UploadDispatcher::new("FSM").with_sink(Box::new(sink));
        let mut deposit = Deposit::with_category(Category::Residual);

        let outcome = commit(
            &mut d,
            &mut deposit,
            ConnectivityState::ONLINE,
            &MockWallClock::unsynced(),
        );
        assert_eq!(outcome, UploadOutcome::Rejected(RejectReason::ClockUnsynced));
        assert!(sent.borrow().is_empty());
        assert!(!deposit.is_empty());
    }

    #[test]
    fn no_sinks_rejected() {
        let mut d = UploadDispatcher::new("FSM");
        let mut deposit = Deposit::with_category(Category::Residual);
        let outcome = commit(
            &mut d,
            &mut deposit,
            ConnectivityState::ONLINE,
            &MockWallClock::synced(NOW),
        );
        assert_eq!(outcome, UploadOutcome::Rejected(RejectReason::NoSinks));
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    #[test]
    fn success_resets_deposit_and_stamps_record() {
        let sink = MockSink::new("db");
        let sent = sink.sent.clone();
        let mut d = UploadDispatcher::new("FSM").with_sink(Box::new(sink));
        let mut deposit = Deposit::inorganic(Subcategory::General);

        let outcome = commit(
            &mut d,
            &mut deposit,
            ConnectivityState::ONLINE,
            &MockWallClock::synced(NOW),
        );
        assert_eq!(outcome, UploadOutcome::Success);
        assert!(deposit.is_empty());

        let sent = sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].label, "Anorganik");
        assert_eq!(sent[0].weight_text(), "2.50");
        assert_eq!(sent[0].site.as_str(), "FSM");
        assert_eq!(sent[0].timestamp, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn primary_failure_preserves_deposit() {
        let sink = MockSink::new("db").failing(SinkError::Timeout);
        let mut d = UploadDispatcher::new("FSM").with_sink(Box::new(sink));
        let mut deposit = Deposit::with_category(Category::Organic);

        let outcome = commit(
            &mut d,
            &mut deposit,
            ConnectivityState::ONLINE,
            &MockWallClock::synced(NOW),
        );
        assert_eq!(outcome, UploadOutcome::TransientFailure(SinkError::Timeout));
        assert_eq!(deposit, Deposit::with_category(Category::Organic));
    }

    #[test]
    fn secondary_failure_does_not_affect_outcome() {
        let primary = MockSink::new("db");
        let secondary = MockSink::new("mqtt").failing(SinkError::NotConnected);
        let secondary_attempts = secondary.attempts.clone();
        let mut d = UploadDispatcher::new("FSM")
            .with_sink(Box::new(primary))
            .with_sink(Box::new(secondary));
        let mut deposit = Deposit::with_category(Category::Organic);

        let outcome = commit(
            &mut d,
            &mut deposit,
            ConnectivityState::ONLINE,
            &MockWallClock::synced(NOW),
        );
        assert_eq!(outcome, UploadOutcome::Success);
        assert_eq!(secondary_attempts.get(), 1);
    }

    #[test]
    fn secondary_still_attempted_when_primary_fails() {
        let primary = MockSink::new("db").failing(SinkError::Status(500));
        let secondary = MockSink::new("mqtt");
        let secondary_sent = secondary.sent.clone();
        let mut d = UploadDispatcher::new("FSM")
            .with_sink(Box::new(primary))
            .with_sink(Box::new(secondary));
        let mut deposit = Deposit::with_category(Category::Residual);

        let outcome = commit(
            &mut d,
            &mut deposit,
            ConnectivityState::ONLINE,
            &MockWallClock::synced(NOW),
        );
        assert_eq!(outcome, UploadOutcome::TransientFailure(SinkError::Status(500)));
        assert_eq!(secondary_sent.borrow().len(), 1);
    }

    #[test]
    fn watchdog_fed_before_each_send() {
        let mut d = UploadDispatcher::new("FSM")
            .with_sink(Box::new(MockSink::new("a")))
            .with_sink(Box::new(MockSink::new("b")));
        let mut deposit = Deposit::with_category(Category::Organic);
        let mut wd = MockWatchdog::default();

        d.commit(
            &mut deposit,
            weight(1.0),
            &ConnectivityState::ONLINE,
            &MockWallClock::synced(NOW),
            &mut wd,
        );
        assert_eq!(wd.feeds, 2);
    }

    #[test]
    fn connect_all_reports_primary_only() {
        let mut d = UploadDispatcher::new("FSM")
            .with_sink(Box::new(MockSink::new("db")))
            .with_sink(Box::new(
                MockSink::new("mqtt").failing_connect(SinkError::NotConnected),
            ));
        assert!(d.connect_all(&mut MockWatchdog::default()).is_ok());

        let mut d = UploadDispatcher::new("FSM").with_sink(Box::new(
            MockSink::new("db").failing_connect(SinkError::Status(401)),
        ));
        assert_eq!(
            d.connect_all(&mut MockWatchdog::default()),
            Err(SinkError::Status(401))
        );
    }
}
