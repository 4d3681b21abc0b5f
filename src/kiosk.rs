//! The kiosk context: one owned struct driven by a cooperative loop.
//!
//! [`Kiosk`] owns the board, the session state machine, the deposit, the
//! weight pipeline, the connectivity monitor, the dispatcher and the
//! presenter. The binary calls [`Kiosk::boot`] once and then
//! [`Kiosk::tick`] on every loop iteration. All mutable state is touched
//! only from these calls, so no locking is needed.
//!
//! # Tick Order
//!
//! 1. Feed the watchdog, service the buzzer, sample the buttons
//! 2. Connectivity bookkeeping and sink maintenance
//! 3. Weight acquisition
//! 4. Session timers and button handling (commit runs here)
//! 5. Display refresh
//!
//! # Example
//!
//! ```rust
//! use ecoscale::config::Config;
//! use ecoscale::dispatch::UploadDispatcher;
//! use ecoscale::hal::{MockBoard, MockSink};
//! use ecoscale::kiosk::{BootReport, Kiosk};
//! use ecoscale::session::SessionState;
//! use ecoscale::traits::Button;
//!
//! let dispatcher = UploadDispatcher::new("FSM").with_sink(Box::new(MockSink::new("db")));
//! let mut kiosk = Kiosk::new(MockBoard::new(), Config::default(), dispatcher);
//! assert_eq!(kiosk.boot(0), Ok(BootReport::Online));
//!
//! kiosk.board_mut().buttons.press(Button::Two);
//! kiosk.tick(10);
//! assert_eq!(kiosk.session_state(), SessionState::SelectingSubtype);
//! ```

use core::fmt::Debug;

use log::{debug, info, warn};

use crate::config::{Config, SetupFailurePolicy};
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor, ConnectivityState};
use crate::deposit::Deposit;
use crate::dispatch::{UploadDispatcher, UploadOutcome};
use crate::error::{BootError, SetupFailure};
use crate::input::classify;
use crate::presenter::{DisplayPresenter, StatusText};
use crate::session::{SessionRequest, SessionState, SessionStateMachine};
use crate::traits::{
    Board, BoardParts, Button, ButtonInput, Buzzer, KioskDisplay, LoadCell, NetworkLink, Tone,
    WallClock, Watchdog,
};
use crate::weight::{WeightAcquirer, WeightSample};

/// How boot ended when the loop may start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootReport {
    /// Link, time and primary sink are up.
    Online,
    /// Setup failed under the degrade policy; the kiosk starts offline.
    Degraded(SetupFailure),
}

/// The whole kiosk: board plus control core.
pub struct Kiosk<B: Board> {
    board: B,
    core: Core,
}

/// Everything except the board, so board parts and core state can be
/// borrowed at the same time.
struct Core {
    config: Config,
    session: SessionStateMachine,
    deposit: Deposit,
    weight: WeightAcquirer,
    connectivity: ConnectivityMonitor,
    dispatcher: UploadDispatcher,
    presenter: DisplayPresenter,
    home_dirty: bool,
}

impl<B: Board> Kiosk<B> {
    /// Assembles a kiosk. Nothing touches the hardware until [`boot`](Self::boot).
    pub fn new(board: B, config: Config, dispatcher: UploadDispatcher) -> Self {
        let core = Core {
            session: SessionStateMachine::new(config.timing.status_duration_ms),
            deposit: Deposit::EMPTY,
            weight: WeightAcquirer::new(&config.scale),
            connectivity: ConnectivityMonitor::degraded(&config.network, &config.timing, false, 0),
            presenter: DisplayPresenter::new(config.display.locale, &config.timing),
            dispatcher,
            home_dirty: true,
            config,
        };
        Self { board, core }
    }

    /// Runs the startup sequence: tare, link, time sync, sink connect.
    ///
    /// A tare timeout is always fatal. Network failures either halt or
    /// degrade to offline mode depending on
    /// [`SetupFailurePolicy`]. The matching boot screen is left on the
    /// display; the first [`tick`](Self::tick) replaces it with the home
    /// screen.
    pub fn boot(&mut self, now_ms: u64) -> Result<BootReport, BootError> {
        let parts = self.board.parts();
        self.core.boot(now_ms, parts)
    }

    /// One cooperative loop iteration.
    pub fn tick(&mut self, now_ms: u64) {
        let parts = self.board.parts();
        self.core.tick(now_ms, parts);
    }

    /// Loop body after a fatal boot error: keep the watchdog fed and let
    /// the error tone run out.
    pub fn tick_halted(&mut self, now_ms: u64) {
        let parts = self.board.parts();
        parts.watchdog.feed();
        parts.buzzer.update(now_ms);
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        self.core.session.state()
    }

    /// Outcome of the most recent commit.
    pub fn last_outcome(&self) -> Option<&UploadOutcome> {
        self.core.session.last_outcome()
    }

    /// Current deposit.
    pub fn deposit(&self) -> Deposit {
        self.core.deposit
    }

    /// Latest smoothed weight.
    pub fn weight(&self) -> WeightSample {
        self.core.weight.current()
    }

    /// Connectivity snapshot.
    pub fn connectivity(&self) -> ConnectivityState {
        self.core.connectivity.state()
    }

    /// Configuration the kiosk was built with.
    pub fn config(&self) -> &Config {
        &self.core.config
    }

    /// The upload dispatcher.
    pub fn dispatcher(&self) -> &UploadDispatcher {
        &self.core.dispatcher
    }

    /// Shared access to the board.
    pub fn board(&self) -> &B {
        &self.board
    }

    /// Mutable access to the board (test injection, diagnostics).
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }
}

impl Core {
    // ========================================================================
    // Boot
    // ========================================================================

    fn boot<B: Board + ?Sized>(
        &mut self,
        now_ms: u64,
        parts: BoardParts<'_, B>,
    ) -> Result<BootReport, BootError> {
        if let Err(e) = parts.display.init() {
            warn!("display init failed: {:?}", e);
        }

        parts.watchdog.feed();
        if !parts.scale.tare(self.config.scale.tare_timeout_ms) {
            warn!("load cell tare timed out");
            shown(self.presenter.show_calibration_error(parts.display));
            Tone::ERROR.play(parts.buzzer);
            return Err(BootError::Calibration);
        }
        info!("load cell tared");

        match self.setup_network(parts.link, parts.wall_clock, parts.watchdog) {
            Ok(()) => {
                info!("setup complete, kiosk online");
                self.connectivity =
                    ConnectivityMonitor::online(&self.config.network, &self.config.timing, now_ms);
                shown(self.presenter.show_setup_ok(parts.display));
                self.home_dirty = true;
                Ok(BootReport::Online)
            }
            Err(failure) => {
                Tone::ERROR.play(parts.buzzer);
                match self.config.network.setup_failure_policy {
                    SetupFailurePolicy::Halt => {
                        warn!("setup failed ({}), halting", failure);
                        shown(self.presenter.show_setup_failed(parts.display, failure));
                        Err(BootError::Setup(failure))
                    }
                    SetupFailurePolicy::Degrade => {
                        warn!("setup failed ({}), starting in offline mode", failure);
                        self.connectivity = ConnectivityMonitor::degraded(
                            &self.config.network,
                            &self.config.timing,
                            parts.link.is_up(),
                            now_ms,
                        );
                        shown(self.presenter.show_degraded(parts.display, failure));
                        self.home_dirty = true;
                        Ok(BootReport::Degraded(failure))
                    }
                }
            }
        }
    }

    fn setup_network<L, C, D>(
        &mut self,
        link: &mut L,
        clock: &mut C,
        watchdog: &mut D,
    ) -> Result<(), SetupFailure>
    where
        L: NetworkLink + ?Sized,
        C: WallClock + ?Sized,
        D: Watchdog + ?Sized,
    {
        let network = &self.config.network;

        watchdog.feed();
        if !link.connect(network.link_connect_timeout_ms) {
            return Err(SetupFailure::WiFi);
        }

        watchdog.feed();
        if !clock.sync(network.time_sync_timeout_ms) {
            return Err(SetupFailure::TimeSync);
        }

        self.dispatcher
            .connect_all(watchdog)
            .map_err(|_| SetupFailure::Auth)
    }

    // ========================================================================
    // Loop
    // ========================================================================

    fn tick<B: Board + ?Sized>(&mut self, now_ms: u64, parts: BoardParts<'_, B>) {
        parts.watchdog.feed();
        parts.buzzer.update(now_ms);
        parts.buttons.poll();

        if let Some(event) = self.connectivity.tick(
            now_ms,
            parts.link,
            parts.probe,
            parts.wall_clock,
            parts.watchdog,
        ) {
            match event {
                ConnectivityEvent::WentOffline => info!("offline mode"),
                ConnectivityEvent::CameOnline { clock_synced } => {
                    info!("back online (clock synced: {})", clock_synced)
                }
            }
        }
        let online = self.connectivity.state().is_online();
        self.dispatcher.maintain(now_ms, online);

        self.weight.poll(now_ms, parts.scale);

        if self.session.tick(now_ms) {
            self.home_dirty = true;
        }
        while let Some(button) = parts.buttons.next_press() {
            self.handle_button(button, now_ms, parts.display, parts.buzzer, parts.wall_clock, parts.watchdog);
        }

        self.refresh_display(now_ms, parts.display, parts.link);
    }

    fn handle_button<Di, Z, C, D>(
        &mut self,
        button: Button,
        now_ms: u64,
        display: &mut Di,
        buzzer: &mut Z,
        clock: &mut C,
        watchdog: &mut D,
    ) where
        Di: KioskDisplay + ?Sized,
        Z: Buzzer + ?Sized,
        C: WallClock + ?Sized,
        D: Watchdog + ?Sized,
    {
        let state = self.session.state();
        let c = classify(button, state, &self.deposit);
        if c.is_ignored(&self.deposit) {
            debug!("ignored {:?} in {:?}", button, state);
            return;
        }

        if let Some(tone) = c.tone {
            tone.play(buzzer);
        }
        if c.deposit != self.deposit {
            debug!("deposit {} -> {}", self.deposit, c.deposit);
            self.deposit = c.deposit;
            self.home_dirty = true;
        }

        match c.request {
            Some(SessionRequest::EnterSubtypeMenu) => {
                if self.session.apply(SessionRequest::EnterSubtypeMenu) {
                    shown(self.presenter.show_subtype_menu(display));
                }
            }
            Some(SessionRequest::LeaveSubtypeMenu) => {
                if self.session.apply(SessionRequest::LeaveSubtypeMenu) {
                    self.home_dirty = true;
                }
            }
            Some(SessionRequest::Commit) => self.commit(now_ms, display, clock, watchdog),
            None => {}
        }
    }

    fn commit<Di, C, D>(&mut self, now_ms: u64, display: &mut Di, clock: &mut C, watchdog: &mut D)
    where
        Di: KioskDisplay + ?Sized,
        C: WallClock + ?Sized,
        D: Watchdog + ?Sized,
    {
        if !self.session.begin_commit() {
            return;
        }

        let connectivity = self.connectivity.state();
        if !self.deposit.is_empty() && connectivity.is_online() {
            shown(self.presenter.show_status(display, StatusText::Sending));
        }

        let outcome = self.dispatcher.commit(
            &mut self.deposit,
            self.weight.current(),
            &connectivity,
            &*clock,
            watchdog,
        );
        info!("commit outcome: {:?}", outcome);

        shown(
            self.presenter
                .show_status(display, StatusText::for_outcome(&outcome)),
        );
        self.session.finish_commit(outcome, now_ms);
    }

    fn refresh_display<Di, L>(&mut self, now_ms: u64, display: &mut Di, link: &mut L)
    where
        Di: KioskDisplay + ?Sized,
        L: NetworkLink + ?Sized,
    {
        if self.session.state() != SessionState::Idle {
            return;
        }

        if self.home_dirty {
            shown(self.presenter.show_home(display, &self.deposit));
            self.home_dirty = false;
        }

        let kg = self.weight.current().kg;
        shown(self.presenter.refresh_weight(display, now_ms, kg));

        let connectivity = self.connectivity.state();
        shown(
            self.presenter
                .refresh_indicators(display, now_ms, &connectivity, link.rssi()),
        );
    }
}

/// Display failures are never fatal; log and keep going.
fn shown<T, E: Debug>(result: Result<T, E>) {
    if let Err(e) = result {
        warn!("display error: {:?}", e);
    }
}

// `Kiosk` is generic over the board, which is rarely `Debug`.
impl<B: Board> Debug for Kiosk<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kiosk")
            .field("state", &self.core.session.state())
            .field("deposit", &self.core.deposit)
            .field("weight", &self.core.weight.current())
            .field("connectivity", &self.core.connectivity.state())
            .field("dispatcher", &self.core.dispatcher)
            .finish()
    }
}
