//! Link and reachability tracking.
//!
//! The [`ConnectivityMonitor`] runs two independent timers from the control
//! loop:
//!
//! - **Link check** (default 15 s): if the link is down, fire a reconnect and
//!   enter offline mode.
//! - **Health check** (default 10 s, only while the link is up): probe
//!   end-to-end reachability. A successful probe while offline is the only
//!   way back online, and it re-synchronises the wall clock.
//!
//! Link re-association alone never clears offline mode, so a marginal link
//! cannot flap the kiosk between modes.

use log::{debug, info, warn};

use crate::config::{NetworkConfig, TimingConfig};
use crate::traits::{HealthProbe, NetworkLink, WallClock, Watchdog};

/// Snapshot of connectivity as seen by the rest of the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectivityState {
    /// Radio association at the last link check.
    pub link_up: bool,
    /// Result of the last health probe.
    pub reachable: bool,
    /// Commits are rejected locally while set.
    pub offline: bool,
}

impl ConnectivityState {
    /// Fully online: link up, probe passed, not in offline mode.
    pub const ONLINE: ConnectivityState = ConnectivityState {
        link_up: true,
        reachable: true,
        offline: false,
    };

    /// Offline with no link.
    pub const OFFLINE: ConnectivityState = ConnectivityState {
        link_up: false,
        reachable: false,
        offline: true,
    };

    /// True when commits may be attempted.
    #[inline]
    pub fn is_online(&self) -> bool {
        !self.offline
    }
}

/// Notable transitions reported by [`ConnectivityMonitor::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The link dropped and the kiosk entered offline mode.
    WentOffline,
    /// A health probe succeeded after offline mode and the kiosk is back.
    CameOnline {
        /// Whether the follow-up time sync succeeded.
        clock_synced: bool,
    },
}

/// Periodic link and health bookkeeping.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    state: ConnectivityState,
    link_check_ms: u32,
    health_check_ms: u32,
    time_sync_timeout_ms: u32,
    health_failure_forces_offline: bool,
    last_link_check_ms: u64,
    last_health_check_ms: u64,
}

impl ConnectivityMonitor {
    /// Creates a monitor in the given initial state with both timers
    /// starting at `now_ms`.
    pub fn new(
        network: &NetworkConfig,
        timing: &TimingConfig,
        initial: ConnectivityState,
        now_ms: u64,
    ) -> Self {
        Self {
            state: initial,
            link_check_ms: timing.link_check_ms,
            health_check_ms: timing.health_check_ms,
            time_sync_timeout_ms: network.time_sync_timeout_ms,
            health_failure_forces_offline: network.health_failure_forces_offline,
            last_link_check_ms: now_ms,
            last_health_check_ms: now_ms,
        }
    }

    /// Monitor for a kiosk whose boot setup succeeded.
    pub fn online(network: &NetworkConfig, timing: &TimingConfig, now_ms: u64) -> Self {
        Self::new(network, timing, ConnectivityState::ONLINE, now_ms)
    }

    /// Monitor for a kiosk that booted in degraded (offline) mode.
    pub fn degraded(
        network: &NetworkConfig,
        timing: &TimingConfig,
        link_up: bool,
        now_ms: u64,
    ) -> Self {
        let initial = ConnectivityState {
            link_up,
            reachable: false,
            offline: true,
        };
        Self::new(network, timing, initial, now_ms)
    }

    /// Current connectivity snapshot.
    #[inline]
    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Runs whichever checks are due.
    ///
    /// The watchdog is fed right before each blocking call (probe, time
    /// sync). Returns the most significant transition, if any happened.
    pub fn tick<L, P, C, D>(
        &mut self,
        now_ms: u64,
        link: &mut L,
        probe: &mut P,
        clock: &mut C,
        watchdog: &mut D,
    ) -> Option<ConnectivityEvent>
    where
        L: NetworkLink + ?Sized,
        P: HealthProbe + ?Sized,
        C: WallClock + ?Sized,
        D: Watchdog + ?Sized,
    {
        let mut event = None;

        if elapsed(now_ms, self.last_link_check_ms) >= u64::from(self.link_check_ms) {
            self.last_link_check_ms = now_ms;
            event = self.check_link(link);
        }

        if elapsed(now_ms, self.last_health_check_ms) >= u64::from(self.health_check_ms) {
            self.last_health_check_ms = now_ms;
            if let Some(e) = self.check_health(link, probe, clock, watchdog) {
                event = Some(e);
            }
        }

        event
    }

    fn check_link<L: NetworkLink + ?Sized>(&mut self, link: &mut L) -> Option<ConnectivityEvent> {
        self.state.link_up = link.is_up();
        if self.state.link_up {
            return None;
        }

        warn!("link down, triggering reconnect");
        link.reconnect();
        self.state.reachable = false;

        if self.state.offline {
            return None;
        }
        self.state.offline = true;
        Some(ConnectivityEvent::WentOffline)
    }

    fn check_health<L, P, C, D>(
        &mut self,
        link: &mut L,
        probe: &mut P,
        clock: &mut C,
        watchdog: &mut D,
    ) -> Option<ConnectivityEvent>
    where
        L: NetworkLink + ?Sized,
        P: HealthProbe + ?Sized,
        C: WallClock + ?Sized,
        D: Watchdog + ?Sized,
    {
        if !link.is_up() {
            debug!("health check skipped, link down");
            return None;
        }
        self.state.link_up = true;

        watchdog.feed();
        let ok = probe.check();
        self.state.reachable = ok;

        if !ok {
            debug!("health probe failed");
            if self.health_failure_forces_offline && !self.state.offline {
                warn!("health probe failed, entering offline mode");
                self.state.offline = true;
                return Some(ConnectivityEvent::WentOffline);
            }
            return None;
        }

        if !self.state.offline {
            return None;
        }

        self.state.offline = false;
        watchdog.feed();
        let clock_synced = clock.sync(self.time_sync_timeout_ms);
        if clock_synced {
            info!("connectivity restored, clock re-synchronised");
        } else {
            warn!("connectivity restored but time sync failed");
        }
        Some(ConnectivityEvent::CameOnline { clock_synced })
    }
}

fn elapsed(now_ms: u64, since_ms: u64) -> u64 {
    now_ms.saturating_sub(since_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockLink, MockProbe, MockWallClock, MockWatchdog};

    struct Rig {
        link: MockLink,
        probe: MockProbe,
        clock: MockWallClock,
        watchdog: MockWatchdog,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                link: MockLink::up(),
                probe: MockProbe::new(true),
                clock: MockWallClock::synced(1_700_000_000),
                watchdog: MockWatchdog::default(),
            }
        }

        fn tick(&mut self, m: &mut ConnectivityMonitor, now: u64) -> Option<ConnectivityEvent> {
            m.tick(
                now,
                &mut self.link,
                &mut self.probe,
                &mut self.clock,
                &mut self.watchdog,
            )
        }
    }

    fn online(now: u64) -> ConnectivityMonitor {
        ConnectivityMonitor::online(&NetworkConfig::default(), &TimingConfig::default(), now)
    }

    // ========================================================================
    // Link Check
    // ========================================================================

    #[test]
    fn link_loss_goes_offline_and_reconnects() {
        let mut rig = Rig::new();
        let mut m = online(0);
        rig.link.up = false;

        assert_eq!(rig.tick(&mut m, 14_999), None);
        assert!(m.state().is_online());

        assert_eq!(rig.tick(&mut m, 15_000), Some(ConnectivityEvent::WentOffline));
        assert!(m.state().offline);
        assert!(!m.state().link_up);
        assert_eq!(rig.link.reconnects, 1);
    }

    #[test]
    fn reconnect_repeats_every_link_check_without_limit() {
        let mut rig = Rig::new();
        let mut m = online(0);
        rig.link.up = false;

        for n in 1..=5u64 {
            rig.tick(&mut m, n * 15_000);
        }
        assert_eq!(rig.link.reconnects, 5);
    }

    // ========================================================================
    // Health Check and Recovery
    // ========================================================================

    #[test]
    fn health_check_skipped_while_link_down() {
        let mut rig = Rig::new();
        let mut m = ConnectivityMonitor::degraded(
            &NetworkConfig::default(),
            &TimingConfig::default(),
            false,
            0,
        );
        rig.link.up = false;

        rig.tick(&mut m, 10_000);
        assert_eq!(rig.probe.checks, 0);
    }

    #[test]
    fn link_reassociation_alone_does_not_recover() {
        let mut rig = Rig::new();
        let mut m = online(0);

        rig.link.up = false;
        rig.tick(&mut m, 15_000);
        assert!(m.state().offline);

        // Link back, but the probe keeps failing.
        rig.link.up = true;
        rig.probe.result = false;
        rig.tick(&mut m, 20_000);
        rig.tick(&mut m, 30_000);
        assert!(m.state().link_up);
        assert!(m.state().offline);
    }

    #[test]
    fn successful_probe_after_offline_recovers_and_resyncs() {
        let mut rig = Rig::new();
        let mut m = online(0);

        rig.link.up = false;
        rig.tick(&mut m, 15_000);
        let syncs_before = rig.clock.syncs;

        rig.link.up = true;
        let event = rig.tick(&mut m, 25_000);
        assert_eq!(event, Some(ConnectivityEvent::CameOnline { clock_synced: true }));
        assert!(m.state().is_online());
        assert!(m.state().reachable);
        assert_eq!(rig.clock.syncs, syncs_before + 1);
    }

    #[test]
    fn probe_success_while_online_does_not_resync() {
        let mut rig = Rig::new();
        let mut m = online(0);

        assert_eq!(rig.tick(&mut m, 10_000), None);
        assert_eq!(rig.probe.checks, 1);
        assert_eq!(rig.clock.syncs, 0);
    }

    #[test]
    fn failed_probe_keeps_online_by_default() {
        let mut rig = Rig::new();
        let mut m = online(0);
        rig.probe.result = false;

        assert_eq!(rig.tick(&mut m, 10_000), None);
        assert!(m.state().is_online());
        assert!(!m.state().reachable);
    }

    #[test]
    fn failed_probe_can_force_offline() {
        let mut rig = Rig::new();
        let network = NetworkConfig::default().with_health_failure_forces_offline(true);
        let mut m = ConnectivityMonitor::online(&network, &TimingConfig::default(), 0);
        rig.probe.result = false;

        assert_eq!(rig.tick(&mut m, 10_000), Some(ConnectivityEvent::WentOffline));
        assert!(m.state().offline);
    }

    #[test]
    fn watchdog_fed_before_probe() {
        let mut rig = Rig::new();
        let mut m = online(0);
        rig.tick(&mut m, 10_000);
        assert_eq!(rig.watchdog.feeds, 1);
    }
}
