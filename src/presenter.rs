//! Decides what the kiosk screen shows.
//!
//! The presenter turns session, deposit, weight and connectivity into rows
//! of text, a big weight number and a corner icon. Drawing is left to the
//! [`KioskDisplay`] implementation.
//!
//! # Screen Layout
//!
//! ```text
//! row 0  Jenis: Botol          <- header, or status/error text
//! row 1  [ 12.34 ]          kg <- big weight readout
//! row 2  [       ]
//! row 3  ◌                 -67 <- corner icon + RSSI / "OFF"
//! ```

use core::fmt::Write;

use heapless::String as HString;

use crate::config::{Locale, TimingConfig};
use crate::connectivity::ConnectivityState;
use crate::deposit::Deposit;
use crate::dispatch::{RejectReason, UploadOutcome};
use crate::error::SetupFailure;
use crate::traits::{Icon, KioskDisplay, DISPLAY_COLS};

/// Capacity of one formatted row.
const LINE_CAP: usize = 32;

type Line = HString<LINE_CAP>;

/// Row of the category header and status messages.
pub const HEADER_ROW: u8 = 0;
/// Row of the connectivity indicators.
pub const STATUS_BAR_ROW: u8 = 3;
/// Column where the RSSI text starts.
pub const RSSI_COLUMN: u8 = 17;

/// Weakest RSSI the status bar can show in its three columns.
pub const MIN_SHOWN_RSSI: i8 = -99;

/// Operator-facing status messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusText {
    /// Commit in progress.
    Sending,
    /// Primary sink accepted the record.
    Success,
    /// Delivery failed.
    Failed,
    /// Commit without a category.
    SelectCategory,
    /// Commit refused in offline mode.
    Offline,
    /// Commit refused because time was never synchronised.
    ClockUnsynced,
}

impl StatusText {
    /// Maps a commit outcome to the message shown for it.
    pub fn for_outcome(outcome: &UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Success => Self::Success,
            UploadOutcome::TransientFailure(_) => Self::Failed,
            UploadOutcome::Rejected(RejectReason::NoCategory) => Self::SelectCategory,
            UploadOutcome::Rejected(RejectReason::Offline) => Self::Offline,
            UploadOutcome::Rejected(RejectReason::ClockUnsynced) => Self::ClockUnsynced,
            UploadOutcome::Rejected(RejectReason::NoSinks) => Self::Failed,
        }
    }

    /// Text in the given locale (at most 20 columns).
    pub const fn text(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Indonesian => match self {
                Self::Sending => "Status: Mengirim...",
                Self::Success => "Status: Sukses!",
                Self::Failed => "Status: Gagal!",
                Self::SelectCategory => "Error: Pilih Jenis!",
                Self::Offline => "Gagal: Offline!",
                Self::ClockUnsynced => "Gagal: Waktu NTP!",
            },
            Locale::English => match self {
                Self::Sending => "Status: Sending...",
                Self::Success => "Status: Success!",
                Self::Failed => "Status: Failed!",
                Self::SelectCategory => "Error: Pick a Type!",
                Self::Offline => "Failed: Offline!",
                Self::ClockUnsynced => "Failed: No Clock!",
            },
        }
    }
}

/// Screen logic with its redraw timers.
#[derive(Clone, Debug)]
pub struct DisplayPresenter {
    locale: Locale,
    lcd_refresh_ms: u32,
    redraw_threshold_kg: f32,
    indicator_refresh_ms: u32,
    last_weight_drawn: Option<f32>,
    last_weight_refresh_ms: Option<u64>,
    last_indicator_ms: Option<u64>,
    blink: bool,
}

impl DisplayPresenter {
    /// Creates a presenter. The first refresh of each kind draws at once.
    pub fn new(locale: Locale, timing: &TimingConfig) -> Self {
        Self {
            locale,
            lcd_refresh_ms: timing.lcd_refresh_ms,
            redraw_threshold_kg: timing.redraw_threshold_kg,
            indicator_refresh_ms: timing.indicator_refresh_ms,
            last_weight_drawn: None,
            last_weight_refresh_ms: None,
            last_indicator_ms: None,
            blink: false,
        }
    }

    /// Configured locale.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Draws the home screen (category header) and forces the next weight
    /// refresh to redraw.
    pub fn show_home<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        deposit: &Deposit,
    ) -> Result<(), D::Error> {
        display.clear()?;
        let mut header = Line::new();
        let _ = write!(header, "Jenis: {}", deposit.label());
        display.show_line(HEADER_ROW, &header)?;
        self.force_redraw();
        Ok(())
    }

    /// Draws the inorganic subtype menu.
    pub fn show_subtype_menu<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
    ) -> Result<(), D::Error> {
        display.clear()?;
        display.show_line(0, "  Pilih Sub-jenis:")?;
        display.show_line(1, " 1.Umum     2.Botol")?;
        display.show_line(2, " 3.Kertas")?;
        Ok(())
    }

    /// Writes a status message over the header row.
    pub fn show_status<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        status: StatusText,
    ) -> Result<(), D::Error> {
        display.show_line(HEADER_ROW, status.text(self.locale))
    }

    /// Redraws the weight readout if the refresh interval elapsed and the
    /// value moved by more than the threshold (or a redraw was forced).
    ///
    /// Returns true if the readout was drawn.
    pub fn refresh_weight<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        now_ms: u64,
        weight_kg: f32,
    ) -> Result<bool, D::Error> {
        if !due(self.last_weight_refresh_ms, now_ms, self.lcd_refresh_ms) {
            return Ok(false);
        }
        self.last_weight_refresh_ms = Some(now_ms);

        let changed = match self.last_weight_drawn {
            Some(last) => {
                let delta = weight_kg - last;
                delta > self.redraw_threshold_kg || delta < -self.redraw_threshold_kg
            }
            None => true,
        };
        if !changed {
            return Ok(false);
        }
        display.show_big_number(weight_kg)?;
        self.last_weight_drawn = Some(weight_kg);
        Ok(true)
    }

    /// Redraws the status bar if the indicator interval elapsed.
    ///
    /// Shows RSSI when the link is up and the kiosk is online, "OFF"
    /// otherwise. The corner icon is the no-internet glyph while offline,
    /// blank after a passing health probe, and a blinking dash otherwise.
    pub fn refresh_indicators<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        now_ms: u64,
        connectivity: &ConnectivityState,
        rssi: Option<i8>,
    ) -> Result<bool, D::Error> {
        if !due(self.last_indicator_ms, now_ms, self.indicator_refresh_ms) {
            return Ok(false);
        }
        self.last_indicator_ms = Some(now_ms);
        self.blink = !self.blink;

        let mut bar = Line::new();
        for _ in 0..RSSI_COLUMN {
            let _ = bar.push(' ');
        }
        match rssi {
            Some(dbm) if connectivity.link_up && connectivity.is_online() => {
                let _ = write!(bar, "{:>3}", dbm.max(MIN_SHOWN_RSSI));
            }
            _ => {
                let _ = bar.push_str("OFF");
            }
        }
        truncate_to_cols(&mut bar);
        display.show_line(STATUS_BAR_ROW, &bar)?;

        display.show_icon(self.corner_icon(connectivity))?;
        Ok(true)
    }

    /// Icon for the current connectivity and blink phase.
    pub fn corner_icon(&self, connectivity: &ConnectivityState) -> Icon {
        if connectivity.offline {
            Icon::NoInternet
        } else if connectivity.reachable {
            Icon::Blank
        } else if self.blink {
            Icon::Dash
        } else {
            Icon::Blank
        }
    }

    /// Forces the next weight refresh to draw regardless of change.
    pub fn force_redraw(&mut self) {
        self.last_weight_drawn = None;
    }

    // ------------------------------------------------------------------------
    // Boot screens
    // ------------------------------------------------------------------------

    /// Fatal load-cell failure.
    pub fn show_calibration_error<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
    ) -> Result<(), D::Error> {
        display.clear()?;
        display.show_line(0, "HX711 Error!")
    }

    /// Network setup completed.
    pub fn show_setup_ok<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
    ) -> Result<(), D::Error> {
        display.clear()?;
        display.show_line(1, "Setup Sukses")?;
        display.show_line(2, "System Ready")
    }

    /// Network setup failed and the kiosk is halting.
    pub fn show_setup_failed<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        failure: SetupFailure,
    ) -> Result<(), D::Error> {
        display.clear()?;
        display.show_line(1, "Setup Gagal:")?;
        display.show_line(2, failure.reason())
    }

    /// Network setup failed and the kiosk continues offline.
    pub fn show_degraded<D: KioskDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        failure: SetupFailure,
    ) -> Result<(), D::Error> {
        display.clear()?;
        display.show_line(1, "Mode Offline")?;
        display.show_line(2, failure.reason())
    }
}

fn due(last: Option<u64>, now_ms: u64, interval_ms: u32) -> bool {
    match last {
        Some(t) => now_ms.saturating_sub(t) >= u64::from(interval_ms),
        None => true,
    }
}

fn truncate_to_cols(line: &mut Line) {
    let cols = DISPLAY_COLS as usize;
    if line.len() > cols {
        line.truncate(cols);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit::Subcategory;
    use crate::error::SinkError;
    use crate::hal::MockDisplay;

    fn presenter() -> DisplayPresenter {
        DisplayPresenter::new(Locale::Indonesian, &TimingConfig::default())
    }

    // ========================================================================
    // Screens
    // ========================================================================

    #[test]
    fn home_header_uses_label() {
        let mut p = presenter();
        let mut d = MockDisplay::new();
        p.show_home(&mut d, &Deposit::inorganic(Subcategory::General))
            .unwrap();
        assert_eq!(d.row(0), "Jenis: Anorganik");
    }

    #[test]
    fn subtype_menu_lines() {
        let mut p = presenter();
        let mut d = MockDisplay::new();
        p.show_subtype_menu(&mut d).unwrap();
        assert_eq!(d.row(0).trim(), "Pilih Sub-jenis:");
        assert_eq!(d.row(1), " 1.Umum     2.Botol");
        assert_eq!(d.row(2), " 3.Kertas");
    }

    #[test]
    fn status_texts_per_outcome() {
        let cases = [
            (UploadOutcome::Success, "Status: Sukses!"),
            (
                UploadOutcome::TransientFailure(SinkError::Timeout),
                "Status: Gagal!",
            ),
            (
                UploadOutcome::Rejected(RejectReason::NoCategory),
                "Error: Pilih Jenis!",
            ),
            (
                UploadOutcome::Rejected(RejectReason::Offline),
                "Gagal: Offline!",
            ),
        ];
        for (outcome, text) in cases {
            assert_eq!(StatusText::for_outcome(&outcome).text(Locale::Indonesian), text);
        }
        assert!(StatusText::Success.text(Locale::English).contains("Success"));
    }

    #[test]
    fn status_texts_fit_one_row() {
        let all = [
            StatusText::Sending,
            StatusText::Success,
            StatusText::Failed,
            StatusText::SelectCategory,
            StatusText::Offline,
            StatusText::ClockUnsynced,
        ];
        for locale in [Locale::Indonesian, Locale::English] {
            for s in all {
                assert!(s.text(locale).len() <= DISPLAY_COLS as usize, "{:?}", s);
            }
        }
    }

    // ========================================================================
    // Weight Readout
    // ========================================================================

    #[test]
    fn weight_redraw_respects_interval_and_threshold() {
        let mut p = presenter();
        let mut d = MockDisplay::new();

        assert!(p.refresh_weight(&mut d, 0, 1.0).unwrap());
        // Interval not elapsed.
        assert!(!p.refresh_weight(&mut d, 50, 5.0).unwrap());
        // Elapsed but change below threshold.
        assert!(!p.refresh_weight(&mut d, 100, 1.005).unwrap());
        // Elapsed and changed.
        assert!(p.refresh_weight(&mut d, 200, 1.5).unwrap());
        assert_eq!(d.big_numbers, vec![1.0, 1.5]);
    }

    #[test]
    fn forced_redraw_draws_unchanged_value() {
        let mut p = presenter();
        let mut d = MockDisplay::new();
        p.refresh_weight(&mut d, 0, 2.0).unwrap();
        p.show_home(&mut d, &Deposit::EMPTY).unwrap();
        assert!(p.refresh_weight(&mut d, 100, 2.0).unwrap());
    }

    // ========================================================================
    // Status Bar
    // ========================================================================

    #[test]
    fn rssi_shown_when_online() {
        let mut p = presenter();
        let mut d = MockDisplay::new();
        p.refresh_indicators(&mut d, 0, &ConnectivityState::ONLINE, Some(-67))
            .unwrap();
        assert_eq!(d.row(3), "                 -67");
        assert_eq!(d.icon, Some(Icon::Blank));
    }

    #[test]
    fn very_weak_rssi_is_clamped_to_fit() {
        let mut p = presenter();
        let mut d = MockDisplay::new();
        p.refresh_indicators(&mut d, 0, &ConnectivityState::ONLINE, Some(-100))
            .unwrap();
        assert_eq!(d.row(3), "                 -99");
    }

    #[test]
    fn off_and_no_internet_when_offline() {
        let mut p = presenter();
        let mut d = MockDisplay::new();
        p.refresh_indicators(&mut d, 0, &ConnectivityState::OFFLINE, Some(-40))
            .unwrap();
        assert_eq!(d.row(3), "                 OFF");
        assert_eq!(d.icon, Some(Icon::NoInternet));
    }

    #[test]
    fn dash_blinks_while_unconfirmed() {
        let mut p = presenter();
        let mut d = MockDisplay::new();
        let conn = ConnectivityState {
            link_up: true,
            reachable: false,
            offline: false,
        };

        p.refresh_indicators(&mut d, 0, &conn, Some(-70)).unwrap();
        let first = d.icon;
        p.refresh_indicators(&mut d, 500, &conn, Some(-70)).unwrap();
        assert_eq!(d.icon, first);
        p.refresh_indicators(&mut d, 1000, &conn, Some(-70)).unwrap();
        assert_ne!(d.icon, first);

        let seen = [first, d.icon];
        assert!(seen.contains(&Some(Icon::Dash)));
        assert!(seen.contains(&Some(Icon::Blank)));
    }

    // ========================================================================
    // Boot Screens
    // ========================================================================

    #[test]
    fn boot_screens() {
        let mut p = presenter();
        let mut d = MockDisplay::new();

        p.show_setup_failed(&mut d, SetupFailure::WiFi).unwrap();
        assert_eq!(d.row(1), "Setup Gagal:");
        assert_eq!(d.row(2), "WiFi Gagal!");

        p.show_degraded(&mut d, SetupFailure::TimeSync).unwrap();
        assert_eq!(d.row(1), "Mode Offline");
        assert_eq!(d.row(2), "NTP Gagal!");

        p.show_calibration_error(&mut d).unwrap();
        assert_eq!(d.row(0), "HX711 Error!");
    }
}
