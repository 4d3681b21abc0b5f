//! Board bundle: every collaborator the kiosk drives, behind one type.
//!
//! A [`Board`] groups the hardware and network services of one physical
//! kiosk so that [`Kiosk`](crate::kiosk::Kiosk) needs a single type
//! parameter. [`Board::parts`] hands out disjoint mutable borrows, letting
//! the control loop hold the link, probe and watchdog at the same time.

use super::{
    ButtonInput, Buzzer, HealthProbe, KioskDisplay, LoadCell, NetworkLink, WallClock, Watchdog,
};

/// Simultaneous mutable access to all board peripherals.
pub struct BoardParts<'a, B: Board + ?Sized> {
    /// Load-cell ADC.
    pub scale: &'a mut B::Scale,
    /// Debounced kiosk buttons.
    pub buttons: &'a mut B::Buttons,
    /// Character display.
    pub display: &'a mut B::Display,
    /// Feedback buzzer.
    pub buzzer: &'a mut B::Buzzer,
    /// WiFi (or other) link.
    pub link: &'a mut B::Link,
    /// Reachability probe.
    pub probe: &'a mut B::Probe,
    /// Network-synchronised wall clock.
    pub wall_clock: &'a mut B::WallClock,
    /// Hardware watchdog.
    pub watchdog: &'a mut B::Watchdog,
}

/// One complete kiosk: hardware plus network services.
///
/// # Example
///
/// ```rust
/// use ecoscale::hal::MockBoard;
/// use ecoscale::traits::{Board, Watchdog};
///
/// let mut board = MockBoard::new();
/// let parts = board.parts();
/// parts.watchdog.feed();
/// assert_eq!(board.watchdog.feeds, 1);
/// ```
pub trait Board {
    /// Load-cell driver.
    type Scale: LoadCell;
    /// Button input.
    type Buttons: ButtonInput;
    /// Display.
    type Display: KioskDisplay;
    /// Buzzer.
    type Buzzer: Buzzer;
    /// Network link.
    type Link: NetworkLink;
    /// Health probe.
    type Probe: HealthProbe;
    /// Wall clock.
    type WallClock: WallClock;
    /// Watchdog.
    type Watchdog: Watchdog;

    /// Splits the board into independently borrowable parts.
    fn parts(&mut self) -> BoardParts<'_, Self>;
}
