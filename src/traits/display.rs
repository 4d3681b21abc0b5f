//! Display abstraction for the kiosk screen.
//!
//! This module defines the [`KioskDisplay`] trait. The core decides what text
//! and values to show; implementations decide how to draw them (glyphs, fonts,
//! big-digit rendering).

/// Number of text rows the presenter lays out.
pub const DISPLAY_ROWS: u8 = 4;

/// Number of text columns per row.
pub const DISPLAY_COLS: u8 = 20;

/// Status icon drawn in the top-right corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icon {
    /// Empty corner (fully online).
    Blank,
    /// Crossed-out globe: kiosk is in offline mode.
    NoInternet,
    /// Single dash, blinked by the presenter while reachability is unconfirmed.
    Dash,
}

/// Display trait for the kiosk screen.
///
/// Rows are zero-based and `show_line` replaces the whole row. The weight
/// readout lives between the header and the status bar and is drawn with
/// [`show_big_number`](KioskDisplay::show_big_number).
///
/// # Example
///
/// ```ignore
/// use ecoscale::traits::{Icon, KioskDisplay};
///
/// struct SerialDisplay;
///
/// impl KioskDisplay for SerialDisplay {
///     type Error = ();
///
///     fn init(&mut self) -> Result<(), ()> { Ok(()) }
///     fn clear(&mut self) -> Result<(), ()> { Ok(()) }
///     fn show_line(&mut self, row: u8, text: &str) -> Result<(), ()> {
///         println!("[{}] {}", row, text);
///         Ok(())
///     }
///     fn show_big_number(&mut self, value: f32) -> Result<(), ()> {
///         println!("{:6.2} kg", value);
///         Ok(())
///     }
///     fn show_icon(&mut self, _icon: Icon) -> Result<(), ()> { Ok(()) }
/// }
/// ```
pub trait KioskDisplay {
    /// Error type for display operations.
    type Error: core::fmt::Debug;

    /// Initializes the display hardware.
    ///
    /// Called once at startup, before any other method.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Clears the whole display.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Replaces the contents of one text row.
    fn show_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error>;

    /// Draws the weight readout in large digits (two decimals).
    fn show_big_number(&mut self, value: f32) -> Result<(), Self::Error>;

    /// Draws the connectivity icon in the corner slot.
    fn show_icon(&mut self, icon: Icon) -> Result<(), Self::Error>;
}
