//! Trait definitions for hardware abstraction and network collaborators.
//!
//! This module defines the seams that allow ecoscale to:
//! - Run on the kiosk board (ESP32) and on the desktop with mocks
//! - Swap network transports without touching the control core
//!
//! # Submodules
//!
//! - `hardware`: Load cell, buttons, buzzer, clock, watchdog
//! - `network`: Link, health probe, wall clock, HTTP and MQTT clients
//! - `display`: Kiosk screen trait
//! - `board`: Bundle of all of the above for one kiosk
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`LoadCell`]: Raw ADC counts and startup tare
//! - [`ButtonInput`]: Press edges for the four kiosk buttons
//! - [`Watchdog`]: Fed every loop iteration and before blocking calls
//! - [`Clock`]: Time source for `no_std` environments

pub mod board;
pub mod display;
pub mod hardware;
pub mod network;

pub use board::*;
pub use display::*;
pub use hardware::*;
pub use network::*;
