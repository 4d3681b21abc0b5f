//! # ecoscale
//!
//! Control core of a waste-sorting kiosk: a load-cell scale with four
//! buttons, a small display and a buzzer that weighs a deposit, lets the
//! operator classify it and uploads the record to one or more backends.
//!
//! ## Features
//!
//! - **Weight acquisition**: Non-blocking load-cell polling with noise floor and smoothing
//! - **Classification**: Two-level button menu (organic, inorganic subtypes, residual)
//! - **Session state machine**: Idle, subtype menu, sending, timed status screen
//! - **Connectivity monitor**: Link checks, reachability probe, offline mode and recovery
//! - **Upload dispatcher**: Ordered sinks (form POST, document store, MQTT), primary decides
//! - **Watchdog discipline**: Fed every iteration and before every blocking call
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and network abstractions
//! - `weight`, `input`, `session`, `connectivity` - Pure control logic
//! - `dispatch`, `sinks`, `messages` - Commit handling and wire formats
//! - `presenter` - What the screen shows
//! - `kiosk` - The owned context and the cooperative loop
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use ecoscale::{
//!     hal::{MockBoard, MockSink},
//!     traits::Button,
//!     Config, Kiosk, SessionState, UploadDispatcher, UploadOutcome,
//! };
//!
//! let dispatcher = UploadDispatcher::new("FSM").with_sink(Box::new(MockSink::new("db")));
//! let mut kiosk = Kiosk::new(MockBoard::new(), Config::default(), dispatcher);
//! kiosk.boot(0).unwrap();
//!
//! // Classify as organic, then commit.
//! kiosk.board_mut().buttons.press(Button::One);
//! kiosk.tick(20);
//! kiosk.board_mut().buttons.press(Button::Commit);
//! kiosk.tick(40);
//!
//! assert_eq!(kiosk.session_state(), SessionState::ShowingStatus);
//! assert_eq!(kiosk.last_outcome(), Some(&UploadOutcome::Success));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Connectivity monitor: link checks, reachability probe, offline mode.
pub mod connectivity;
/// Deposit categories and subcategories.
pub mod deposit;
/// Commit handling, records and the sink trait.
pub mod dispatch;
/// Error types.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Button classification rules.
pub mod input;
/// The kiosk context and its cooperative loop.
pub mod kiosk;
/// Wire payloads for the upload sinks (serde-json-core based).
pub mod messages;
/// Screen logic.
pub mod presenter;
/// Session state machine.
pub mod session;
/// Concrete upload sinks.
pub mod sinks;
/// Core traits for hardware and network abstraction.
pub mod traits;
/// Load-cell sampling and smoothing.
pub mod weight;

/// Desktop network services (feature-gated).
#[cfg(feature = "mqtt")]
pub mod services;

// Re-exports for convenience
pub use config::{
    Config, DisplayConfig, FirestoreConfig, HttpSinkConfig, Locale, MqttConfig, NetworkConfig,
    ScaleConfig, SetupFailurePolicy, SiteConfig, TimingConfig, WifiConfig,
};
pub use connectivity::{ConnectivityEvent, ConnectivityMonitor, ConnectivityState};
pub use deposit::{Category, Deposit, Subcategory};
pub use dispatch::{DepositRecord, RejectReason, Sink, UploadDispatcher, UploadOutcome};
pub use error::{BootError, ConfigError, SetupFailure, SinkError};
pub use input::{classify, Classification};
pub use kiosk::{BootReport, Kiosk};
pub use presenter::{DisplayPresenter, StatusText};
pub use session::{SessionRequest, SessionState, SessionStateMachine};
pub use sinks::{FirestoreSink, FormPostSink, MqttSink};
pub use traits::{
    // Hardware
    Board,
    BoardParts,
    Button,
    ButtonInput,
    Buzzer,
    Clock,
    LoadCell,
    Tone,
    Watchdog,
    // Display
    Icon,
    KioskDisplay,
    // Network
    HealthProbe,
    HttpMethod,
    HttpRequest,
    HttpResponse,
    HttpTransport,
    MqttClient,
    NetworkLink,
    WallClock,
};
pub use weight::{WeightAcquirer, WeightSample};
