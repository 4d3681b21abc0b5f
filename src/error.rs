//! Error types shared across the kiosk core.
//!
//! Recoverable failures (sink errors) are converted into an
//! [`UploadOutcome`](crate::dispatch::UploadOutcome) at the dispatcher
//! boundary and never escape the control loop. Only [`BootError`] can end
//! normal operation.

use alloc::string::String;
use core::fmt;

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

/// Delivery failure reported by a [`Sink`](crate::dispatch::Sink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink has no session with its backend (no token, broker down).
    NotConnected,
    /// The transport gave up waiting for the backend.
    Timeout,
    /// Lower-level transport error, with its description.
    Transport(String),
    /// The backend answered with a non-success status code.
    Status(u16),
    /// The record could not be serialized into the wire format.
    Encode,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Timeout => write!(f, "timed out"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Status(code) => write!(f, "backend returned status {code}"),
            Self::Encode => write!(f, "payload encoding failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SinkError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Configuration rejected by [`Config::validate`](crate::config::Config::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A blocking call may outlast half of the watchdog period.
    TimeoutExceedsWatchdog {
        /// Which timeout is too long.
        setting: &'static str,
        /// Its value in milliseconds.
        timeout_ms: u32,
        /// The largest allowed value in milliseconds.
        limit_ms: u32,
    },
    /// Calibration factor is zero, negative or not finite.
    InvalidCalibration,
    /// A timer interval is zero.
    ZeroInterval(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeoutExceedsWatchdog {
                setting,
                timeout_ms,
                limit_ms,
            } => write!(
                f,
                "{setting} of {timeout_ms} ms exceeds watchdog margin ({limit_ms} ms)"
            ),
            Self::InvalidCalibration => write!(f, "calibration factor must be positive"),
            Self::ZeroInterval(name) => write!(f, "{name} must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Boot errors
// ---------------------------------------------------------------------------

/// Which part of network setup failed during boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupFailure {
    /// The link never came up.
    WiFi,
    /// Time synchronisation timed out.
    TimeSync,
    /// The primary sink refused to connect (sign-up, broker session).
    Auth,
}

impl SetupFailure {
    /// Short operator-facing reason, as shown under the setup banner.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::WiFi => "WiFi Gagal!",
            Self::TimeSync => "NTP Gagal!",
            Self::Auth => "Auth Gagal!",
        }
    }
}

impl fmt::Display for SetupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WiFi => write!(f, "WiFi connection failed"),
            Self::TimeSync => write!(f, "time sync failed"),
            Self::Auth => write!(f, "sink authentication failed"),
        }
    }
}

/// Startup failure that prevents the control loop from running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// The load cell did not answer the tare request. No recovery.
    Calibration,
    /// Network setup failed under the halt policy.
    Setup(SetupFailure),
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calibration => write!(f, "load cell calibration failed"),
            Self::Setup(e) => write!(f, "setup: {e}"),
        }
    }
}

impl From<SetupFailure> for BootError {
    fn from(e: SetupFailure) -> Self {
        Self::Setup(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BootError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn sink_error_display() {
        assert_eq!(SinkError::Status(500).to_string(), "backend returned status 500");
        assert_eq!(
            SinkError::Transport("dns".into()).to_string(),
            "transport: dns"
        );
    }

    #[test]
    fn setup_failure_reasons_are_operator_strings() {
        assert_eq!(SetupFailure::WiFi.reason(), "WiFi Gagal!");
        assert_eq!(SetupFailure::TimeSync.reason(), "NTP Gagal!");
        assert_eq!(SetupFailure::Auth.reason(), "Auth Gagal!");
    }

    #[test]
    fn boot_error_from_setup() {
        let err: BootError = SetupFailure::Auth.into();
        assert_eq!(err, BootError::Setup(SetupFailure::Auth));
        assert_eq!(err.to_string(), "setup: sink authentication failed");
    }

    #[test]
    fn config_error_display_names_setting() {
        let err = ConfigError::TimeoutExceedsWatchdog {
            setting: "http timeout",
            timeout_ms: 40_000,
            limit_ms: 30_000,
        };
        assert!(err.to_string().contains("http timeout"));
    }
}
