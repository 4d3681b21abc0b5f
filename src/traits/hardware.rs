//! Hardware abstraction traits for the load cell, buttons, buzzer, and timing.
//!
//! This module defines the local hardware interfaces that allow ecoscale to
//! run on the kiosk board (ESP32) and on the desktop with mocks.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`LoadCell`] | Raw load-cell samples and startup tare |
//! | [`ButtonInput`] | Debounced press edges for the four kiosk buttons |
//! | [`Buzzer`] | Audible operator feedback |
//! | [`Clock`] | Monotonic millisecond time source |
//! | [`Watchdog`] | Hardware watchdog servicing |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use ecoscale::traits::{Button, ButtonInput};
//! use ecoscale::hal::MockButtons;
//!
//! let mut buttons = MockButtons::new();
//! buttons.press(Button::Two);
//!
//! assert_eq!(buttons.next_press(), Some(Button::Two));
//! assert_eq!(buttons.next_press(), None);
//! ```

/// One of the four logical kiosk buttons.
///
/// Buttons one to three classify the deposit; the fourth is reserved for
/// committing and never classifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Button {
    /// Organic, or "General" while choosing an inorganic subtype.
    One,
    /// Inorganic (opens the subtype menu), or "Bottle" inside it.
    Two,
    /// Residual, or "Paper" while choosing an inorganic subtype.
    Three,
    /// Commit the current deposit.
    Commit,
}

impl Button {
    /// All buttons in wiring order.
    pub const ALL: [Button; 4] = [Button::One, Button::Two, Button::Three, Button::Commit];

    /// Maps a zero-based hardware index to a button.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecoscale::traits::Button;
    ///
    /// assert_eq!(Button::from_index(0), Some(Button::One));
    /// assert_eq!(Button::from_index(3), Some(Button::Commit));
    /// assert_eq!(Button::from_index(4), None);
    /// ```
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Button::One),
            1 => Some(Button::Two),
            2 => Some(Button::Three),
            3 => Some(Button::Commit),
            _ => None,
        }
    }

    /// Returns the zero-based hardware index of this button.
    #[inline]
    pub const fn index(&self) -> usize {
        match self {
            Button::One => 0,
            Button::Two => 1,
            Button::Three => 2,
            Button::Commit => 3,
        }
    }

    /// Returns true for the three classification buttons.
    #[inline]
    pub const fn is_classifier(&self) -> bool {
        !matches!(self, Button::Commit)
    }
}

/// Load-cell ADC driver.
///
/// Implement this trait for the amplifier/ADC in front of the load cell
/// (e.g. HX711). The core converts raw counts into kilograms itself, so
/// implementations should return the tared raw reading without scaling.
///
/// # Implementation Notes
///
/// - `poll_raw` must never block; return `None` when no conversion is ready
/// - `tare` may block up to `timeout_ms`; a timeout is a fatal startup fault
pub trait LoadCell {
    /// Returns a fresh tared raw reading if the ADC finished a conversion.
    fn poll_raw(&mut self) -> Option<f32>;

    /// Zeroes the scale against the current load.
    ///
    /// Returns `false` if the ADC did not respond within `timeout_ms`.
    fn tare(&mut self, timeout_ms: u32) -> bool;
}

/// Debounced button input.
///
/// Debouncing is the implementation's job. The core only consumes press
/// edges, one event per physical press.
pub trait ButtonInput {
    /// Samples the button pins. Call once per loop iteration.
    ///
    /// Default implementation does nothing, for inputs that are sampled
    /// elsewhere (interrupts, mocks).
    fn poll(&mut self) {}

    /// Returns the next pending press edge, oldest first.
    fn next_press(&mut self) -> Option<Button>;
}

/// Audible feedback device.
pub trait Buzzer {
    /// Starts a tone. Must not block for the tone duration.
    fn tone(&mut self, frequency_hz: u32, duration_ms: u32);

    /// Silences any tone whose duration has elapsed.
    ///
    /// Default implementation does nothing, for buzzers that time themselves.
    fn update(&mut self, _now_ms: u64) {}
}

/// A tone request, used for operator feedback patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tone {
    /// Frequency in hertz.
    pub frequency_hz: u32,
    /// Duration in milliseconds.
    pub duration_ms: u32,
}

impl Tone {
    /// Short click after a classification button.
    pub const CLICK: Tone = Tone::new(2500, 100);
    /// Commit button acknowledgement.
    pub const COMMIT: Tone = Tone::new(2000, 100);
    /// Long low tone for startup failures.
    pub const ERROR: Tone = Tone::new(500, 1000);

    /// Creates a tone.
    pub const fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    /// Plays this tone on a buzzer.
    pub fn play<Z: Buzzer + ?Sized>(&self, buzzer: &mut Z) {
        buzzer.tone(self.frequency_hz, self.duration_ms);
    }
}

/// Monotonic time source.
///
/// Provides milliseconds since an arbitrary epoch (usually boot). On desktop
/// this can wrap `std::time::Instant`; on ESP32 it reads the hardware timer.
///
/// # Example
///
/// ```rust
/// use ecoscale::traits::Clock;
/// use ecoscale::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

/// Hardware watchdog.
///
/// The control loop feeds it every iteration and immediately before any
/// blocking network call.
pub trait Watchdog {
    /// Resets the watchdog countdown.
    fn feed(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_index_round_trips_for_all_buttons() {
        for button in Button::ALL {
            assert_eq!(Button::from_index(button.index()), Some(button));
        }
    }

    #[test]
    fn commit_is_not_a_classifier() {
        assert!(Button::One.is_classifier());
        assert!(Button::Two.is_classifier());
        assert!(Button::Three.is_classifier());
        assert!(!Button::Commit.is_classifier());
    }

    struct RecordingBuzzer {
        tones: Vec<(u32, u32)>,
    }

    impl Buzzer for RecordingBuzzer {
        fn tone(&mut self, frequency_hz: u32, duration_ms: u32) {
            self.tones.push((frequency_hz, duration_ms));
        }
    }

    #[test]
    fn tone_play_forwards_to_buzzer() {
        let mut buzzer = RecordingBuzzer { tones: Vec::new() };
        Tone::CLICK.play(&mut buzzer);
        Tone::ERROR.play(&mut buzzer);

        assert_eq!(buzzer.tones, vec![(2500, 100), (500, 1000)]);
    }

    struct NoPollButtons(Option<Button>);

    impl ButtonInput for NoPollButtons {
        fn next_press(&mut self) -> Option<Button> {
            self.0.take()
        }
    }

    #[test]
    fn button_input_default_poll_is_noop() {
        let mut buttons = NoPollButtons(Some(Button::Three));
        buttons.poll();
        assert_eq!(buttons.next_press(), Some(Button::Three));
        assert_eq!(buttons.next_press(), None);
    }
}
