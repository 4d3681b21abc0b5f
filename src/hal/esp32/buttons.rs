//! Four active-low push buttons with software debounce.
//!
//! # Wiring
//!
//! | Button | GPIO |
//! |--------|------|
//! | 1 | 27 |
//! | 2 | 26 |
//! | 3 | 25 |
//! | Commit | 33 |
//!
//! Each button shorts its pin to GND; internal pull-ups are enabled.

use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use heapless::Deque;

use crate::traits::{Button, ButtonInput, Clock};

use super::Esp32Clock;

/// A level must be stable this long before it counts.
const DEBOUNCE_MS: u64 = 30;

/// Unread presses kept before new ones are dropped.
const QUEUE_LEN: usize = 8;

struct Debounced<'d> {
    pin: PinDriver<'d, AnyIOPin, Input>,
    stable_pressed: bool,
    last_raw: bool,
    changed_at_ms: u64,
}

impl Debounced<'_> {
    /// Returns true on a debounced press edge.
    fn sample(&mut self, now_ms: u64) -> bool {
        let raw = self.pin.is_low();
        if raw != self.last_raw {
            self.last_raw = raw;
            self.changed_at_ms = now_ms;
            return false;
        }
        if raw == self.stable_pressed || now_ms.saturating_sub(self.changed_at_ms) < DEBOUNCE_MS {
            return false;
        }
        self.stable_pressed = raw;
        raw
    }
}

/// Kiosk buttons.
///
/// Call [`poll`](ButtonInput::poll) every loop iteration; press edges are
/// queued in order and drained with [`next_press`](ButtonInput::next_press).
pub struct Esp32Buttons<'d> {
    pins: [Debounced<'d>; 4],
    queue: Deque<Button, QUEUE_LEN>,
    clock: Esp32Clock,
}

impl<'d> Esp32Buttons<'d> {
    /// Takes the pins in wiring order: one, two, three, commit.
    pub fn new(pins: [AnyIOPin; 4]) -> Result<Self, esp_idf_hal::sys::EspError> {
        let [a, b, c, d] = pins;
        Ok(Self {
            pins: [
                Self::debounced(a)?,
                Self::debounced(b)?,
                Self::debounced(c)?,
                Self::debounced(d)?,
            ],
            queue: Deque::new(),
            clock: Esp32Clock::new(),
        })
    }

    fn debounced(pin: AnyIOPin) -> Result<Debounced<'d>, esp_idf_hal::sys::EspError> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        let pressed = pin.is_low();
        Ok(Debounced {
            pin,
            stable_pressed: pressed,
            last_raw: pressed,
            changed_at_ms: 0,
        })
    }
}

impl ButtonInput for Esp32Buttons<'_> {
    fn poll(&mut self) {
        let now = self.clock.now_ms();
        for (index, pin) in self.pins.iter_mut().enumerate() {
            if !pin.sample(now) {
                continue;
            }
            if let Some(button) = Button::from_index(index) {
                if self.queue.push_back(button).is_err() {
                    log::warn!("button queue full, dropped {:?}", button);
                }
            }
        }
    }

    fn next_press(&mut self) -> Option<Button> {
        self.queue.pop_front()
    }
}
