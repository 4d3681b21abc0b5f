//! Load-cell weight acquisition.
//!
//! [`WeightAcquirer`] turns raw ADC counts into kilograms, clamps offset
//! noise to zero and smooths the result with a two-slot moving average.
//! It is polled from the control loop and never blocks.
//!
//! # Example
//!
//! ```rust
//! use ecoscale::weight::WeightAcquirer;
//! use ecoscale::config::ScaleConfig;
//! use ecoscale::hal::MockLoadCell;
//!
//! let config = ScaleConfig::default().with_counts_per_kg(1000.0);
//! let mut acquirer = WeightAcquirer::new(&config);
//! let mut cell = MockLoadCell::new();
//!
//! cell.push_raw(30.0);   // 0.03 kg, below the noise floor
//! let first = acquirer.poll(0, &mut cell).unwrap();
//! assert_eq!(first.kg, 0.0);
//!
//! cell.push_raw(200.0);  // 0.20 kg
//! let second = acquirer.poll(50, &mut cell).unwrap();
//! assert!((second.kg - 0.10).abs() < 1e-6);
//! ```

use crate::config::ScaleConfig;
use crate::traits::LoadCell;

/// Number of samples in the moving average.
pub const SMOOTHING_WINDOW: usize = 2;

/// A smoothed weight reading in kilograms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightSample {
    /// Mean of the last two accepted readings, in kilograms.
    pub kg: f32,
}

/// Converts and smooths load-cell readings.
#[derive(Debug)]
pub struct WeightAcquirer {
    counts_per_kg: f32,
    noise_floor_kg: f32,
    read_interval_ms: u32,
    buffer: [f32; SMOOTHING_WINDOW],
    index: usize,
    pending_raw: Option<f32>,
    last_accept_ms: Option<u64>,
    current: WeightSample,
}

impl WeightAcquirer {
    /// Creates an acquirer with a zeroed buffer.
    pub fn new(config: &ScaleConfig) -> Self {
        Self {
            counts_per_kg: config.counts_per_kg,
            noise_floor_kg: config.noise_floor_kg,
            read_interval_ms: config.read_interval_ms,
            buffer: [0.0; SMOOTHING_WINDOW],
            index: 0,
            pending_raw: None,
            last_accept_ms: None,
            current: WeightSample::default(),
        }
    }

    /// Polls the load cell and returns a new smoothed sample when one is due.
    ///
    /// A fresh raw reading is latched until the read interval has elapsed
    /// since the last accepted sample; the newest reading wins. Returns
    /// `None` when nothing new was accepted. A stalled sensor simply keeps
    /// returning `None` and [`current`](Self::current) stays stale.
    pub fn poll<L: LoadCell + ?Sized>(&mut self, now_ms: u64, cell: &mut L) -> Option<WeightSample> {
        if let Some(raw) = cell.poll_raw() {
            self.pending_raw = Some(raw);
        }

        let due = match self.last_accept_ms {
            Some(last) => now_ms.saturating_sub(last) >= u64::from(self.read_interval_ms),
            None => true,
        };
        if !due {
            return None;
        }

        let raw = self.pending_raw.take()?;
        self.last_accept_ms = Some(now_ms);
        Some(self.accept(raw))
    }

    /// Pushes one raw reading through conversion and smoothing.
    fn accept(&mut self, raw: f32) -> WeightSample {
        let mut kg = raw / self.counts_per_kg;
        if kg.is_nan() || kg < self.noise_floor_kg {
            kg = 0.0;
        }

        self.buffer[self.index] = kg;
        self.index = (self.index + 1) % SMOOTHING_WINDOW;

        let sum: f32 = self.buffer.iter().sum();
        self.current = WeightSample {
            kg: sum / SMOOTHING_WINDOW as f32,
        };
        self.current
    }

    /// The most recent smoothed sample (0 kg before the first reading).
    #[inline]
    pub fn current(&self) -> WeightSample {
        self.current
    }

    /// Raw contents of the smoothing buffer.
    #[inline]
    pub fn buffer(&self) -> &[f32; SMOOTHING_WINDOW] {
        &self.buffer
    }
}
