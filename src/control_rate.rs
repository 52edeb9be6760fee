//! Decimated control rate.
//!
//! Spectral recomputation is expensive, so it only runs once every control block.
//! The amplitudes are smoothed at audio rate with a one-pole filter whose time
//! constant equals the block size, which bridges the two rates: the smoothed value
//! settles within roughly one control period.

use crate::SampleRate;

/// Upper bound for the control block size in samples.
pub const MAX_BLOCK_SIZE: usize = 64;

/// Control rate in Hz below which the block size is not reduced further.
const CONTROL_RATE_HZ: f32 = 750.0;

/// Length of the CV buffer history in seconds.
pub const CV_BUFFER_SECONDS: f32 = 4.0;

/// Returns the control block size for a sample rate: `min(64, sample_rate / 750)`.
#[inline]
pub fn block_size(sample_rate: SampleRate) -> usize {
    ((sample_rate.sample_rate_hz / CONTROL_RATE_HZ) as usize).clamp(1, MAX_BLOCK_SIZE)
}

/// Returns the capacity of a CV buffer that holds `seconds` of control-rate samples.
#[inline]
pub fn cv_buffer_size(sample_rate: SampleRate, seconds: f32) -> usize {
    let size = seconds * sample_rate.sample_rate_hz / block_size(sample_rate) as f32;

    if size.is_finite() && size > 0.0 {
        size as usize
    } else {
        0
    }
}

/// Sample counter that signals control ticks.
#[derive(Debug, Clone)]
pub struct ControlClock {
    block_size: usize,
    counter: usize,
}

impl Default for ControlClock {
    fn default() -> Self {
        Self::new(SampleRate::default())
    }
}

impl ControlClock {
    pub fn new(sample_rate: SampleRate) -> Self {
        Self {
            block_size: block_size(sample_rate),
            counter: 0,
        }
    }

    /// Starts the clock `offset` samples into its block, so that several clocks
    /// don't all tick on the same sample.
    pub fn with_offset(sample_rate: SampleRate, offset: usize) -> Self {
        let mut clock = Self::new(sample_rate);
        clock.counter = offset % clock.block_size;
        clock
    }

    pub fn set_sample_rate(&mut self, sample_rate: SampleRate) {
        self.block_size = block_size(sample_rate);
        self.counter %= self.block_size;
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Coefficient for the audio-rate one-pole smoothing of control-rate values.
    #[inline]
    pub fn smoothing_coefficient(&self) -> f32 {
        1.0 / self.block_size as f32
    }

    /// Returns `true` if control-rate work is due on this sample, then advances.
    ///
    /// Must be called exactly once per audio sample.
    #[inline]
    pub fn tick(&mut self) -> bool {
        let due = self.counter == 0;
        self.counter += 1;
        if self.counter >= self.block_size {
            self.counter = 0;
        }

        due
    }
}
