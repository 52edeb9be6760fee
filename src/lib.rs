#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod control_rate;
pub mod cv_buffer;
pub mod oscillator;
pub mod partial_cv;
pub mod spectrum;
pub mod utils;
pub mod voice;

/// Sample rate context for DSP calculations.
#[derive(Debug, Clone, Copy)]
pub struct SampleRate {
    /// Sample rate in Hz
    pub sample_rate_hz: f32,
    /// Reciprocal of sample rate (1.0 / sample_rate_hz) for fast multiplication
    pub inv_sr: f32,
}

impl SampleRate {
    /// Create a new sample rate context.
    ///
    /// Rates that are not finite or not positive fall back to 48 kHz.
    pub fn new(sample_rate_hz: f32) -> Self {
        let sample_rate_hz = if sample_rate_hz.is_finite() && sample_rate_hz > 0.0 {
            sample_rate_hz
        } else {
            48000.0
        };
        Self {
            sample_rate_hz,
            inv_sr: 1.0 / sample_rate_hz,
        }
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::new(48000.0)
    }
}
