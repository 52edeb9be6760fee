//! Single oscillator tracking the fundamental of the additive bank.

#[allow(unused_imports)]
use num_traits::float::Float;

use super::phasor::Phasor;
use crate::utils::finite_or;
use crate::SampleRate;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FundamentalShape {
    #[default]
    Sine,
    Square,
}

#[derive(Debug, Clone)]
pub struct FundamentalOscillator {
    sample_rate: SampleRate,
    phasor: Phasor,
    shape: FundamentalShape,
    wave: f32,
}

impl Default for FundamentalOscillator {
    fn default() -> Self {
        Self::new(SampleRate::default())
    }
}

impl FundamentalOscillator {
    pub fn new(sample_rate: SampleRate) -> Self {
        Self {
            sample_rate,
            phasor: Phasor::new(),
            shape: FundamentalShape::default(),
            wave: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: SampleRate) {
        let frequency = self.frequency();
        self.sample_rate = sample_rate;
        self.set_frequency(frequency);
    }

    pub fn reset(&mut self) {
        self.phasor.reset();
        self.wave = 0.0;
    }

    #[inline]
    pub fn set_frequency(&mut self, frequency: f32) {
        let increment = finite_or(frequency, 0.0) as f64 * self.sample_rate.inv_sr as f64;
        self.phasor.set_increment(increment);
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        (self.phasor.increment() * self.sample_rate.sample_rate_hz as f64) as f32
    }

    #[inline]
    pub fn set_shape(&mut self, shape: FundamentalShape) {
        self.shape = shape;
    }

    #[inline]
    pub fn shape(&self) -> FundamentalShape {
        self.shape
    }

    #[inline]
    pub fn wave(&self) -> f32 {
        self.wave
    }

    #[inline]
    pub fn process(&mut self) {
        let phase = self.phasor.phase() as f32;

        self.wave = if self.phasor.increment().abs() >= 0.5 {
            0.0
        } else {
            match self.shape {
                FundamentalShape::Sine => (core::f32::consts::TAU * phase).sin(),
                FundamentalShape::Square => {
                    if phase < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
            }
        };

        self.phasor.advance();
    }
}

/// Largest power of two not above the frequency ratio of partial `lowest_index`,
/// at least 1.
///
/// Multiplying the fundamental frequency by it keeps the fundamental oscillator in
/// the octave of the lowest sounding partial.
pub fn octave_multiplier(lowest_index: usize, stretch: f32) -> f32 {
    let ratio = (1.0 + (lowest_index as f32 - 1.0) * stretch).abs();
    if !ratio.is_finite() || ratio < 2.0 {
        return 1.0;
    }

    // ratio >= 2, so the exponent is at least 1.
    let exponent = ratio.log2().floor();
    let multiplier = exponent.exp2();

    // Correct rounding errors of log2 near exact powers of two.
    if multiplier > ratio {
        multiplier * 0.5
    } else if multiplier * 2.0 <= ratio {
        multiplier * 2.0
    } else {
        multiplier
    }
}
