//! Additive oscillator with stretched partials.
//!
//! Partial `i` runs at `1 + (i - 1) * stretch` times the base frequency. A stretch of
//! 1 gives the harmonic series, other values spread the partials inharmonically.
//!
//! Instead of one phase per partial, three phases are accumulated: the base phase
//! `p`, the stretch phase `s = stretch * p` and their sum `p + s`. From the identity
//! `sin(a + b) = 2 sin(a) cos(b) - sin(a - b)` follows
//!
//! ```text
//! sin(p + i s) = 2 sin(p + (i - 1) s) cos(s) - sin(p + (i - 2) s)
//! ```
//!
//! so after two sines and one cosine, every further partial costs a multiply and
//! a subtraction.

#[allow(unused_imports)]
use num_traits::float::Float;

use super::phasor::Phasor;
use crate::spectrum::{Spectrum, StereoMode};
use crate::utils::finite_or;
use crate::SampleRate;

const TWO_PI: f64 = core::f64::consts::TAU;

/// Snapping of the stretch parameter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StretchQuantization {
    #[default]
    Continuous,
    /// The ratio of the second partial to the first snaps to a just interval.
    Consonants,
    /// Integer stretch values only.
    Harmonics,
}

#[derive(Debug, Clone)]
pub struct AdditiveOscillator {
    sample_rate: SampleRate,
    frequency: f32,
    stretch: f32,

    phasor: Phasor,
    stretch_phasor: Phasor,
    upper_phasor: Phasor,

    wave: f32,
    wave_r: f32,
}

impl Default for AdditiveOscillator {
    fn default() -> Self {
        Self::new(SampleRate::default())
    }
}

impl AdditiveOscillator {
    pub fn new(sample_rate: SampleRate) -> Self {
        Self {
            sample_rate,
            frequency: 0.0,
            stretch: 1.0,
            phasor: Phasor::new(),
            stretch_phasor: Phasor::new(),
            upper_phasor: Phasor::new(),
            wave: 0.0,
            wave_r: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.update_increments();
    }

    /// Zeroes all phases and outputs.
    pub fn reset(&mut self) {
        self.phasor.reset();
        self.stretch_phasor.reset();
        self.upper_phasor.reset();
        self.wave = 0.0;
        self.wave_r = 0.0;
    }

    /// Sets the base frequency in Hz.
    #[inline]
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = finite_or(frequency, 0.0);
        self.update_increments();
    }

    #[inline]
    pub fn set_stretch(&mut self, stretch: f32, quantization: StretchQuantization) {
        self.stretch = quantize_stretch(finite_or(stretch, 1.0), quantization);
        self.update_increments();
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn stretch(&self) -> f32 {
        self.stretch
    }

    /// Base phase increment in cycles per sample.
    #[inline]
    pub fn phase_increment(&self) -> f64 {
        self.phasor.increment()
    }

    #[inline]
    pub fn wave(&self) -> f32 {
        self.wave
    }

    /// Right channel output, equal to [`AdditiveOscillator::wave`] in mono.
    #[inline]
    pub fn wave_r(&self) -> f32 {
        self.wave_r
    }

    /// Highest partial that is currently below the Nyquist frequency.
    #[inline]
    pub fn nyquist_limit(&self) -> usize {
        nyquist_limit(self.phasor.increment(), self.stretch as f64)
    }

    fn update_increments(&mut self) {
        let increment = self.frequency as f64 * self.sample_rate.inv_sr as f64;
        let stretch_increment = self.stretch as f64 * increment;

        self.phasor.set_increment(increment);
        self.stretch_phasor.set_increment(stretch_increment);
        self.upper_phasor.set_increment(increment + stretch_increment);
    }

    /// Computes the next output sample from the smoothed amplitudes of `spectrum`.
    ///
    /// Call once per sample, after [`Spectrum::smoothen`]. A silent spectrum resets
    /// the phases, so that the tone restarts cleanly once amplitude returns.
    #[inline]
    pub fn process<const NUM_PARTIALS: usize>(&mut self, spectrum: &Spectrum<NUM_PARTIALS>) {
        if spectrum.is_silent() {
            self.reset();
            return;
        }

        let highest = spectrum.highest_index().min(self.nyquist_limit());
        let stereo = spectrum.stereo_mode() != StereoMode::Mono;

        let sines = StretchedSines::new(
            self.phasor.phase(),
            self.upper_phasor.phase(),
            self.stretch_phasor.phase(),
        );

        let mut left = 0.0;
        let mut right = 0.0;
        for (partial, sine) in (1..=highest).zip(sines) {
            left += spectrum.amp(partial) as f64 * sine;
            if stereo {
                right += spectrum.amp_r(partial) as f64 * sine;
            }
        }

        self.wave = left as f32;
        self.wave_r = if stereo { right as f32 } else { self.wave };

        self.phasor.advance();
        self.stretch_phasor.advance();
        self.upper_phasor.advance();
    }
}

/// Sines of the stretched partials, starting with partial 1.
///
/// Phases are in cycles. `upper_phase` must equal `phase + stretch_phase` modulo 1.
#[derive(Debug, Clone)]
pub struct StretchedSines {
    previous: f64,
    current: f64,
    two_cosine: f64,
}

impl StretchedSines {
    pub fn new(phase: f64, upper_phase: f64, stretch_phase: f64) -> Self {
        Self {
            previous: (TWO_PI * phase).sin(),
            current: (TWO_PI * upper_phase).sin(),
            two_cosine: 2.0 * (TWO_PI * stretch_phase).cos(),
        }
    }

    /// Sines at base phase `phase` for a given stretch.
    pub fn at(phase: f64, stretch: f64) -> Self {
        let stretch_phase = stretch * phase;
        let upper_phase = phase + stretch_phase;

        Self::new(
            phase,
            upper_phase - upper_phase.floor(),
            stretch_phase - stretch_phase.floor(),
        )
    }
}

impl Iterator for StretchedSines {
    type Item = f64;

    #[inline]
    fn next(&mut self) -> Option<f64> {
        let sine = self.previous;
        let next = self.two_cosine * self.current - self.previous;
        self.previous = self.current;
        self.current = next;

        Some(sine)
    }
}

/// Largest partial index `i` with `|1 + (i - 1) * stretch| * |increment| < 0.5`.
///
/// Returns `usize::MAX` when no partial can reach the Nyquist frequency and 0 when
/// even the fundamental is above it.
pub fn nyquist_limit(increment: f64, stretch: f64) -> usize {
    let increment = increment.abs();
    if !increment.is_finite() || increment >= 0.5 {
        return 0;
    }
    if increment == 0.0 || stretch.abs() < 1.0e-9 {
        return usize::MAX;
    }

    let nyquist_ratio = 0.5 / increment;
    let bound = if stretch > 0.0 {
        (nyquist_ratio - 1.0) / stretch
    } else {
        // Ratios fall through zero and grow negative, which is mirrored.
        (nyquist_ratio + 1.0) / -stretch
    };

    // (i - 1) < bound, i.e. i = ceil(bound). Float to int casts saturate.
    bound.ceil() as usize
}

/// Quantizes the stretch parameter.
pub fn quantize_stretch(stretch: f32, quantization: StretchQuantization) -> f32 {
    match quantization {
        StretchQuantization::Continuous => stretch,
        StretchQuantization::Harmonics => stretch.round(),
        StretchQuantization::Consonants => {
            if !stretch.is_finite() {
                return stretch;
            }

            // Ratio of the second partial to the fundamental.
            let ratio = stretch + 1.0;
            let negative = ratio < 0.0;
            let ratio = ratio.abs();

            let snapped = if ratio < 2.0 / 3.0 {
                snap_below_fifth(ratio)
            } else {
                let mut ratio = ratio;
                let mut octave = 0;
                while ratio > 2.0 {
                    ratio *= 0.5;
                    octave += 1;
                }
                while ratio < 1.0 {
                    ratio *= 2.0;
                    octave -= 1;
                }
                snap_within_octave(ratio) * 2.0_f32.powi(octave)
            };

            (if negative { -snapped } else { snapped }) - 1.0
        }
    }
}

fn snap_below_fifth(ratio: f32) -> f32 {
    if ratio < 1.0 / 16.0 {
        0.0
    } else if ratio < 3.0 / 16.0 {
        1.0 / 8.0
    } else if ratio < 7.0 / 24.0 {
        1.0 / 4.0
    } else if ratio < 5.0 / 12.0 {
        1.0 / 3.0
    } else if ratio < 7.0 / 12.0 {
        1.0 / 2.0
    } else {
        2.0 / 3.0
    }
}

fn snap_within_octave(ratio: f32) -> f32 {
    if ratio < 11.0 / 10.0 {
        1.0 // unison
    } else if ratio < 49.0 / 40.0 {
        6.0 / 5.0 // minor third
    } else if ratio < 31.0 / 24.0 {
        5.0 / 4.0 // major third
    } else if ratio < 17.0 / 12.0 {
        4.0 / 3.0 // fourth
    } else if ratio < 31.0 / 20.0 {
        3.0 / 2.0 // fifth
    } else if ratio < 49.0 / 30.0 {
        8.0 / 5.0 // minor sixth
    } else if ratio < 11.0 / 6.0 {
        5.0 / 3.0 // major sixth
    } else {
        2.0 // octave
    }
}
