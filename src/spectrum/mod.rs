//! Spectral shaping of the partial amplitudes.
//!
//! The amplitude of partial `i` starts out as `i^tilt` over the active range
//! `[lowest, highest]`, gets sieved, modulated by the CV buffer, normalized to unit
//! sum and shaped by a raised-cosine comb. This happens at control rate in
//! [`Spectrum::process`]. [`Spectrum::smoothen`] then glides the audio-rate amplitudes
//! towards the result on every sample.
//!
//! The range bounds are real numbers. The active band is the interval
//! `[lowest, highest + 1)` laid over unit slots `[i, i + 1)`, and a partial only partly
//! covered by the band gets the covered fraction as its gain. `lowest = 1.0`,
//! `highest = 4.0` thus means partials 1 to 4 at full level, while `highest = 4.25`
//! adds partial 5 at a quarter.

pub mod panning;
pub mod sieve;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::cv_buffer::CvBuffer;
use crate::utils::{finite_or, fractional, one_pole};
use sieve::Sieve;

/// Sum of amplitude magnitudes below which the spectrum counts as silent.
pub const SILENCE_THRESHOLD: f32 = 1.0e-6;

/// Range of the tilt exponent, keeping `i^tilt` finite for all partials.
const MAX_TILT: f32 = 16.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StereoMode {
    /// Both channels get every partial.
    #[default]
    Mono,
    /// Partials are panned, the opposite channel keeps an attenuated copy that
    /// gets weaker towards the higher partials.
    SoftPan,
    /// Every partial except the fundamental sounds in one channel only.
    HardPan,
}

#[derive(Debug, Clone)]
pub struct Spectrum<const NUM_PARTIALS: usize> {
    lowest: f32,
    highest: f32,
    lowest_index: usize,
    highest_index: usize,
    fade_lowest: f32,
    fade_highest: f32,

    tilt: f32,
    sieve: Sieve,
    comb: f32,

    stereo_mode: StereoMode,
    flip: bool,
    smoothing_coefficient: f32,
    silent: bool,

    // Normalized amplitudes before panning.
    amps_raw: [f32; NUM_PARTIALS],
    // Control-rate targets per channel.
    amps: [f32; NUM_PARTIALS],
    amps_r: [f32; NUM_PARTIALS],
    // Audio-rate values.
    amps_smooth: [f32; NUM_PARTIALS],
    amps_r_smooth: [f32; NUM_PARTIALS],
}

impl<const NUM_PARTIALS: usize> Default for Spectrum<NUM_PARTIALS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const NUM_PARTIALS: usize> Spectrum<NUM_PARTIALS> {
    pub fn new() -> Self {
        // Build the pan table here rather than on the first stereo control tick.
        panning::pan_table();

        let mut spectrum = Self {
            lowest: 1.0,
            highest: 1.0,
            lowest_index: 1,
            highest_index: 1,
            fade_lowest: 1.0,
            fade_highest: 1.0,
            tilt: 0.0,
            sieve: Sieve::default(),
            comb: 0.0,
            stereo_mode: StereoMode::default(),
            flip: false,
            smoothing_coefficient: 1.0,
            silent: true,
            amps_raw: [0.0; NUM_PARTIALS],
            amps: [0.0; NUM_PARTIALS],
            amps_r: [0.0; NUM_PARTIALS],
            amps_smooth: [0.0; NUM_PARTIALS],
            amps_r_smooth: [0.0; NUM_PARTIALS],
        };
        spectrum.set_lowest_highest(1.0, 1.0);

        spectrum
    }

    /// Zeroes all amplitudes, including the smoothed ones.
    pub fn set0(&mut self) {
        self.amps_raw.fill(0.0);
        self.amps.fill(0.0);
        self.amps_r.fill(0.0);
        self.amps_smooth.fill(0.0);
        self.amps_r_smooth.fill(0.0);
    }

    /// Sets the active range. `lowest` is clamped to `[1, N]`, `highest` to
    /// `[lowest, N + 1]`.
    pub fn set_lowest_highest(&mut self, lowest: f32, highest: f32) {
        let max = NUM_PARTIALS.max(1) as f32;
        self.lowest = finite_or(lowest, 1.0).clamp(1.0, max);
        self.highest = finite_or(highest, self.lowest).clamp(self.lowest, max + 1.0);

        self.lowest_index = (self.lowest as usize).clamp(1, NUM_PARTIALS.max(1));
        self.fade_lowest = 1.0 - fractional(self.lowest);

        let highest_full = self.highest as usize;
        let fade = fractional(self.highest);
        if fade > 0.0 && highest_full < NUM_PARTIALS {
            self.highest_index = highest_full + 1;
            self.fade_highest = fade;
        } else {
            self.highest_index = highest_full.min(NUM_PARTIALS.max(1));
            self.fade_highest = 1.0;
        }
    }

    #[inline]
    pub fn set_tilt(&mut self, tilt: f32) {
        self.tilt = if tilt.is_nan() {
            0.0
        } else {
            tilt.clamp(-MAX_TILT, MAX_TILT)
        };
    }

    /// Sets the sieve level, clamped to `[0, 31]`.
    #[inline]
    pub fn set_sieve(&mut self, sieve: f32) {
        self.sieve.set_level(sieve);
    }

    #[inline]
    pub fn set_keep_primes(&mut self, keep_primes: bool) {
        self.sieve.set_keep_primes(keep_primes);
    }

    /// Sets the comb depth, clamped to `[-1, 1]`.
    #[inline]
    pub fn set_comb(&mut self, comb: f32) {
        self.comb = finite_or(comb, 0.0).clamp(-1.0, 1.0);
    }

    #[inline]
    pub fn set_stereo_mode(&mut self, stereo_mode: StereoMode) {
        self.stereo_mode = stereo_mode;
    }

    /// Swaps the channel assignment of all partials but the fundamental.
    #[inline]
    pub fn set_flip(&mut self, flip: bool) {
        self.flip = flip;
    }

    /// Sets the per-sample smoothing coefficient, usually `1 / control block size`.
    #[inline]
    pub fn set_smoothing_coefficient(&mut self, coefficient: f32) {
        self.smoothing_coefficient = finite_or(coefficient, 1.0).clamp(0.0, 1.0);
    }

    #[inline]
    pub fn lowest(&self) -> f32 {
        self.lowest
    }

    #[inline]
    pub fn highest(&self) -> f32 {
        self.highest
    }

    /// Lowest partial with a non-zero gain.
    #[inline]
    pub fn lowest_index(&self) -> usize {
        self.lowest_index
    }

    /// Highest partial with a non-zero gain.
    #[inline]
    pub fn highest_index(&self) -> usize {
        self.highest_index
    }

    #[inline]
    pub fn tilt(&self) -> f32 {
        self.tilt
    }

    #[inline]
    pub fn sieve(&self) -> &Sieve {
        &self.sieve
    }

    #[inline]
    pub fn comb(&self) -> f32 {
        self.comb
    }

    #[inline]
    pub fn stereo_mode(&self) -> StereoMode {
        self.stereo_mode
    }

    #[inline]
    pub fn is_flipped(&self) -> bool {
        self.flip
    }

    /// Returns `true` if the last [`Spectrum::process`] found all amplitudes ~0.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Smoothed amplitude of partial `partial` (1-based) in the left or mono channel.
    #[inline]
    pub fn amp(&self, partial: usize) -> f32 {
        if self.is_audible(partial) {
            self.amps_smooth[partial - 1]
        } else {
            0.0
        }
    }

    /// Smoothed amplitude of partial `partial` (1-based) in the right channel, 0 in mono.
    #[inline]
    pub fn amp_r(&self, partial: usize) -> f32 {
        if self.stereo_mode != StereoMode::Mono && self.is_audible(partial) {
            self.amps_r_smooth[partial - 1]
        } else {
            0.0
        }
    }

    /// Normalized amplitude of partial `partial` (1-based) from the last control tick,
    /// before panning and smoothing.
    #[inline]
    pub fn raw_amp(&self, partial: usize) -> f32 {
        match partial.checked_sub(1) {
            Some(k) if k < NUM_PARTIALS => self.amps_raw[k],
            _ => 0.0,
        }
    }

    /// Control-rate target of partial `partial` (1-based) in the left or mono channel.
    #[inline]
    pub fn target_amp(&self, partial: usize) -> f32 {
        match partial.checked_sub(1) {
            Some(k) if k < NUM_PARTIALS => self.amps[k],
            _ => 0.0,
        }
    }

    #[inline]
    fn is_audible(&self, partial: usize) -> bool {
        !self.silent
            && partial >= self.lowest_index
            && partial <= self.highest_index
            && partial <= NUM_PARTIALS
    }

    /// Recomputes the amplitudes. Call once per control tick, after the CV buffer
    /// has been processed.
    pub fn process(&mut self, buffer: &CvBuffer) {
        if NUM_PARTIALS == 0 {
            return;
        }

        let active = self.lowest_index - 1..self.highest_index;
        let modulated = buffer.is_enabled();

        self.amps_raw.fill(0.0);
        for k in active.clone() {
            self.amps_raw[k] = ((k + 1) as f32).powf(self.tilt);
        }
        self.apply_boundary_fades();
        self.sieve.apply(&mut self.amps_raw, self.highest_index);

        let mut sum = 0.0;
        for k in active.clone() {
            if modulated {
                self.amps_raw[k] *= buffer.value(k + 1);
            }
            sum += self.amps_raw[k].abs();
        }

        // Written this way round so that a NaN sum counts as silent too.
        self.silent = !(sum >= SILENCE_THRESHOLD);

        if self.silent {
            self.amps_raw[active].fill(0.0);
        } else {
            let normalization = 1.0 / sum;
            for k in active {
                let partial = (k + 1) as f32;
                let phase = core::f32::consts::PI * self.comb * (partial - self.lowest);
                let comb = 0.5 * phase.cos() + 0.5;

                self.amps_raw[k] *= normalization * comb;
                if modulated {
                    self.amps_raw[k] *= buffer.value(k + 1);
                }
            }

            // The fades have to survive the normalization.
            self.apply_boundary_fades();
            self.sieve.apply_fade(&mut self.amps_raw, self.highest_index);
        }

        self.pan();
    }

    /// Moves the audio-rate amplitudes one step towards the control-rate targets.
    /// Call once per sample.
    #[inline]
    pub fn smoothen(&mut self) {
        let coefficient = self.smoothing_coefficient;

        for (smooth, target) in self.amps_smooth.iter_mut().zip(self.amps.iter()) {
            one_pole(smooth, *target, coefficient);
        }

        if self.stereo_mode != StereoMode::Mono {
            for (smooth, target) in self.amps_r_smooth.iter_mut().zip(self.amps_r.iter()) {
                one_pole(smooth, *target, coefficient);
            }
        }
    }

    #[inline]
    fn apply_boundary_fades(&mut self) {
        self.amps_raw[self.lowest_index - 1] *= self.fade_lowest;
        self.amps_raw[self.highest_index - 1] *= self.fade_highest;
    }

    fn pan(&mut self) {
        match self.stereo_mode {
            StereoMode::Mono => {
                self.amps = self.amps_raw;
                self.amps_r = self.amps_raw;
            }
            StereoMode::SoftPan => {
                self.amps[0] = self.amps_raw[0];
                self.amps_r[0] = self.amps_raw[0];

                // The opposite channel rolls off with the distance from the lowest
                // partial, so that a high lowest partial doesn't end up mono.
                let offset = (self.lowest - 2.0).max(0.0);

                for k in 1..NUM_PARTIALS {
                    let partial = k + 1;
                    let amp = self.amps_raw[k];
                    let distance = partial as f32 - offset;
                    let opposite = if distance > 0.0 {
                        amp / distance.sqrt()
                    } else {
                        0.0
                    };

                    if panning::is_left(partial) ^ self.flip {
                        self.amps[k] = amp;
                        self.amps_r[k] = opposite;
                    } else {
                        self.amps[k] = opposite;
                        self.amps_r[k] = amp;
                    }
                }
            }
            StereoMode::HardPan => {
                self.amps[0] = self.amps_raw[0];
                self.amps_r[0] = self.amps_raw[0];

                for k in 1..NUM_PARTIALS {
                    let partial = k + 1;
                    let amp = self.amps_raw[k];

                    if panning::is_left(partial) ^ self.flip {
                        self.amps[k] = amp;
                        self.amps_r[k] = 0.0;
                    } else {
                        self.amps[k] = 0.0;
                        self.amps_r[k] = amp;
                    }
                }
            }
        }
    }
}
