//! Single voice of the stretched additive oscillator.
//!
//! Ties a CV buffer, a spectrum and the two oscillators together and maps the
//! patch and modulation values onto them. The spectral work runs once per control
//! block, pitch and stretch are followed on every sample.

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::control_rate::{cv_buffer_size, ControlClock, CV_BUFFER_SECONDS};
use crate::cv_buffer::{CvBuffer, CvBufferMode};
use crate::oscillator::additive_oscillator::{AdditiveOscillator, StretchQuantization};
use crate::oscillator::fundamental_oscillator::{
    octave_multiplier, FundamentalOscillator, FundamentalShape,
};
use crate::partial_cv::{partial_cv, PartialCv};
use crate::spectrum::{Spectrum, StereoMode};
use crate::utils::units::{octaves_to_frequency, quantize_octaves, quantize_semitones};
use crate::SampleRate;

/// Number of partials per voice.
pub const NUM_PARTIALS: usize = 128;

/// Voltage above which gate and clock inputs count as high.
const TRIGGER_THRESHOLD: f32 = 2.5;

/// Absolute CV buffer delay above which the buffer freezes.
const FREEZE_THRESHOLD: f32 = 0.95;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PitchQuantization {
    #[default]
    Continuous,
    Octaves,
    Semitones,
}

/// Patch parameters.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Pitch in octaves above C0 in the range from `-1.0` to `6.0`. Default is `4.0`.
    pub pitch: f32,

    /// Partial spacing in the range from `-2.0` to `2.0`. Default is `1.0` (harmonic).
    pub stretch: f32,

    /// Number of partials as a power of two, in the range from `0.0` to `7.0`.
    /// Default is `0.0`, the lowest partial alone.
    pub partials: f32,

    /// Tilt in the range from `-1.0` to `1.0`. Default is `-0.5`.
    ///
    /// Negative values tilt the spectrum down towards the higher partials, positive
    /// values raise the lowest partial instead.
    pub tilt: f32,

    /// Sieve in the range from `-1.0` to `1.0`. Default is `0.0`.
    ///
    /// Positive values keep the primes and remove their multiples, negative values
    /// remove prime families.
    pub sieve: f32,

    /// CV buffer delay in the range from `0.0` to `1.0`. Default is `0.0`.
    ///
    /// Acts as the comb depth while no CV buffer input is patched.
    pub cv_buffer_delay: f32,

    /// Frequency modulation amount in the range from `0.0` to `1.0`. Default is `0.0`.
    pub frequency_modulation_amount: f32,

    /// Stretch modulation amount in the range from `-1.0` to `1.0`. Default is `0.0`.
    pub stretch_modulation_amount: f32,

    /// Partials modulation amount in the range from `-1.0` to `1.0`. Default is `0.0`.
    pub partials_modulation_amount: f32,

    /// Tilt modulation amount in the range from `-1.0` to `1.0`. Default is `0.0`.
    pub tilt_modulation_amount: f32,

    /// Sieve modulation amount in the range from `-1.0` to `1.0`. Default is `0.0`.
    pub sieve_modulation_amount: f32,

    pub pitch_quantization: PitchQuantization,
    pub stretch_quantization: StretchQuantization,

    /// Panning used while the right output is patched. Default is soft panning.
    pub stereo_mode: StereoMode,

    pub cv_buffer_mode: CvBufferMode,

    /// Also clear the CV buffer and the amplitudes on a reset. Default is `false`.
    pub empty_on_reset: bool,

    pub fundamental_shape: FundamentalShape,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            pitch: 4.0,
            stretch: 1.0,
            partials: 0.0,
            tilt: -0.5,
            sieve: 0.0,
            cv_buffer_delay: 0.0,
            frequency_modulation_amount: 0.0,
            stretch_modulation_amount: 0.0,
            partials_modulation_amount: 0.0,
            tilt_modulation_amount: 0.0,
            sieve_modulation_amount: 0.0,
            pitch_quantization: PitchQuantization::default(),
            stretch_quantization: StretchQuantization::default(),
            stereo_mode: StereoMode::SoftPan,
            cv_buffer_mode: CvBufferMode::default(),
            empty_on_reset: false,
            fundamental_shape: FundamentalShape::default(),
        }
    }
}

/// Control voltages of a voice.
#[derive(Debug, Default, Clone)]
pub struct Modulations {
    /// Pitch in V/oct.
    pub pitch: f32,
    pub frequency: f32,
    pub stretch: f32,
    pub partials: f32,
    pub tilt: f32,
    pub sieve: f32,
    pub cv_buffer: f32,
    pub cv_buffer_delay: f32,
    pub clock: f32,
    pub reset: f32,

    pub cv_buffer_patched: bool,
    pub clock_patched: bool,
    /// Selects stereo operation.
    pub right_patched: bool,
}

/// Output of one sample.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
    pub fundamental: f32,
}

#[derive(Debug, Clone)]
pub struct Voice {
    sample_rate: SampleRate,
    index: usize,

    control_clock: ControlClock,
    indicator_decay: f32,

    buffer: CvBuffer,
    spectrum: Spectrum<NUM_PARTIALS>,
    oscillator: AdditiveOscillator,
    fundamental: FundamentalOscillator,

    pitch: f32,

    reset_state: bool,
    randomized: bool,
    reset_indicator: f32,
}

impl Voice {
    /// Creates voice number `index`. Odd and even voices get complementary stereo
    /// assignments and distinct random tables.
    ///
    /// Allocates the CV buffer, so this must not be called from the audio callback.
    pub fn new(sample_rate_hz: f32, index: usize) -> Self {
        let sample_rate = SampleRate::new(sample_rate_hz);
        let control_clock = ControlClock::with_offset(sample_rate, index);

        let seed = (index as u32).wrapping_mul(0x9e37_79b9) ^ 0x21;
        let buffer = CvBuffer::new(
            cv_buffer_size(sample_rate, CV_BUFFER_SECONDS),
            NUM_PARTIALS,
            seed,
        );

        let mut spectrum = Spectrum::new();
        spectrum.set_flip(index % 2 == 1);
        spectrum.set_smoothing_coefficient(control_clock.smoothing_coefficient());

        let mut voice = Self {
            sample_rate,
            index,
            indicator_decay: indicator_decay(sample_rate, control_clock.block_size()),
            control_clock,
            buffer,
            spectrum,
            oscillator: AdditiveOscillator::new(sample_rate),
            fundamental: FundamentalOscillator::new(sample_rate),
            pitch: 0.0,
            reset_state: true,
            randomized: false,
            reset_indicator: 0.0,
        };
        voice.apply_reset(true);

        log::debug!(
            "voice {index} created at {} Hz, control block {} samples",
            sample_rate.sample_rate_hz,
            voice.control_clock.block_size()
        );

        voice
    }

    /// Adapts to a new sample rate. Resizes the CV buffer and resets the voice.
    ///
    /// Allocates, so this must not be called from the audio callback.
    pub fn set_sample_rate(&mut self, sample_rate_hz: f32) {
        self.sample_rate = SampleRate::new(sample_rate_hz);

        self.control_clock.set_sample_rate(self.sample_rate);
        self.indicator_decay = indicator_decay(self.sample_rate, self.control_clock.block_size());
        self.spectrum
            .set_smoothing_coefficient(self.control_clock.smoothing_coefficient());
        self.oscillator.set_sample_rate(self.sample_rate);
        self.fundamental.set_sample_rate(self.sample_rate);
        self.buffer
            .resize(cv_buffer_size(self.sample_rate, CV_BUFFER_SECONDS));

        self.apply_reset(true);

        log::debug!(
            "voice {} sample rate changed to {} Hz",
            self.index,
            self.sample_rate.sample_rate_hz
        );
    }

    /// Randomizes the CV buffer table and restarts both oscillators. With `empty`,
    /// the CV buffer history and all amplitudes are cleared too.
    pub fn reset(&mut self, empty: bool) {
        self.apply_reset(empty);
        log::debug!("voice {} reset", self.index);
    }

    #[inline]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Returns `true` if all amplitudes were ~0 on the last control tick.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.spectrum.is_silent()
    }

    /// Brightness of a reset indicator in `[0, 1]`, jumping to 1 on every reset and
    /// fading out afterwards.
    #[inline]
    pub fn reset_indicator(&self) -> f32 {
        self.reset_indicator
    }

    /// Returns `true` while a reset gesture is held, for followers to pick up.
    #[inline]
    pub fn is_reset(&self) -> bool {
        self.reset_state
    }

    /// Returns `true` from a reset or the start of a silence until sound returns,
    /// for followers to pick up as a randomize edge.
    #[inline]
    pub fn is_randomized(&self) -> bool {
        self.randomized
    }

    #[inline]
    pub fn spectrum(&self) -> &Spectrum<NUM_PARTIALS> {
        &self.spectrum
    }

    #[inline]
    pub fn cv_buffer(&self) -> &CvBuffer {
        &self.buffer
    }

    #[inline]
    pub fn oscillator(&self) -> &AdditiveOscillator {
        &self.oscillator
    }

    #[inline]
    pub fn fundamental_oscillator(&self) -> &FundamentalOscillator {
        &self.fundamental
    }

    /// Pitch and amplitude of the active partials, see [`partial_cv`].
    pub fn partial_cv(&self, out: &mut [PartialCv]) {
        partial_cv(&self.spectrum, self.oscillator.stretch(), self.pitch, out);
    }

    /// Renders a block of samples. Samples beyond the shortest slice are left alone.
    #[inline]
    pub fn render(
        &mut self,
        patch: &Patch,
        modulations: &Modulations,
        left: &mut [f32],
        right: &mut [f32],
        fundamental: &mut [f32],
    ) {
        for ((l, r), f) in left
            .iter_mut()
            .zip(right.iter_mut())
            .zip(fundamental.iter_mut())
        {
            let frame = self.process(patch, modulations);
            *l = frame.left;
            *r = frame.right;
            *f = frame.fundamental;
        }
    }

    /// Computes the next sample.
    pub fn process(&mut self, patch: &Patch, modulations: &Modulations) -> Frame {
        let control_tick = self.control_clock.tick();
        if control_tick {
            self.reset_indicator *= self.indicator_decay;
        }

        let reset = modulations.reset > TRIGGER_THRESHOLD;
        if reset && !self.reset_state {
            self.apply_reset(patch.empty_on_reset);
        } else {
            if !reset {
                self.reset_state = false;
            }
            if control_tick {
                self.update_spectrum(patch, modulations);
            }
            self.update_frequencies(patch, modulations);
        }

        let silent = self.spectrum.is_silent();
        if silent && !self.randomized {
            self.oscillator.reset();
            self.buffer.randomize();
            self.randomized = true;
            self.reset_indicator = 1.0;
        } else if !silent {
            self.randomized = false;
        }

        self.spectrum.smoothen();
        self.oscillator.process(&self.spectrum);
        self.fundamental.process();

        Frame {
            left: self.oscillator.wave(),
            right: self.oscillator.wave_r(),
            fundamental: self.fundamental.wave(),
        }
    }

    fn apply_reset(&mut self, empty: bool) {
        self.buffer.randomize();
        self.oscillator.reset();
        self.fundamental.reset();
        if empty {
            self.buffer.empty();
            self.spectrum.set0();
        }

        self.reset_state = true;
        self.randomized = true;
        self.reset_indicator = 1.0;
    }

    fn update_spectrum(&mut self, patch: &Patch, modulations: &Modulations) {
        let partials =
            patch.partials + 0.7 * patch.partials_modulation_amount * modulations.partials;
        let tilt = patch.tilt + 0.2 * patch.tilt_modulation_amount * modulations.tilt;
        let sieve = patch.sieve + 0.2 * patch.sieve_modulation_amount * modulations.sieve;
        let delay = patch.cv_buffer_delay + 0.1 * modulations.cv_buffer_delay;

        let (lowest, tilt) = map_tilt(tilt);
        // Both bounds are inclusive, so 2^p partials span 2^p - 1.
        let highest = lowest + partials.exp2() - 1.0;
        self.buffer.set_lowest_highest(lowest, highest);
        self.spectrum.set_lowest_highest(lowest, highest);
        self.spectrum.set_tilt(tilt);

        let (level, keep_primes) = map_sieve(sieve);
        self.spectrum.set_keep_primes(keep_primes);
        self.spectrum.set_sieve(level);

        self.buffer.set_mode(patch.cv_buffer_mode);

        if modulations.cv_buffer_patched {
            self.buffer.set_enabled(true);
            self.spectrum.set_comb(0.0);

            self.buffer.set_clocked(modulations.clock_patched);
            if modulations.clock_patched {
                self.buffer
                    .set_clock_trigger(modulations.clock > TRIGGER_THRESHOLD);
            }

            if delay.abs() > FREEZE_THRESHOLD {
                self.buffer.set_frozen(true);
            } else {
                self.buffer.set_frozen(false);
                self.buffer.set_delay_relative(map_delay(delay));
                self.buffer.push(0.1 * modulations.cv_buffer);
            }
            self.buffer.process();
        } else {
            self.buffer.set_enabled(false);
            self.spectrum.set_comb(delay);
        }

        self.spectrum.set_stereo_mode(if modulations.right_patched {
            patch.stereo_mode
        } else {
            StereoMode::Mono
        });

        self.spectrum.process(&self.buffer);
    }

    fn update_frequencies(&mut self, patch: &Patch, modulations: &Modulations) {
        let stretch = patch.stretch + 0.4 * patch.stretch_modulation_amount * modulations.stretch;
        self.oscillator
            .set_stretch(stretch, patch.stretch_quantization);

        let knob = match patch.pitch_quantization {
            PitchQuantization::Continuous => patch.pitch,
            PitchQuantization::Octaves => quantize_octaves(patch.pitch),
            PitchQuantization::Semitones => quantize_semitones(patch.pitch),
        };
        self.pitch = knob + modulations.pitch;
        let frequency = octaves_to_frequency(self.pitch);

        // Exponential FM, applied to the additive bank only.
        let fm = 0.2 * modulations.frequency;
        let fm_amount = (5.0 * patch.frequency_modulation_amount).exp2() - 1.0;
        self.oscillator
            .set_frequency((1.0 + fm * fm_amount) * frequency);

        let multiplier = octave_multiplier(self.spectrum.lowest_index(), self.oscillator.stretch());
        self.fundamental.set_shape(patch.fundamental_shape);
        self.fundamental.set_frequency(multiplier * frequency);
    }
}

/// Maps the tilt control to `(lowest, tilt exponent)`. The positive half moves the
/// lowest partial up by up to six octaves, the negative half tilts the spectrum.
fn map_tilt(tilt: f32) -> (f32, f32) {
    if tilt >= 0.0 {
        ((6.0 * tilt).exp2(), 0.0)
    } else {
        // -1 maps to -inf, which the spectrum clamps.
        let tilt = tilt.max(-1.0);
        (1.0, tilt / (1.0 + tilt))
    }
}

/// Maps the sieve control to `(level, keep primes)`.
///
/// The positive half runs `0 -> 0`, `0.4 -> 1` and `1 -> 5` (past prime 11). The
/// negative half runs `0 -> 31`, `-0.8 -> 2` and `-1 -> 1` (below prime 127).
fn map_sieve(sieve: f32) -> (f32, bool) {
    if sieve > 0.0 {
        let level = 0.876713 * (2.74508 * sieve).exp2() - 0.876713;
        (level.clamp(0.0, 5.0), true)
    } else {
        let level = 31.0238 * (4.92282 * sieve).exp2() - 0.0237689;
        (level.clamp(0.0, 31.0), false)
    }
}

/// Exponential mapping of the delay control below the freeze threshold.
#[inline]
fn map_delay(delay: f32) -> f32 {
    (10.0_f32.powf(delay / FREEZE_THRESHOLD) - 1.0) / 9.0
}

fn indicator_decay(sample_rate: SampleRate, block_size: usize) -> f32 {
    (1.0 - 8.0 * block_size as f32 * sample_rate.inv_sr).clamp(0.0, 1.0)
}
