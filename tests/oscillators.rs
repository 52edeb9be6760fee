//! Tests for the oscillators


use std::f64::consts::TAU;

use eratosthenean_dsp::cv_buffer::CvBuffer;
use eratosthenean_dsp::oscillator::additive_oscillator::*;
use eratosthenean_dsp::oscillator::fundamental_oscillator::*;
use eratosthenean_dsp::spectrum::{Spectrum, StereoMode};
use eratosthenean_dsp::SampleRate;

use wav_writer::SAMPLE_RATE;

const BLOCK_SIZE: usize = 64;

fn flat_spectrum<const N: usize>(lowest: f32, highest: f32) -> Spectrum<N> {
    let mut spectrum = Spectrum::new();
    spectrum.set_lowest_highest(lowest, highest);
    spectrum.set_tilt(0.0);
    spectrum.process(&CvBuffer::new(0, 0, 0));
    spectrum
}

#[test]
fn recurrence_matches_direct_sines() {
    for s in 0..=16 {
        let stretch = -2.0 + s as f64 * 0.25;

        for p in 0..20 {
            let phase = p as f64 * 0.05;

            for (i, sine) in StretchedSines::at(phase, stretch).take(64).enumerate() {
                let ratio = 1.0 + i as f64 * stretch;
                let expected = (TAU * phase * ratio).sin();
                assert!(
                    (sine - expected).abs() < 1.0e-9,
                    "partial {} at stretch {stretch}, phase {phase}: {sine} != {expected}",
                    i + 1
                );
            }
        }
    }
}

#[test]
fn harmonic_series_at_220_hz() {
    let mut spectrum = flat_spectrum::<128>(1.0, 4.0);
    let mut osc = AdditiveOscillator::new(SampleRate::new(SAMPLE_RATE));
    osc.set_stretch(1.0, StretchQuantization::Continuous);
    osc.set_frequency(220.0);

    let increment = osc.phase_increment();
    assert!((increment - 220.0 / 48000.0).abs() < 1.0e-9);

    for n in 0..4800 {
        spectrum.smoothen();
        osc.process(&spectrum);

        let expected: f64 = (1..=4)
            .map(|i| 0.25 * (TAU * i as f64 * n as f64 * increment).sin())
            .sum();

        assert!(
            (osc.wave() as f64 - expected).abs() < 1.0e-4,
            "sample {n}: {} != {expected}",
            osc.wave()
        );
        assert_eq!(osc.wave(), osc.wave_r());
    }
}

#[test]
fn partials_above_nyquist_are_skipped() {
    assert_eq!(nyquist_limit(220.0 / 48000.0, 1.0), 109);
    assert_eq!(nyquist_limit(1.0 / 128.0, 1.0), 63);
    assert_eq!(nyquist_limit(1.0 / 128.0, -1.0), 65);
    assert_eq!(nyquist_limit(1.0 / 128.0, 0.5), 126);
    assert_eq!(nyquist_limit(0.0, 1.0), usize::MAX);
    assert_eq!(nyquist_limit(0.01, 0.0), usize::MAX);
    assert_eq!(nyquist_limit(0.5, 1.0), 0);
    assert_eq!(nyquist_limit(-0.7, 1.0), 0);

    // A single partial above Nyquist renders silence.
    let mut spectrum = flat_spectrum::<8>(8.0, 8.0);
    let mut osc = AdditiveOscillator::new(SampleRate::new(SAMPLE_RATE));
    osc.set_stretch(1.0, StretchQuantization::Continuous);
    osc.set_frequency(5000.0);

    assert_eq!(osc.nyquist_limit(), 4);

    for _ in 0..256 {
        spectrum.smoothen();
        osc.process(&spectrum);
        assert_eq!(osc.wave(), 0.0);
    }
}

#[test]
fn stretch_quantization() {
    use StretchQuantization::*;

    let close = |a: f32, b: f32| (a - b).abs() < 1.0e-5;

    assert_eq!(quantize_stretch(0.37, Continuous), 0.37);

    assert_eq!(quantize_stretch(1.4, Harmonics), 1.0);
    assert_eq!(quantize_stretch(-0.6, Harmonics), -1.0);

    // Fifth
    assert!(close(quantize_stretch(0.45, Consonants), 0.5));
    // Octave
    assert!(close(quantize_stretch(1.0, Consonants), 1.0));
    // Fifth above the octave
    assert!(close(quantize_stretch(2.05, Consonants), 2.0));
    // Major sixth below the octave
    assert!(close(quantize_stretch(-0.15, Consonants), 5.0 / 6.0 - 1.0));
    // Small ratios
    assert!(close(quantize_stretch(-0.8, Consonants), -0.75));
    assert!(close(quantize_stretch(-1.0, Consonants), -1.0));
    // Negative ratios
    assert!(close(quantize_stretch(-2.0, Consonants), -2.0));
    assert!(close(quantize_stretch(-2.3, Consonants), -4.0 / 3.0 - 1.0));

    let mut osc = AdditiveOscillator::default();
    osc.set_stretch(0.45, Consonants);
    assert!(close(osc.stretch(), 0.5));
    osc.set_stretch(f32::NAN, Consonants);
    assert!(close(osc.stretch(), 1.0));
}

#[test]
fn silence_resets_phases() {
    let mut spectrum = flat_spectrum::<16>(1.0, 8.0);
    let mut osc = AdditiveOscillator::new(SampleRate::new(SAMPLE_RATE));
    osc.set_stretch(0.7, StretchQuantization::Continuous);
    osc.set_frequency(330.0);

    for _ in 0..100 {
        spectrum.smoothen();
        osc.process(&spectrum);
    }
    assert_ne!(osc.wave(), 0.0);

    let mut empty = CvBuffer::new(16, 16, 0);
    empty.set_enabled(true);
    empty.set_lowest_highest(1.0, 8.0);
    empty.process();
    spectrum.process(&empty);
    assert!(spectrum.is_silent());

    spectrum.smoothen();
    osc.process(&spectrum);
    assert_eq!(osc.wave(), 0.0);
    assert_eq!(osc.wave_r(), 0.0);

    spectrum.process(&CvBuffer::new(0, 0, 0));
    spectrum.smoothen();
    osc.process(&spectrum);

    // Restarts at phase 0.
    assert!(osc.wave().abs() < 1.0e-6);
    spectrum.smoothen();
    osc.process(&spectrum);
    assert!(osc.wave().abs() > 1.0e-4);
}

#[test]
fn stereo_channels_sum_to_hard_panned_spectrum() {
    let mut spectrum = Spectrum::<16>::new();
    spectrum.set_lowest_highest(2.0, 16.0);
    spectrum.set_tilt(-0.5);
    spectrum.set_stereo_mode(StereoMode::HardPan);
    spectrum.process(&CvBuffer::new(0, 0, 0));

    let mut mono = spectrum.clone();
    mono.set_stereo_mode(StereoMode::Mono);
    mono.process(&CvBuffer::new(0, 0, 0));

    let mut stereo_osc = AdditiveOscillator::new(SampleRate::new(SAMPLE_RATE));
    let mut mono_osc = AdditiveOscillator::new(SampleRate::new(SAMPLE_RATE));
    for osc in [&mut stereo_osc, &mut mono_osc] {
        osc.set_stretch(1.1, StretchQuantization::Continuous);
        osc.set_frequency(110.0);
    }

    for _ in 0..1000 {
        spectrum.smoothen();
        mono.smoothen();
        stereo_osc.process(&spectrum);
        mono_osc.process(&mono);

        // Partial 1 is not active, so each partial sounds in exactly one channel.
        let sum = stereo_osc.wave() + stereo_osc.wave_r();
        assert!((sum - mono_osc.wave()).abs() < 1.0e-5);
    }
}

#[test]
fn fundamental_oscillator_shapes() {
    let mut osc = FundamentalOscillator::new(SampleRate::new(SAMPLE_RATE));
    osc.set_frequency(SAMPLE_RATE / 8.0);

    let mut sine = Vec::new();
    for _ in 0..8 {
        osc.process();
        sine.push(osc.wave());
    }
    assert!(sine[0].abs() < 1.0e-6);
    assert!((sine[2] - 1.0).abs() < 1.0e-5);
    assert!((sine[6] + 1.0).abs() < 1.0e-5);

    osc.reset();
    osc.set_shape(FundamentalShape::Square);
    let mut square = Vec::new();
    for _ in 0..8 {
        osc.process();
        square.push(osc.wave());
    }
    // Samples 0 and 4 sit on the edges.
    assert_eq!(&square[1..4], &[1.0, 1.0, 1.0]);
    assert_eq!(&square[5..8], &[-1.0, -1.0, -1.0]);

    // Silent at and above Nyquist.
    osc.set_frequency(SAMPLE_RATE * 0.6);
    for _ in 0..16 {
        osc.process();
        assert_eq!(osc.wave(), 0.0);
    }
}

#[test]
fn fundamental_follows_lowest_octave() {
    assert_eq!(octave_multiplier(1, 1.0), 1.0);
    assert_eq!(octave_multiplier(4, 1.0), 4.0);
    assert_eq!(octave_multiplier(5, 1.0), 4.0);
    assert_eq!(octave_multiplier(8, 1.0), 8.0);
    assert_eq!(octave_multiplier(3, 0.5), 2.0);
    assert_eq!(octave_multiplier(2, -4.0), 2.0);
    assert_eq!(octave_multiplier(100, 0.0), 1.0);
    assert_eq!(octave_multiplier(3, -0.5), 1.0);
    assert_eq!(octave_multiplier(1000, f32::MAX), 1.0);
}

#[test]
fn additive_oscillator_stretch_sweep() {
    let duration = 4.0;

    let mut spectrum = Spectrum::<128>::new();
    spectrum.set_lowest_highest(1.0, 33.0);
    spectrum.set_tilt(-0.7);
    spectrum.set_stereo_mode(StereoMode::SoftPan);
    spectrum.set_smoothing_coefficient(1.0 / BLOCK_SIZE as f32);

    let mut osc = AdditiveOscillator::new(SampleRate::new(SAMPLE_RATE));
    osc.set_frequency(110.0);

    let buffer = CvBuffer::new(0, 0, 0);
    let blocks = (duration * SAMPLE_RATE / (BLOCK_SIZE as f32)) as usize;
    let mut left = Vec::new();
    let mut right = Vec::new();

    for n in 0..blocks {
        let stretch = modulation::scale(modulation::ramp_up(n, blocks), -1.0, 2.0);
        osc.set_stretch(stretch, StretchQuantization::Continuous);
        spectrum.process(&buffer);

        for _ in 0..BLOCK_SIZE {
            spectrum.smoothen();
            osc.process(&spectrum);
            left.push(osc.wave());
            right.push(osc.wave_r());
        }
    }

    assert!(left.iter().chain(right.iter()).all(|x| x.is_finite() && x.abs() <= 1.0 + 1.0e-4));

    wav_writer::write_stereo("oscillator/additive_stretch.wav", &left, &right).ok();
}

#[test]
fn additive_oscillator_consonant_stretch() {
    let duration = 4.0;

    let mut spectrum = Spectrum::<128>::new();
    spectrum.set_lowest_highest(1.0, 17.0);
    spectrum.set_tilt(-0.5);
    spectrum.set_smoothing_coefficient(1.0 / BLOCK_SIZE as f32);

    let mut osc = AdditiveOscillator::new(SampleRate::new(SAMPLE_RATE));
    osc.set_frequency(220.0);

    let buffer = CvBuffer::new(0, 0, 0);
    let blocks = (duration * SAMPLE_RATE / (BLOCK_SIZE as f32)) as usize;
    let mut wav_data = Vec::new();

    for n in 0..blocks {
        let stretch = modulation::triangle(n, blocks, 2.0) + 0.5;
        osc.set_stretch(stretch, StretchQuantization::Consonants);
        spectrum.process(&buffer);

        for _ in 0..BLOCK_SIZE {
            spectrum.smoothen();
            osc.process(&spectrum);
            wav_data.push(osc.wave());
        }
    }

    wav_writer::write("oscillator/additive_consonants.wav", &wav_data).ok();
}
