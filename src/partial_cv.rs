//! Pitch and amplitude of the individual partials as control voltages.
//!
//! Lets the partials of a voice drive an external bank of oscillators: channel `k`
//! carries partial `lowest_index + k` as a 1 V/oct pitch and a unipolar amplitude.

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::spectrum::Spectrum;

/// Pitches further than this many octaves from the fundamental are muted.
const MAX_OCTAVES: f32 = 10.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PartialCv {
    /// Pitch in octaves, relative to the same reference as the fundamental pitch.
    pub pitch: f32,
    /// Smoothed amplitude magnitude.
    pub amplitude: f32,
}

/// Fills `out` with the partials starting at the lowest active one.
///
/// Partials whose frequency ratio is zero or too far out of range get the
/// fundamental pitch and zero amplitude.
pub fn partial_cv<const NUM_PARTIALS: usize>(
    spectrum: &Spectrum<NUM_PARTIALS>,
    stretch: f32,
    fundamental_pitch: f32,
    out: &mut [PartialCv],
) {
    let lowest = spectrum.lowest_index();

    for (k, cv) in out.iter_mut().enumerate() {
        let partial = lowest + k;
        let ratio = (1.0 + (partial as f32 - 1.0) * stretch).abs();
        let pitch = fundamental_pitch + ratio.log2();

        *cv = if pitch.is_finite() && (pitch - fundamental_pitch).abs() <= MAX_OCTAVES {
            PartialCv {
                pitch,
                amplitude: spectrum.amp(partial).abs(),
            }
        } else {
            PartialCv {
                pitch: fundamental_pitch,
                amplitude: 0.0,
            }
        };
    }
}
