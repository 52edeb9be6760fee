//! Pitch conversions.

#[allow(unused_imports)]
use num_traits::float::Float;

/// Frequency of C0 in Hz, the reference for 0 V/oct.
pub const C0_HZ: f32 = 16.351_597;

/// Converts a pitch in octaves above C0 to a frequency in Hz.
#[inline]
pub fn octaves_to_frequency(octaves: f32) -> f32 {
    C0_HZ * octaves.exp2()
}

/// Quantizes a pitch in octaves to whole octaves.
#[inline]
pub fn quantize_octaves(octaves: f32) -> f32 {
    octaves.round()
}

/// Quantizes a pitch in octaves to semitones.
#[inline]
pub fn quantize_semitones(octaves: f32) -> f32 {
    (12.0 * octaves).round() / 12.0
}
