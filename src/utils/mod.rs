//! Utility functions shared by the spectral and oscillator code.

pub mod random;
pub mod units;

#[inline]
pub fn one_pole(out: &mut f32, in_: f32, coefficient: f32) {
    *out += (coefficient) * ((in_) - *out);
}

/// Returns `x` if it is finite, `fallback` otherwise.
#[inline]
pub fn finite_or(x: f32, fallback: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

/// Fractional part of a non-negative value.
#[inline]
pub fn fractional(x: f32) -> f32 {
    x - (x as i32) as f32
}
