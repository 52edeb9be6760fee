//! Collection of oscillators.

pub mod additive_oscillator;
pub mod fundamental_oscillator;
pub mod phasor;
