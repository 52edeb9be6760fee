//! Double precision phase accumulator.

#[allow(unused_imports)]
use num_traits::float::Float;

/// Phase in cycles, wrapped to `[0, 1)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Phasor {
    phase: f64,
    increment: f64,
}

impl Phasor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Phase increment in cycles per sample.
    #[inline]
    pub fn increment(&self) -> f64 {
        self.increment
    }

    #[inline]
    pub fn set_increment(&mut self, increment: f64) {
        self.increment = if increment.is_finite() { increment } else { 0.0 };
    }

    #[inline]
    pub fn advance(&mut self) {
        self.phase += self.increment;
        self.phase -= self.phase.floor();
    }
}
