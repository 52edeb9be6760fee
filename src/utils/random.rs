//! Fast pseudo random number generator.
//!
//! Linear congruential generator with the constants from Numerical Recipes. Each
//! voice owns its own instance, so voices never share random state.

#[derive(Debug, Clone)]
pub struct Random {
    state: u32,
}

impl Default for Random {
    fn default() -> Self {
        Self::new(0x21)
    }
}

impl Random {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub fn seed(&mut self, seed: u32) {
        self.state = seed;
    }

    #[inline]
    pub fn get_word(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Returns a float in `[0.0, 1.0)`.
    #[inline]
    pub fn get_float(&mut self) -> f32 {
        // 24 bits fit the f32 mantissa, so the result never rounds up to 1.0.
        (self.get_word() >> 8) as f32 / 16777216.0
    }
}
