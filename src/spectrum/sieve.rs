//! Sieve of Eratosthenes over the partial numbers.
//!
//! The sieve level runs continuously from 0 to 31. Its integer part selects a prime
//! from [`PRIMES`], its fractional part fades that prime's multiples in or out, so
//! sweeping the level never makes partials jump.
//!
//! Two variants exist:
//!
//! * Keeping primes: the proper multiples of the primes below the selected one are
//!   removed, the primes themselves stay. Raising the level thins out the spectrum
//!   until only partial 1 and the primes remain.
//! * Removing primes: every multiple of the primes above the selected one is removed,
//!   primes included. Lowering the level leaves fewer and fewer prime families, down
//!   to the powers of two.

/// The first 32 primes, enough to sieve 128 partials.
pub const PRIMES: [usize; 32] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131,
];

/// Highest valid sieve level.
pub const MAX_LEVEL: f32 = (PRIMES.len() - 1) as f32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sieve {
    level: f32,
    keep_primes: bool,
}

impl Default for Sieve {
    /// Removing primes at the highest level, which leaves every partial in place.
    fn default() -> Self {
        Self {
            level: MAX_LEVEL,
            keep_primes: false,
        }
    }
}

impl Sieve {
    pub fn new(level: f32, keep_primes: bool) -> Self {
        let mut sieve = Self::default();
        sieve.set_level(level);
        sieve.set_keep_primes(keep_primes);
        sieve
    }

    #[inline]
    pub fn set_level(&mut self, level: f32) {
        self.level = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, MAX_LEVEL)
        };
    }

    #[inline]
    pub fn set_keep_primes(&mut self, keep_primes: bool) {
        self.keep_primes = keep_primes;
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    pub fn keep_primes(&self) -> bool {
        self.keep_primes
    }

    /// Index into [`PRIMES`] of the prime whose multiples are faded.
    #[inline]
    pub fn boundary(&self) -> usize {
        self.level as usize
    }

    /// Gain applied to the multiples of the boundary prime.
    #[inline]
    pub fn fade(&self) -> f32 {
        let boundary = self.boundary() as f32;
        if self.keep_primes {
            boundary + 1.0 - self.level
        } else {
            self.level - boundary
        }
    }

    /// Removes sieved partials and fades the boundary prime.
    ///
    /// `amplitudes[k]` holds partial `k + 1`. Only partials up to `highest` are touched.
    pub fn apply(&self, amplitudes: &mut [f32], highest: usize) {
        let boundary = self.boundary();

        let removed = if self.keep_primes {
            &PRIMES[..boundary]
        } else {
            &PRIMES[boundary + 1..]
        };
        for &prime in removed {
            for partial in self.multiples(prime, highest) {
                if let Some(amplitude) = amplitudes.get_mut(partial - 1) {
                    *amplitude = 0.0;
                }
            }
        }

        self.apply_fade(amplitudes, highest);
    }

    /// Scales the multiples of the boundary prime by the fade gain.
    pub fn apply_fade(&self, amplitudes: &mut [f32], highest: usize) {
        let fade = self.fade();
        for partial in self.multiples(PRIMES[self.boundary()], highest) {
            if let Some(amplitude) = amplitudes.get_mut(partial - 1) {
                *amplitude *= fade;
            }
        }
    }

    /// Multiples of `prime` up to `highest` that this variant acts on: proper
    /// multiples when keeping primes, all multiples otherwise.
    #[inline]
    fn multiples(&self, prime: usize, highest: usize) -> impl Iterator<Item = usize> {
        let first = if self.keep_primes { 2 * prime } else { prime };
        (first..=highest).step_by(prime)
    }
}
