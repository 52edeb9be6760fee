//! CV buffer: circular history of a control signal, read back per partial.
//!
//! One sample is pushed per control tick. Every partial reads the history at its own
//! offset, which grows linearly with the partial index (or is drawn from a random
//! table), so a control signal recorded over time gets painted across the spectrum.
//!
//! The delay between neighbouring partials is given relative to the buffer capacity
//! and spread over the number of active partials, so a relative delay of `1.0` always
//! scans the whole history by the time the last partial is reached. With a clock
//! attached, the delay snaps to divisions or multiples of the measured clock period.

pub mod clock;
pub mod following;

use alloc::vec;
use alloc::vec::Vec;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::utils::finite_or;
use crate::utils::random::Random;
use clock::{ClockEvent, ClockMeter};

/// Order in which the partials traverse the buffer history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CvBufferMode {
    /// The lowest partial reads the most recent sample.
    #[default]
    LowHigh,
    /// The highest partial reads the most recent sample.
    HighLow,
    /// Every partial reads at its own random fraction of the delay.
    Random,
}

#[derive(Debug, Clone)]
pub struct CvBuffer {
    line: Vec<f32>,
    write_ptr: usize,

    // Delay between neighbouring partials relative to the capacity, in [-1, 1].
    delay_relative: f32,
    // Resolved delay in samples.
    delay: i32,

    lowest: usize,
    highest: usize,

    enabled: bool,
    frozen: bool,
    mode: CvBufferMode,

    random: Vec<f32>,
    rng: Random,

    clocked: bool,
    clock: ClockMeter,
    clock_mult: i32,
}

impl CvBuffer {
    /// Creates a buffer holding `size` samples with a random table for
    /// `num_partials` partials.
    ///
    /// Allocates, so this must not be called from the audio callback.
    pub fn new(size: usize, num_partials: usize, seed: u32) -> Self {
        let mut buffer = Self {
            line: vec![0.0; size],
            write_ptr: 0,
            delay_relative: 0.0,
            delay: 0,
            lowest: 1,
            highest: 1,
            enabled: false,
            frozen: false,
            mode: CvBufferMode::default(),
            random: vec![0.0; num_partials],
            rng: Random::new(seed),
            clocked: false,
            clock: ClockMeter::new(),
            clock_mult: 0,
        };
        buffer.randomize();

        log::trace!("CV buffer created: {size} samples, {num_partials} partials");

        buffer
    }

    /// Changes the capacity. The history is cleared when the size actually changes.
    ///
    /// Allocates, so this must not be called from the audio callback.
    pub fn resize(&mut self, size: usize) {
        if self.line.len() == size {
            return;
        }

        self.line = vec![0.0; size];
        self.write_ptr = 0;
        self.delay = 0;

        log::debug!("CV buffer resized to {size} samples");
    }

    /// Clears the history.
    pub fn empty(&mut self) {
        self.line.fill(0.0);
    }

    /// Draws a new random table for the random traversal mode.
    pub fn randomize(&mut self) {
        for r in self.random.iter_mut() {
            *r = self.rng.get_float();
        }
    }

    #[inline]
    pub fn push(&mut self, value: f32) {
        if self.frozen || self.line.is_empty() {
            return;
        }

        self.line[self.write_ptr] = finite_or(value, 0.0);
        self.write_ptr += 1;
        if self.write_ptr >= self.line.len() {
            self.write_ptr = 0;
        }
    }

    /// Sets the range of active partials. Ignored while frozen.
    pub fn set_lowest_highest(&mut self, lowest: f32, highest: f32) {
        if self.frozen {
            return;
        }

        self.lowest = (finite_or(lowest, 1.0) as i32).max(1) as usize;
        self.highest = (finite_or(highest, 1.0) as i32).max(self.lowest as i32) as usize;
    }

    /// Sets the delay between neighbouring partials relative to the capacity.
    #[inline]
    pub fn set_delay_relative(&mut self, delay_relative: f32) {
        self.delay_relative = finite_or(delay_relative, 0.0).clamp(-1.0, 1.0);
    }

    /// Sets the traversal order. Ignored while frozen.
    #[inline]
    pub fn set_mode(&mut self, mode: CvBufferMode) {
        if !self.frozen {
            self.mode = mode;
        }
    }

    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[inline]
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    #[inline]
    pub fn set_clocked(&mut self, clocked: bool) {
        self.clocked = clocked;
    }

    #[inline]
    pub fn set_clock_trigger(&mut self, trigger: bool) {
        self.clock.set_trigger(trigger);
    }

    /// Number of control ticks without a clock edge after which the buffer
    /// falls back to unclocked operation.
    #[inline]
    pub fn set_clock_timeout(&mut self, timeout: usize) {
        self.clock.set_timeout(timeout);
    }

    #[inline]
    pub fn lowest(&self) -> usize {
        self.lowest
    }

    #[inline]
    pub fn highest(&self) -> usize {
        self.highest
    }

    #[inline]
    pub fn delay(&self) -> i32 {
        self.delay
    }

    #[inline]
    pub fn delay_relative(&self) -> f32 {
        self.delay_relative
    }

    #[inline]
    pub fn mode(&self) -> CvBufferMode {
        self.mode
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn is_clocked(&self) -> bool {
        self.clocked
    }

    /// Measured clock period in control ticks.
    #[inline]
    pub fn clock_time(&self) -> usize {
        self.clock.time()
    }

    /// Clock ratio of the resolved delay: `-n` for a division by `n`, `n` for a
    /// multiple, 0 when unclocked.
    #[inline]
    pub fn clock_mult(&self) -> i32 {
        self.clock_mult
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.line.len()
    }

    /// Resolves the delay for this control tick.
    ///
    /// Must run once per tick, before any [`CvBuffer::value`] calls.
    pub fn process(&mut self) {
        self.process_clock();

        if !self.frozen {
            self.resolve_delay();
        }
    }

    /// Value read by partial `partial` (1-based).
    #[inline]
    pub fn value(&self, partial: usize) -> f32 {
        self.read(self.read_offset(partial))
    }

    /// Number of pushes between the most recent sample and the one read by `partial`.
    ///
    /// In the linear modes, partials outside the range read like the nearest edge of
    /// it. Offsets beyond the capacity read 0.
    pub fn read_offset(&self, partial: usize) -> usize {
        let delay = self.delay.unsigned_abs() as usize;

        match self.mode {
            CvBufferMode::LowHigh | CvBufferMode::HighLow => {
                let steps = if self.delay > 0 {
                    partial.saturating_sub(self.lowest)
                } else {
                    self.highest.saturating_sub(partial)
                };
                delay.saturating_mul(steps)
            }
            CvBufferMode::Random => {
                if self.random.is_empty() {
                    return 0;
                }
                let mut offset = delay as f32 * self.random[partial % self.random.len()];
                if self.clocked {
                    offset *= (self.highest - self.lowest) as f32;
                }
                offset as usize
            }
        }
    }

    #[inline]
    fn read(&self, offset: usize) -> f32 {
        let size = self.line.len();
        if offset >= size {
            return 0.0;
        }

        self.line[(size + self.write_ptr - offset - 1) % size]
    }

    #[inline]
    fn process_clock(&mut self) {
        match self.clock.process() {
            ClockEvent::Edge => self.clocked = true,
            ClockEvent::Timeout => self.clocked = false,
            ClockEvent::None => {}
        }
    }

    /// Takes over the clock period of another buffer instead of measuring one.
    #[inline]
    fn follow_clock(&mut self, time: usize) {
        self.clocked = true;
        self.clock.set_time(time);
    }

    fn resolve_delay(&mut self) {
        let size = self.line.len() as f32;
        let count = (self.highest + 1).saturating_sub(self.lowest);

        // Delay per partial, spreading the requested excursion over the active range.
        let spread = if count > 0 {
            (self.delay_relative * size / count as f32) as i32
        } else {
            0
        };

        self.clock_mult = 0;

        let delay = if !self.clocked {
            match self.mode {
                CvBufferMode::Random => (self.delay_relative * size) as i32,
                _ => spread,
            }
        } else {
            let clock_time = self.clock.time().min(i32::MAX as usize) as i32;
            if clock_time == 0 || spread == 0 {
                0
            } else if spread.abs() < clock_time {
                let division = ((clock_time as f32 / spread.abs() as f32).round() as i32).max(1);
                self.clock_mult = -division;
                spread.signum() * (clock_time / division)
            } else {
                let multiple = ((spread.abs() as f32 / clock_time as f32).round() as i32).max(1);
                self.clock_mult = multiple;
                spread.signum() * clock_time.saturating_mul(multiple)
            }
        };

        self.delay = match self.mode {
            CvBufferMode::HighLow => -delay,
            _ => delay,
        };
    }
}
