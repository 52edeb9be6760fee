//! CV buffer slaved to a master buffer.
//!
//! Buffers can be chained across modules: a follower copies the partial range of its
//! master and, depending on the follow mode, its clock or its complete delay
//! resolution. The master is passed in on every control tick as a plain shared
//! reference. When it is `None` (the master went away) the follower runs free over
//! partials 1 to [`MAX_CHANNELS`].
//!
//! The master has to be processed before its followers on every tick.
//!
//! The follower also renders its buffer as a set of control voltages, one channel
//! per partial of the range, smoothed from control rate to audio rate.

use alloc::vec;
use alloc::vec::Vec;

use super::CvBuffer;
use crate::utils::{finite_or, one_pole};

/// Number of output channels, also the range width without a master.
pub const MAX_CHANNELS: usize = 16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FollowMode {
    /// Independent buffer, only the partial range is taken from the master.
    #[default]
    Free,
    /// Uses the clock period measured by the master, resolves its own delay.
    Sync,
    /// Mirrors the resolved delay and traversal mode of the master.
    GetDelayTime,
}

#[derive(Debug, Clone)]
pub struct FollowingCvBuffer {
    buffer: CvBuffer,
    follow_mode: FollowMode,
    linked: bool,
    // The clock period currently comes from the master.
    borrowed_clock: bool,

    channels: usize,
    master_channels: usize,
    values_smooth: Vec<f32>,
    smoothing_coefficient: f32,

    reset_state: bool,
    randomized_state: bool,
}

impl FollowingCvBuffer {
    pub fn new(size: usize, num_partials: usize, seed: u32) -> Self {
        let mut buffer = CvBuffer::new(size, num_partials, seed);
        buffer.set_enabled(true);
        buffer.set_lowest_highest(1.0, MAX_CHANNELS as f32);

        Self {
            buffer,
            follow_mode: FollowMode::default(),
            linked: false,
            borrowed_clock: false,
            channels: MAX_CHANNELS,
            master_channels: MAX_CHANNELS,
            values_smooth: vec![0.0; MAX_CHANNELS],
            smoothing_coefficient: 1.0,
            reset_state: false,
            randomized_state: false,
        }
    }

    #[inline]
    pub fn set_follow_mode(&mut self, follow_mode: FollowMode) {
        self.follow_mode = follow_mode;
    }

    #[inline]
    pub fn follow_mode(&self) -> FollowMode {
        self.follow_mode
    }

    /// Number of channels the master outputs, used while linked. Clamped to
    /// `[1, MAX_CHANNELS]`.
    #[inline]
    pub fn set_master_channels(&mut self, channels: usize) {
        self.master_channels = channels.clamp(1, MAX_CHANNELS);
    }

    /// Number of output channels: the master's while linked, [`MAX_CHANNELS`]
    /// otherwise.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sets the per-sample smoothing coefficient of the outputs, usually
    /// `1 / control block size`.
    #[inline]
    pub fn set_smoothing_coefficient(&mut self, coefficient: f32) {
        self.smoothing_coefficient = finite_or(coefficient, 1.0).clamp(0.0, 1.0);
    }

    /// Returns `true` if the last tick was processed with a master present.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    #[inline]
    pub fn buffer(&self) -> &CvBuffer {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut CvBuffer {
        &mut self.buffer
    }

    /// Freezes the buffer. When mirroring a master's delay time, the master's
    /// frozen state wins over the requested one.
    #[inline]
    pub fn set_frozen(&mut self, frozen: bool, master: Option<&CvBuffer>) {
        let frozen = match master {
            Some(master) if self.follow_mode == FollowMode::GetDelayTime => master.is_frozen(),
            _ => frozen,
        };
        self.buffer.set_frozen(frozen);
    }

    /// Edge-detected reset, fed with the own reset signal or the master's. Draws a
    /// new random table on the rising edge and, with `empty`, clears the history.
    ///
    /// Returns `true` while the reset is held, in which case the tick should not
    /// be processed.
    pub fn reset_if(&mut self, reset: bool, empty: bool) -> bool {
        if !reset {
            self.reset_state = false;
            return false;
        }

        if !self.reset_state {
            self.reset_state = true;
            self.buffer.randomize();
            if empty {
                self.buffer.empty();
            }
        }

        true
    }

    /// Edge-detected randomization following the master. Draws a new random table
    /// on the rising edge of `master_randomized` and returns `true` on that edge.
    pub fn randomize_if(&mut self, master_randomized: bool) -> bool {
        if !master_randomized {
            self.randomized_state = false;
            return false;
        }
        if self.randomized_state {
            return false;
        }

        self.randomized_state = true;
        self.buffer.randomize();

        true
    }

    /// Resolves the delay for this control tick.
    pub fn process(&mut self, master: Option<&CvBuffer>) {
        if master.is_some() != self.linked {
            self.linked = master.is_some();
            log::debug!(
                "CV buffer {}",
                if self.linked {
                    "linked to master"
                } else {
                    "lost master, running free"
                }
            );
        }

        let Some(master) = master else {
            // The borrowed clock is gone, wait for an own edge.
            self.release_clock();
            self.channels = MAX_CHANNELS;
            self.buffer.set_lowest_highest(1.0, MAX_CHANNELS as f32);
            self.buffer.process();
            return;
        };

        self.channels = self.master_channels;
        self.buffer
            .set_lowest_highest(master.lowest() as f32, master.highest() as f32);

        match self.follow_mode {
            FollowMode::Free => {
                self.release_clock();
                self.buffer.process();
            }
            FollowMode::Sync => {
                if master.is_clocked() {
                    self.borrowed_clock = true;
                    self.buffer.follow_clock(master.clock_time());
                } else {
                    self.release_clock();
                    self.buffer.process_clock();
                }
                if !self.buffer.frozen {
                    self.buffer.resolve_delay();
                }
            }
            FollowMode::GetDelayTime => {
                self.release_clock();
                self.buffer.process_clock();
                if !self.buffer.frozen {
                    self.buffer.delay = master.delay();
                    self.buffer.mode = master.mode();
                    self.buffer.clock_mult = master.clock_mult();
                }
            }
        }
    }

    #[inline]
    fn release_clock(&mut self) {
        if self.borrowed_clock {
            self.borrowed_clock = false;
            self.buffer.clocked = false;
        }
    }

    #[inline]
    pub fn push(&mut self, value: f32) {
        self.buffer.push(value);
    }

    #[inline]
    pub fn value(&self, partial: usize) -> f32 {
        self.buffer.value(partial)
    }

    /// Moves the output channels one step towards the buffer values. Call once per
    /// sample.
    ///
    /// Partial `lowest + k` lands on channel `(lowest - 1 + k) % channels`, so a
    /// channel keeps its partial while the range shifts.
    #[inline]
    pub fn smoothen(&mut self) {
        let lowest = self.buffer.lowest();
        let channels = self.channels;

        for partial in lowest..lowest + channels {
            let channel = (partial - 1) % channels;
            one_pole(
                &mut self.values_smooth[channel],
                self.buffer.value(partial),
                self.smoothing_coefficient,
            );
        }
    }

    /// Copies the smoothed channel values into `out`, up to the channel count.
    #[inline]
    pub fn values(&self, out: &mut [f32]) {
        for (out, value) in out.iter_mut().zip(&self.values_smooth[..self.channels]) {
            *out = *value;
        }
    }
}
