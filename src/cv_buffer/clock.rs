//! Clock period measurement for the CV buffer.
//!
//! Counts control ticks between rising edges of a trigger signal. A rising edge
//! closes the running measurement window and opens the next one, so edges every
//! `n` ticks measure a period of `n`.

#[derive(Debug, Clone)]
pub struct ClockMeter {
    time: usize,
    counter: usize,
    trigger: bool,
    triggered: bool,
    timeout: usize,
}

impl Default for ClockMeter {
    fn default() -> Self {
        Self {
            time: 0,
            counter: 0,
            trigger: false,
            triggered: false,
            timeout: usize::MAX,
        }
    }
}

/// Result of one clock measurement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Nothing happened on this tick.
    None,
    /// A rising edge was detected and the period was updated.
    Edge,
    /// No edge arrived within the timeout.
    Timeout,
}

impl ClockMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self) {
        self.time = 0;
        self.counter = 0;
        self.triggered = false;
    }

    #[inline]
    pub fn set_trigger(&mut self, trigger: bool) {
        self.trigger = trigger;
    }

    /// Number of ticks without an edge after which the clock is considered gone.
    #[inline]
    pub fn set_timeout(&mut self, timeout: usize) {
        self.timeout = timeout;
    }

    #[inline]
    pub fn trigger(&self) -> bool {
        self.trigger
    }

    /// Last measured period in control ticks, 0 before the second edge.
    #[inline]
    pub fn time(&self) -> usize {
        self.time
    }

    /// Replaces the measured period, used when following another clock.
    #[inline]
    pub fn set_time(&mut self, time: usize) {
        self.time = time;
    }

    #[inline]
    pub fn process(&mut self) -> ClockEvent {
        let mut event = ClockEvent::None;

        if self.trigger && !self.triggered {
            self.time = self.counter;
            // The edge tick belongs to the new period.
            self.counter = 1;
            self.triggered = true;
            event = ClockEvent::Edge;
        } else {
            if !self.trigger {
                self.triggered = false;
            }
            self.counter = self.counter.saturating_add(1);
        }

        if self.counter > self.timeout {
            self.counter = 0;
            event = ClockEvent::Timeout;
        }

        event
    }
}
