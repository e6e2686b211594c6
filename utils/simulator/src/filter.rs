//! Timer-based conditioning of the synchronized PS/2 clock line.

use crate::timer::WaitTimer;

/// Ticks the clock line must hold its level before an edge is trusted
pub const DEBOUNCE_TICKS: u32 = 10;

/// One frame takes about 1.1 ms, so 1.5 ms of high clock means nobody is
/// transmitting.
pub const IDLE_GAP_SECS: f64 = 1.5e-3;

/// Number of system clock ticks in one idle gap
pub fn idle_ticks(sys_clk_freq: u32) -> u32 {
    (f64::from(sys_clk_freq) * IDLE_GAP_SECS).round() as u32
}

/// Declares the bus idle after the clock line stays high for a full gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleDetector {
    timer: WaitTimer,
}

impl IdleDetector {
    pub fn new(idle_ticks: u32) -> Self {
        Self {
            timer: WaitTimer::new(idle_ticks),
        }
    }

    /// Level, held for as long as the clock line stays high past the gap
    pub fn idle(&self) -> bool {
        self.timer.done()
    }

    pub fn threshold(&self) -> u32 {
        self.timer.limit()
    }

    pub fn tick(&mut self, clk: bool) {
        self.timer.tick(clk);
    }
}

/// Debounce and falling-edge detection for the clock line.
///
/// The line counts as stable once it has held one level for
/// [`DEBOUNCE_TICKS`] consecutive ticks. A registered pulse fires on the
/// tick after `stable` rises, so every settled level change yields exactly
/// one pulse. Pulses on settled rising edges are masked by [`falling_edge`].
///
/// [`falling_edge`]: EdgeFilter::falling_edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeFilter {
    prev_clk: bool,
    timer: WaitTimer,
    stable_d: bool,
    pulse: bool,
}

impl EdgeFilter {
    pub fn new() -> Self {
        Self {
            prev_clk: true,
            timer: WaitTimer::new(DEBOUNCE_TICKS),
            stable_d: false,
            pulse: false,
        }
    }

    pub fn stable(&self) -> bool {
        self.timer.done()
    }

    pub fn pulse(&self) -> bool {
        self.pulse
    }

    /// Confirmed falling edge for the tick where the clock line reads `clk`
    pub fn falling_edge(&self, clk: bool) -> bool {
        self.pulse && !clk
    }

    pub fn tick(&mut self, clk: bool) {
        let stable = self.timer.done();
        self.timer.tick(self.prev_clk == clk);
        self.pulse = stable && !self.stable_d;
        self.stable_d = stable;
        self.prev_clk = clk;
    }
}

impl Default for EdgeFilter {
    fn default() -> Self {
        Self::new()
    }
}
