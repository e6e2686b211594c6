//! Host-side model of a PS/2 keyboard or mouse transmitting to the receiver.
//!
//! The device owns both lines while it sends. Each bit is one clock period:
//! the data line changes halfway through the clock-high phase and holds
//! through the clock-low phase, where the host samples it. Between frames
//! both lines are released and read high.

use std::collections::VecDeque;

use tracing::warn;

use crate::error::{Result, SimError};
use crate::filter::DEBOUNCE_TICKS;
use crate::frame::{FRAME_BITS, encode};
use crate::sync::Pins;

pub const PS2_CLK_MIN_HZ: u32 = 10_000;
pub const PS2_CLK_MAX_HZ: u32 = 16_700;
pub const PS2_CLK_DEFAULT_HZ: u32 = 12_500;

/// Shortest clock phase the receiver can follow with margin to spare
const MIN_HALF_PERIOD: u32 = 32;

/// Deliberate corruption applied to a transmitted frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameFault {
    #[default]
    None,
    BadStart,
    BadStop,
    BadParity,
    /// Stop clocking after this many bits and release the bus
    Truncated(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub byte: u8,
    pub fault: FrameFault,
}

impl Frame {
    pub fn new(byte: u8) -> Self {
        Self {
            byte,
            fault: FrameFault::None,
        }
    }

    pub fn with_fault(byte: u8, fault: FrameFault) -> Self {
        Self { byte, fault }
    }

    /// Bits as they go on the wire, bit 0 first
    pub fn bits(&self) -> u16 {
        let bits = encode(self.byte);
        match self.fault {
            FrameFault::BadStart => bits | 1,
            FrameFault::BadStop => bits & !(1 << 10),
            FrameFault::BadParity => bits ^ (1 << 9),
            FrameFault::None | FrameFault::Truncated(_) => bits,
        }
    }

    /// Number of bits actually clocked out
    pub fn wire_bits(&self) -> u8 {
        match self.fault {
            FrameFault::Truncated(bits) => bits.min(FRAME_BITS),
            _ => FRAME_BITS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    pins: Pins,
    ticks: u32,
}

/// Line driver producing one [`Pins`] sample per system clock tick
#[derive(Debug, Clone)]
pub struct Ps2Device {
    half_period: u32,
    gap: u32,
    glitch: Option<u32>,
    segments: VecDeque<Segment>,
}

impl Ps2Device {
    pub fn new(sys_clk_freq: u32, ps2_clk_hz: u32) -> Result<Self> {
        let half_period = if ps2_clk_hz == 0 {
            0
        } else {
            sys_clk_freq / ps2_clk_hz / 2
        };
        if half_period < MIN_HALF_PERIOD {
            return Err(SimError::InvalidPs2Clock {
                ps2_hz: ps2_clk_hz,
                sys_hz: sys_clk_freq,
                half_period,
            });
        }
        if !(PS2_CLK_MIN_HZ..=PS2_CLK_MAX_HZ).contains(&ps2_clk_hz) {
            warn!(ps2_clk_hz, "PS/2 clock outside the 10-16.7 kHz range devices use");
        }

        Ok(Self {
            half_period,
            gap: 2 * half_period,
            glitch: None,
            segments: VecDeque::new(),
        })
    }

    pub fn half_period(&self) -> u32 {
        self.half_period
    }

    /// Released-bus time appended after every frame
    pub fn set_gap(&mut self, ticks: u32) {
        self.gap = ticks;
    }

    /// Pull the clock low for `ticks` in the middle of every clock-high
    /// phase, where ringing from the data transition would show up. The
    /// spike must be shorter than the debounce window.
    pub fn set_glitch(&mut self, ticks: Option<u32>) -> Result<()> {
        if let Some(ticks) = ticks {
            let room = self.half_period - self.half_period / 2;
            if ticks == 0 || ticks >= room || ticks >= DEBOUNCE_TICKS {
                return Err(SimError::InvalidGlitch {
                    ticks,
                    half_period: self.half_period,
                });
            }
        }
        self.glitch = ticks;
        Ok(())
    }

    pub fn send(&mut self, frame: Frame) {
        let bits = frame.bits();
        let half = self.half_period;
        let lead = half / 2;
        let mut dat = true;

        for i in 0..frame.wire_bits() {
            let next = bits >> i & 1 != 0;
            self.push(Pins::new(true, dat), lead);
            match self.glitch {
                Some(glitch) => {
                    self.push(Pins::new(false, next), glitch);
                    self.push(Pins::new(true, next), half - lead - glitch);
                }
                None => self.push(Pins::new(true, next), half - lead),
            }
            self.push(Pins::new(false, next), half);
            dat = next;
        }

        // Hold the last bit for a beat, then let go of both lines
        self.push(Pins::new(true, dat), lead);
        self.push(Pins::IDLE, self.gap);
    }

    pub fn send_byte(&mut self, byte: u8) {
        self.send(Frame::new(byte));
    }

    /// Keep the bus released for `ticks`
    pub fn pause(&mut self, ticks: u32) {
        self.push(Pins::IDLE, ticks);
    }

    /// Nothing left to transmit
    pub fn is_idle(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn remaining_ticks(&self) -> u64 {
        self.segments.iter().map(|s| u64::from(s.ticks)).sum()
    }

    /// Line levels for the next tick
    pub fn sample(&mut self) -> Pins {
        let Some(segment) = self.segments.front_mut() else {
            return Pins::IDLE;
        };
        let pins = segment.pins;
        segment.ticks -= 1;
        if segment.ticks == 0 {
            self.segments.pop_front();
        }
        pins
    }

    fn push(&mut self, pins: Pins, ticks: u32) {
        if ticks == 0 {
            return;
        }
        match self.segments.back_mut() {
            Some(last) if last.pins == pins => last.ticks += ticks,
            _ => self.segments.push_back(Segment { pins, ticks }),
        }
    }
}
