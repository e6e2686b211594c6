//! PS/2 frame layout and the bit-level framing state machine.
//!
//! A frame is 11 bits sent least significant first: start (0), eight data
//! bits, odd parity, stop (1). The shift register keeps the first received
//! bit in position 0 once the frame is complete.

use thiserror::Error;

pub const FRAME_BITS: u8 = 11;

const START_BIT: u16 = 1 << 0;
const STOP_BIT: u16 = 1 << 10;
const FRAME_MASK: u16 = (1 << FRAME_BITS) - 1;

/// Why a complete frame was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("start bit is not 0")]
    Start,
    #[error("stop bit is not 1")]
    Stop,
    #[error("parity mismatch")]
    Parity,
}

impl FrameError {
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::Start | Self::Stop)
    }
}

/// Odd parity bit for a payload byte
pub fn parity_bit(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

/// Build the 11-bit frame for `byte`, bit 0 goes on the wire first
pub fn encode(byte: u8) -> u16 {
    (u16::from(byte) << 1) | (u16::from(parity_bit(byte)) << 9) | STOP_BIT
}

/// Check a complete frame and extract its payload
pub fn decode(bits: u16) -> Result<u8, FrameError> {
    let bits = bits & FRAME_MASK;
    if bits & STOP_BIT == 0 {
        return Err(FrameError::Stop);
    }
    if bits & START_BIT != 0 {
        return Err(FrameError::Start);
    }
    // XOR over the whole frame; start and stop contribute exactly one set
    // bit, so this is zero when payload plus parity has odd weight.
    if bits.count_ones() % 2 != 0 {
        return Err(FrameError::Parity);
    }
    Ok((bits >> 1) as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    Empty,
    Accumulating,
    Validating,
}

/// Inputs sampled by the framer on one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerInput {
    /// Bus idle, abort whatever is in flight
    pub reset: bool,
    /// Confirmed falling edge of the clock line
    pub edge: bool,
    /// Synchronized data line
    pub dat: bool,
}

/// What the framer did with a frame on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Accepted(u8),
    Rejected(FrameError),
    /// A partial frame was dropped by the idle reset
    Aborted { bit_count: u8 },
}

/// Shift register and bit counter of the frame being received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Framer {
    bits: u16,
    bit_count: u8,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn bit_count(&self) -> u8 {
        self.bit_count
    }

    pub fn state(&self) -> FramerState {
        match self.bit_count {
            0 => FramerState::Empty,
            FRAME_BITS => FramerState::Validating,
            _ => FramerState::Accumulating,
        }
    }

    /// Advance one tick. Idle reset beats a new edge, which beats
    /// validation of a complete frame.
    pub fn step(self, input: FramerInput) -> (Framer, Option<FrameOutcome>) {
        if input.reset {
            let outcome = (self.bit_count != 0).then_some(FrameOutcome::Aborted {
                bit_count: self.bit_count,
            });
            return (Framer::new(), outcome);
        }

        if input.edge {
            let framer = Framer {
                bits: (self.bits >> 1) | (u16::from(input.dat) << (FRAME_BITS - 1)),
                bit_count: (self.bit_count + 1).min(FRAME_BITS),
            };
            return (framer, None);
        }

        if self.bit_count == FRAME_BITS {
            let outcome = match decode(self.bits) {
                Ok(byte) => FrameOutcome::Accepted(byte),
                Err(err) => FrameOutcome::Rejected(err),
            };
            return (Framer::new(), Some(outcome));
        }

        (self, None)
    }
}
