use tracing::{debug, trace};

use crate::error::{Result, SimError};
use crate::fifo::SyncFifo;
use crate::filter::{DEBOUNCE_TICKS, EdgeFilter, IdleDetector, idle_ticks};
use crate::frame::{FrameOutcome, Framer, FramerInput};
use crate::regs::{self, RxStatus};
use crate::sync::{LineSync, Pins};

/// Depth of the receive FIFO
pub const FIFO_DEPTH: usize = 16;

/// Diagnostic counters. None of these are visible through the CSRs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Frames that passed validation
    pub frames: u64,
    /// Bad start or stop bit
    pub framing_errors: u64,
    pub parity_errors: u64,
    /// Valid bytes lost to a full FIFO
    pub overflows: u64,
    /// Partial frames dropped by the idle reset
    pub aborted: u64,
}

/// Snapshot of the receiver's internal signals, used for tracing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub clk_raw: bool,
    pub dat_raw: bool,
    pub clk: bool,
    pub dat: bool,
    pub idle: bool,
    pub stable: bool,
    pub pulse: bool,
    pub bit_count: u8,
    pub bits: u16,
    pub valid: bool,
    pub data: u8,
    pub irq: bool,
}

/// Cycle-accurate model of the PS/2 receive peripheral.
///
/// Every call to [`tick`](Self::tick) is one rising edge of the system
/// clock. All register state is read as it was at the start of the tick, so
/// a byte validated on tick `n` sits in the write port on `n + 1` and is
/// readable from RX on `n + 2`.
pub struct Ps2Receiver {
    sys_clk_freq: u32,
    raw: Pins,
    sync: LineSync,
    idle: IdleDetector,
    edge: EdgeFilter,
    framer: Framer,
    write_port: Option<u8>,
    fifo: SyncFifo<FIFO_DEPTH>,
    pop_request: bool,
    ev_enable: bool,
    stats: Stats,
    cycle: u64,
}

impl Ps2Receiver {
    pub fn new(sys_clk_freq: u32) -> Result<Self> {
        let idle_ticks = idle_ticks(sys_clk_freq);
        if idle_ticks <= DEBOUNCE_TICKS {
            return Err(SimError::InvalidClock(sys_clk_freq));
        }

        Ok(Self {
            sys_clk_freq,
            raw: Pins::IDLE,
            sync: LineSync::new(),
            idle: IdleDetector::new(idle_ticks),
            edge: EdgeFilter::new(),
            framer: Framer::new(),
            write_port: None,
            fifo: SyncFifo::new(),
            pop_request: false,
            ev_enable: false,
            stats: Stats::default(),
            cycle: 0,
        })
    }

    pub fn sys_clk_freq(&self) -> u32 {
        self.sys_clk_freq
    }

    pub fn idle_threshold(&self) -> u32 {
        self.idle.threshold()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn framer(&self) -> Framer {
        self.framer
    }

    /// Buffered bytes, oldest first
    pub fn queued(&self) -> Vec<u8> {
        self.fifo.iter().collect()
    }

    /// No frame in flight and nothing waiting to enter the FIFO
    pub fn is_settled(&self) -> bool {
        self.framer.bit_count() == 0 && self.write_port.is_none()
    }

    /// Advance one system clock tick with `pins` on the external lines
    pub fn tick(&mut self, pins: Pins) {
        let Pins { clk, dat } = self.sync.output();
        let reset = self.idle.idle();
        let edge = self.edge.falling_edge(clk);

        // FIFO: writable is judged before this tick's pop, like a
        // synchronous FIFO with registered level.
        let full = self.fifo.is_full();
        if self.pop_request {
            self.fifo.pop();
            self.pop_request = false;
        }
        if let Some(byte) = self.write_port.take() {
            if full || !self.fifo.push(byte) {
                self.stats.overflows += 1;
                debug!(cycle = self.cycle, byte, "rx fifo full, dropping byte");
            }
        }

        let (framer, outcome) = self.framer.step(FramerInput { reset, edge, dat });
        self.framer = framer;
        match outcome {
            Some(FrameOutcome::Accepted(byte)) => {
                trace!(cycle = self.cycle, byte, "frame accepted");
                self.stats.frames += 1;
                self.write_port = Some(byte);
            }
            Some(FrameOutcome::Rejected(err)) => {
                debug!(cycle = self.cycle, %err, "frame rejected");
                if err.is_framing() {
                    self.stats.framing_errors += 1;
                } else {
                    self.stats.parity_errors += 1;
                }
            }
            Some(FrameOutcome::Aborted { bit_count }) => {
                debug!(cycle = self.cycle, bit_count, "bus went idle mid-frame");
                self.stats.aborted += 1;
            }
            None => {}
        }

        self.idle.tick(clk);
        self.edge.tick(clk);
        self.sync.tick(pins);
        self.raw = pins;
        self.cycle += 1;
    }

    /// Current RX register content, without consuming anything
    pub fn rx(&self) -> RxStatus {
        match self.fifo.front() {
            Some(data) => RxStatus { data, valid: true },
            None => RxStatus::default(),
        }
    }

    /// Consume the front byte at the end of the current tick. Has no effect
    /// when the FIFO is empty.
    pub fn accept(&mut self) {
        self.pop_request = true;
    }

    /// Level of the `data` event source
    pub fn pending(&self) -> bool {
        self.rx().valid
    }

    pub fn irq_enabled(&self) -> bool {
        self.ev_enable
    }

    /// Interrupt line. Stays up until the consumer drains the FIFO.
    pub fn irq(&self) -> bool {
        self.pending() && self.ev_enable
    }

    pub fn read_csr(&mut self, offset: u32) -> u32 {
        let value = match offset {
            regs::RX => {
                let status = self.rx();
                self.accept();
                status.bits()
            }
            regs::EV_STATUS | regs::EV_PENDING => u32::from(self.pending()),
            regs::EV_ENABLE => u32::from(self.ev_enable),
            _ => 0,
        };
        trace!(cycle = self.cycle, offset, value, "csr read");
        value
    }

    pub fn write_csr(&mut self, offset: u32, value: u32) {
        trace!(cycle = self.cycle, offset, value, "csr write");
        if offset == regs::EV_ENABLE {
            self.ev_enable = value & regs::EV_DATA != 0;
        }
    }

    pub fn signals(&self) -> Signals {
        let Pins { clk, dat } = self.sync.output();
        let rx = self.rx();
        Signals {
            clk_raw: self.raw.clk,
            dat_raw: self.raw.dat,
            clk,
            dat,
            idle: self.idle.idle(),
            stable: self.edge.stable(),
            pulse: self.edge.pulse(),
            bit_count: self.framer.bit_count(),
            bits: self.framer.bits(),
            valid: rx.valid,
            data: rx.data,
            irq: self.irq(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FRAME_BITS, FramerState, encode};

    const SYS_CLK: u32 = 1_000_000;
    const HALF: u32 = 40;

    fn receiver() -> Ps2Receiver {
        Ps2Receiver::new(SYS_CLK).unwrap()
    }

    fn run(rx: &mut Ps2Receiver, pins: Pins, ticks: u32) {
        for _ in 0..ticks {
            rx.tick(pins);
        }
    }

    /// Clock an 11-bit frame onto the lines, data changing mid-high
    fn send(rx: &mut Ps2Receiver, frame: u16) {
        let mut dat = true;
        for i in 0..FRAME_BITS {
            run(rx, Pins::new(true, dat), HALF / 2);
            dat = frame >> i & 1 != 0;
            run(rx, Pins::new(true, dat), HALF / 2);
            run(rx, Pins::new(false, dat), HALF);
        }
        run(rx, Pins::IDLE, HALF);
    }

    #[test]
    fn test_rejects_slow_clock() {
        assert!(matches!(Ps2Receiver::new(0), Err(SimError::InvalidClock(0))));
        assert!(Ps2Receiver::new(6_000).is_err());
        assert!(Ps2Receiver::new(8_000).is_ok());
    }

    #[test]
    fn test_receive_0x41() {
        let mut rx = receiver();
        send(&mut rx, encode(0x41));
        assert_eq!(rx.queued(), vec![0x41]);
        assert_eq!(rx.framer().state(), FramerState::Empty);
        assert_eq!(rx.stats().frames, 1);
        assert!(rx.pending());
        assert!(!rx.irq());
    }

    #[test]
    fn test_bad_stop_is_dropped() {
        let mut rx = receiver();
        send(&mut rx, encode(0x41) & !(1 << 10));
        assert!(rx.queued().is_empty());
        assert_eq!(rx.framer().bit_count(), 0);
        assert_eq!(rx.stats().framing_errors, 1);
        assert!(!rx.pending());
    }

    #[test]
    fn test_write_latency() {
        let mut rx = receiver();
        let frame = encode(0x5a);
        let mut dat = true;
        for i in 0..FRAME_BITS {
            run(&mut rx, Pins::new(true, dat), HALF / 2);
            dat = frame >> i & 1 != 0;
            run(&mut rx, Pins::new(true, dat), HALF / 2);
            if i + 1 < FRAME_BITS {
                run(&mut rx, Pins::new(false, dat), HALF);
            }
        }

        let low = Pins::new(false, dat);
        let mut ticks = 0;
        while rx.framer().state() != FramerState::Validating {
            rx.tick(low);
            ticks += 1;
        }
        // Two sync stages, debounce window, pulse register, then the shift
        assert_eq!(ticks, 2 + DEBOUNCE_TICKS + 2 + 1);

        rx.tick(low);
        assert_eq!(rx.framer().state(), FramerState::Empty);
        assert!(!rx.pending());
        rx.tick(low);
        assert!(rx.pending());
        assert_eq!(rx.rx().data, 0x5a);
    }

    #[test]
    fn test_idle_resets_partial_frame() {
        let mut rx = receiver();
        let frame = encode(0x12);
        for i in 0..5 {
            let dat = frame >> i & 1 != 0;
            run(&mut rx, Pins::new(true, dat), HALF);
            run(&mut rx, Pins::new(false, dat), HALF);
        }
        run(&mut rx, Pins::IDLE, HALF);
        assert_eq!(rx.framer().bit_count(), 5);

        // Line already high for HALF ticks. The partial frame survives every
        // tick until the detector reads idle, then goes on the next one.
        let mut ticks = HALF;
        while !rx.signals().idle {
            rx.tick(Pins::IDLE);
            ticks += 1;
            assert_eq!(rx.framer().bit_count(), 5);
        }
        assert_eq!(ticks, rx.idle_threshold() + 2);
        assert_eq!(rx.stats().aborted, 0);

        rx.tick(Pins::IDLE);
        assert_eq!(rx.framer().state(), FramerState::Empty);
        assert_eq!(rx.stats().aborted, 1);

        send(&mut rx, encode(0x1c));
        assert_eq!(rx.queued(), vec![0x1c]);
    }

    #[test]
    fn test_overflow_keeps_oldest() {
        let mut rx = receiver();
        for byte in 0..20u8 {
            send(&mut rx, encode(byte));
        }
        assert_eq!(rx.queued(), (0..16).collect::<Vec<u8>>());
        assert_eq!(rx.stats().frames, 20);
        assert_eq!(rx.stats().overflows, 4);
    }

    #[test]
    fn test_read_pops_on_next_tick() {
        let mut rx = receiver();
        send(&mut rx, encode(0x01));
        send(&mut rx, encode(0x02));

        let first = RxStatus::from_bits(rx.read_csr(regs::RX));
        assert_eq!(first, RxStatus { data: 0x01, valid: true });
        // Same tick, same front
        assert_eq!(rx.rx().data, 0x01);
        rx.tick(Pins::IDLE);
        assert_eq!(rx.rx(), RxStatus { data: 0x02, valid: true });

        rx.read_csr(regs::RX);
        rx.tick(Pins::IDLE);
        assert!(!rx.pending());

        // Reading an empty FIFO changes nothing
        assert_eq!(rx.read_csr(regs::RX), 0);
        rx.tick(Pins::IDLE);
        assert!(!rx.pending());
        assert!(rx.queued().is_empty());
    }

    #[test]
    fn test_irq_is_level_and_gated() {
        let mut rx = receiver();
        send(&mut rx, encode(0x41));
        assert_eq!(rx.read_csr(regs::EV_STATUS), 1);
        assert_eq!(rx.read_csr(regs::EV_PENDING), 1);
        assert!(!rx.irq());

        rx.write_csr(regs::EV_ENABLE, 1);
        assert_eq!(rx.read_csr(regs::EV_ENABLE), 1);
        assert!(rx.irq());

        // Clearing a level source does nothing
        rx.write_csr(regs::EV_PENDING, 1);
        rx.tick(Pins::IDLE);
        assert!(rx.irq());

        rx.read_csr(regs::RX);
        rx.tick(Pins::IDLE);
        assert!(!rx.irq());
        assert_eq!(rx.read_csr(regs::EV_PENDING), 0);
    }

    #[test]
    fn test_unmapped_csr() {
        let mut rx = receiver();
        rx.write_csr(0x40, 0xffff_ffff);
        assert_eq!(rx.read_csr(0x40), 0);
        assert!(!rx.irq_enabled());
    }
}
