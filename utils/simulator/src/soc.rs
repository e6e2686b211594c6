//! The receiver wired to a device on one side and a register bus on the other.

use std::io::Write;

use tracing::{debug, warn};

use crate::device::Ps2Device;
use crate::error::{Result, SimError};
use crate::hal::Ps2;
use crate::ps2::{FIFO_DEPTH, Ps2Receiver, Stats};
use crate::regs;
use crate::vcd::VcdWriter;

/// 32-bit register access as seen by driver code
pub trait MemoryInterface {
    fn read32(&mut self, addr: u32) -> u32;
    fn write32(&mut self, addr: u32, value: u32);
}

impl<T: MemoryInterface + ?Sized> MemoryInterface for &mut T {
    fn read32(&mut self, addr: u32) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&mut self, addr: u32, value: u32) {
        (**self).write32(addr, value)
    }
}

/// One PS/2 receiver instance behind an external register bridge.
///
/// Every bus transaction costs `bridge_latency` system clock ticks, during
/// which the device keeps driving the lines. A transaction therefore always
/// lands on a later tick than the previous one, so a pop requested by an RX
/// read has taken effect before the next read.
pub struct Soc {
    receiver: Ps2Receiver,
    device: Ps2Device,
    base: u32,
    bridge_latency: u32,
    vcd: Option<VcdWriter<Box<dyn Write>>>,
    trace_error: Option<SimError>,
}

impl Soc {
    pub fn new(sys_clk_freq: u32, ps2_clk_hz: u32, base: u32) -> Result<Self> {
        Ok(Self {
            receiver: Ps2Receiver::new(sys_clk_freq)?,
            device: Ps2Device::new(sys_clk_freq, ps2_clk_hz)?,
            base,
            // Roughly what a 32-bit access over the 8 MHz SPI bridge costs
            bridge_latency: (sys_clk_freq / 100_000).max(1),
            vcd: None,
            trace_error: None,
        })
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn bridge_latency(&self) -> u32 {
        self.bridge_latency
    }

    pub fn set_bridge_latency(&mut self, ticks: u32) {
        self.bridge_latency = ticks.max(1);
    }

    /// Record the receiver's signals to `out` from the next tick on
    pub fn trace_to(&mut self, out: Box<dyn Write>) -> Result<()> {
        let mut vcd = VcdWriter::new(out, self.receiver.sys_clk_freq())?;
        vcd.dump(self.receiver.cycle(), &self.receiver.signals())?;
        self.vcd = Some(vcd);
        Ok(())
    }

    pub fn receiver(&self) -> &Ps2Receiver {
        &self.receiver
    }

    pub fn device(&self) -> &Ps2Device {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Ps2Device {
        &mut self.device
    }

    pub fn cycle(&self) -> u64 {
        self.receiver.cycle()
    }

    pub fn irq(&self) -> bool {
        self.receiver.irq()
    }

    /// Device done sending and every frame resolved by the receiver
    pub fn is_quiescent(&self) -> bool {
        self.device.is_idle() && self.receiver.is_settled()
    }

    pub fn tick(&mut self) {
        let pins = self.device.sample();
        self.receiver.tick(pins);

        if let Some(vcd) = self.vcd.as_mut() {
            if let Err(err) = vcd.dump(self.receiver.cycle(), &self.receiver.signals()) {
                warn!(%err, "VCD trace stopped");
                self.trace_error = Some(err);
                self.vcd = None;
            }
        }
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Close the trace and hand back the receiver's counters
    pub fn finish(mut self) -> Result<Stats> {
        if let Some(err) = self.trace_error.take() {
            return Err(err);
        }
        if let Some(vcd) = self.vcd.as_mut() {
            vcd.flush()?;
        }
        Ok(self.receiver.stats())
    }

    fn decode(&self, addr: u32) -> Option<u32> {
        let offset = addr.checked_sub(self.base)?;
        (offset < regs::WINDOW).then_some(offset)
    }
}

impl MemoryInterface for Soc {
    fn read32(&mut self, addr: u32) -> u32 {
        let value = match self.decode(addr) {
            Some(offset) => self.receiver.read_csr(offset),
            None => {
                debug!(addr, "read outside the PS/2 window");
                0
            }
        };
        self.run(u64::from(self.bridge_latency));
        value
    }

    fn write32(&mut self, addr: u32, value: u32) {
        match self.decode(addr) {
            Some(offset) => self.receiver.write_csr(offset, value),
            None => debug!(addr, value, "write outside the PS/2 window"),
        }
        self.run(u64::from(self.bridge_latency));
    }
}

/// How the host drains the receiver while the device is sending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsumeMode {
    /// Read RX back to back until it comes up empty
    #[default]
    Poll,
    /// Enable the event and only read while the interrupt line is up
    Interrupt,
    /// Leave the FIFO alone until the device is done, then drain it
    Hold,
}

/// Drive `soc` until every queued byte has been read out, using `mode` to
/// decide when the host looks at the receiver.
pub fn collect(soc: &mut Soc, mode: ConsumeMode, max_cycles: u64) -> Result<Vec<u8>> {
    let start = soc.cycle();
    let base = soc.base();
    let mut ps2 = Ps2::new(soc, base);
    let mut buf = [0; FIFO_DEPTH];
    let mut received = Vec::new();

    match mode {
        ConsumeMode::Interrupt => ps2.listen(),
        ConsumeMode::Poll | ConsumeMode::Hold => ps2.unlisten(),
    }

    loop {
        let soc = ps2.interface_mut();
        if soc.cycle() - start > max_cycles {
            return Err(SimError::Timeout(max_cycles));
        }

        let quiescent = soc.is_quiescent();
        let ready = match mode {
            ConsumeMode::Poll => true,
            ConsumeMode::Interrupt => soc.irq() || quiescent,
            ConsumeMode::Hold => quiescent,
        };
        if !ready {
            soc.tick();
            continue;
        }

        let count = ps2.read(&mut buf);
        received.extend_from_slice(&buf[..count]);
        if count == 0 && quiescent {
            return Ok(received);
        }
    }
}
