//! Driver for the PS/2 receiver, written against [`MemoryInterface`] so the
//! same code runs over the simulated bus.

use crate::regs::{self, RxStatus};
use crate::soc::MemoryInterface;

pub struct Ps2<M: MemoryInterface> {
    mem: M,
    base: u32,
}

impl<M: MemoryInterface> Ps2<M> {
    pub fn new(mem: M, base: u32) -> Self {
        Self { mem, base }
    }

    /// Raise the interrupt line whenever a byte is waiting
    pub fn listen(&mut self) {
        self.mem.write32(self.base + regs::EV_ENABLE, regs::EV_DATA);
    }

    pub fn unlisten(&mut self) {
        self.mem.write32(self.base + regs::EV_ENABLE, 0);
    }

    /// Byte waiting in RX, checked without consuming it
    pub fn pending(&mut self) -> bool {
        self.mem.read32(self.base + regs::EV_PENDING) & regs::EV_DATA != 0
    }

    /// Fill `buf` with received bytes. Stops at the first empty read and
    /// returns how many bytes were written.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for byte in buf.iter_mut() {
            let status = RxStatus::from_bits(self.mem.read32(self.base + regs::RX));
            if !status.valid {
                break;
            }
            *byte = status.data;
            count += 1;
        }
        count
    }

    pub fn interface(&self) -> &M {
        &self.mem
    }

    pub fn interface_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn release(self) -> M {
        self.mem
    }
}
