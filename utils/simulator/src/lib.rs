mod error;
mod fifo;
mod filter;
mod sync;
mod timer;

pub mod device;
pub mod frame;
pub mod hal;
pub mod ps2;
pub mod regs;
pub mod soc;
pub mod vcd;

// Re-export public API
pub use device::{Frame, FrameFault, PS2_CLK_DEFAULT_HZ, Ps2Device};
pub use error::{Result, SimError};
pub use fifo::SyncFifo;
pub use filter::{DEBOUNCE_TICKS, EdgeFilter, IdleDetector, idle_ticks};
pub use frame::{FrameError, FrameOutcome, Framer};
pub use hal::Ps2;
pub use ps2::{FIFO_DEPTH, Ps2Receiver, Signals, Stats};
pub use soc::{ConsumeMode, MemoryInterface, Soc, collect};
pub use sync::{LineSync, Pins, Synchronizer};
pub use timer::WaitTimer;
