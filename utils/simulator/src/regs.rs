//! CSR layout of the PS/2 receiver, as word offsets from the instance base.

/// Receive register; reading it consumes the front byte
pub const RX: u32 = 0x0;
/// Raw level of the `data` event
pub const EV_STATUS: u32 = 0x4;
/// Pending `data` event, level triggered so writes have no effect
pub const EV_PENDING: u32 = 0x8;
/// `data` event enable
pub const EV_ENABLE: u32 = 0xc;

/// Size of the register window
pub const WINDOW: u32 = 0x10;

pub mod rx {
    pub mod data {
        pub const OFFSET: u32 = 0;
        pub const MASK: u32 = 0xff << OFFSET;
    }

    pub mod valid {
        pub const OFFSET: u32 = 8;
        pub const MASK: u32 = 0x1 << OFFSET;
    }
}

/// `data` field shared by EV_STATUS, EV_PENDING and EV_ENABLE
pub const EV_DATA: u32 = 0x1;

/// Decoded view of the RX register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStatus {
    pub data: u8,
    pub valid: bool,
}

impl RxStatus {
    pub fn from_bits(value: u32) -> Self {
        Self {
            data: ((value & rx::data::MASK) >> rx::data::OFFSET) as u8,
            valid: value & rx::valid::MASK != 0,
        }
    }

    pub fn bits(&self) -> u32 {
        (u32::from(self.data) << rx::data::OFFSET) | (u32::from(self.valid) << rx::valid::OFFSET)
    }
}
