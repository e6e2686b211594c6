use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while setting up or driving a simulation.
///
/// Protocol errors on the PS/2 lines are not here: the receiver drops bad
/// frames silently and only counts them in [`crate::Stats`].
#[derive(Debug, Error)]
pub enum SimError {
    #[error("System clock of {0} Hz is too slow to tell an idle gap from a debounce window")]
    InvalidClock(u32),

    #[error("PS/2 clock of {ps2_hz} Hz leaves only {half_period} ticks per half period at {sys_hz} Hz")]
    InvalidPs2Clock {
        ps2_hz: u32,
        sys_hz: u32,
        half_period: u32,
    },

    #[error("Glitch of {ticks} ticks does not fit in a {half_period} tick clock phase")]
    InvalidGlitch { ticks: u32, half_period: u32 },

    #[error("Simulation did not settle within {0} cycles")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
