mod config;

pub use config::{Config, Io, Ps2Instance};
