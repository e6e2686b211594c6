//! Data-driven PS/2 receiver scenarios.
//!
//! Each scenario is a YAML file naming the frames a device sends, how the
//! host drains the receiver and what it must end up with.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use simtools::Config;
use simulator::{ConsumeMode, Frame, FrameFault, PS2_CLK_DEFAULT_HZ, Soc, Stats, collect};

const WORKSPACE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/..");

const DEFAULT_SYS_CLK: u32 = 1_000_000;
const DEFAULT_BASE: u32 = 0x800;

fn default_ps2_clk() -> u32 {
    PS2_CLK_DEFAULT_HZ
}

fn default_max_cycles() -> u64 {
    50_000_000
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    #[default]
    Poll,
    Interrupt,
    Hold,
}

impl From<Mode> for ConsumeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Poll => ConsumeMode::Poll,
            Mode::Interrupt => ConsumeMode::Interrupt,
            Mode::Hold => ConsumeMode::Hold,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Fault {
    #[default]
    None,
    BadStart,
    BadStop,
    BadParity,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FrameSpec {
    pub byte: u8,
    #[serde(default)]
    pub fault: Fault,
    /// Stop clocking after this many bits
    #[serde(default)]
    pub truncate: Option<u8>,
    /// Released-bus ticks after the frame, on top of the normal gap
    #[serde(default)]
    pub pause_after: Option<u32>,
}

impl FrameSpec {
    fn frame(&self) -> Frame {
        let fault = match (self.truncate, self.fault) {
            (Some(bits), _) => FrameFault::Truncated(bits),
            (None, Fault::None) => FrameFault::None,
            (None, Fault::BadStart) => FrameFault::BadStart,
            (None, Fault::BadStop) => FrameFault::BadStop,
            (None, Fault::BadParity) => FrameFault::BadParity,
        };
        Frame::with_fault(self.byte, fault)
    }
}

/// Counters to check; missing ones are not compared
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExpectedStats {
    pub frames: Option<u64>,
    pub framing_errors: Option<u64>,
    pub parity_errors: Option<u64>,
    pub overflows: Option<u64>,
    pub aborted: Option<u64>,
}

impl ExpectedStats {
    pub fn check(&self, stats: &Stats) -> Result<()> {
        let fields = [
            ("frames", self.frames, stats.frames),
            ("framingErrors", self.framing_errors, stats.framing_errors),
            ("parityErrors", self.parity_errors, stats.parity_errors),
            ("overflows", self.overflows, stats.overflows),
            ("aborted", self.aborted, stats.aborted),
        ];
        for (name, expected, actual) in fields {
            if let Some(expected) = expected {
                if expected != actual {
                    bail!("{name}: expected {expected}, got {actual}");
                }
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub description: String,
    /// SoC config, relative to the workspace root
    #[serde(default)]
    pub config: Option<PathBuf>,
    #[serde(default)]
    pub sys_clk_freq: Option<u32>,
    #[serde(default = "default_ps2_clk")]
    pub ps2_clk_hz: u32,
    #[serde(default)]
    pub glitch: Option<u32>,
    #[serde(default)]
    pub gap_ticks: Option<u32>,
    #[serde(default)]
    pub bridge_latency: Option<u32>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,
    pub frames: Vec<FrameSpec>,
    pub expect: Vec<u8>,
    #[serde(default)]
    pub stats: Option<ExpectedStats>,
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open scenario: {:?}", path))?;
        serde_yaml::from_reader(file).context(format!("Failed to parse scenario: {:?}", path))
    }

    /// System clock and receiver base address this scenario runs with
    pub fn platform(&self) -> Result<(u32, u32)> {
        match &self.config {
            Some(path) => {
                let config = Config::from_path(&Path::new(WORKSPACE_ROOT).join(path))?;
                let base = config.ps2()?.base_addr;
                Ok((self.sys_clk_freq.unwrap_or(config.sys_clk_freq()), base))
            }
            None => Ok((self.sys_clk_freq.unwrap_or(DEFAULT_SYS_CLK), DEFAULT_BASE)),
        }
    }

    pub fn build(&self) -> Result<Soc> {
        let (sys_clk_freq, base) = self.platform()?;
        let mut soc = Soc::new(sys_clk_freq, self.ps2_clk_hz, base)?;
        if let Some(latency) = self.bridge_latency {
            soc.set_bridge_latency(latency);
        }

        let device = soc.device_mut();
        device.set_glitch(self.glitch)?;
        if let Some(gap) = self.gap_ticks {
            device.set_gap(gap);
        }
        for spec in &self.frames {
            device.send(spec.frame());
            if let Some(ticks) = spec.pause_after {
                device.pause(ticks);
            }
        }
        Ok(soc)
    }

    /// Run to completion, optionally tracing to `vcd`, and check the result
    pub fn run(&self, vcd: Option<&Path>) -> Result<Stats> {
        let mut soc = self.build()?;
        if let Some(path) = vcd {
            let file = File::create(path).context(format!("Failed to create {:?}", path))?;
            soc.trace_to(Box::new(BufWriter::new(file)))?;
        }

        let received = collect(&mut soc, self.mode.into(), self.max_cycles)
            .context("Simulation failed")?;
        let stats = soc.finish()?;

        if received != self.expect {
            bail!(
                "received {} but expected {}",
                hex(&received),
                hex(&self.expect)
            );
        }
        if let Some(expected) = &self.stats {
            expected.check(&stats)?;
        }
        Ok(stats)
    }
}

fn hex(bytes: &[u8]) -> String {
    let list: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("[{}]", list.join(" "))
}
