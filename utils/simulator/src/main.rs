use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use simtools::Config;
use simulator::{ConsumeMode, PS2_CLK_DEFAULT_HZ, Soc, collect};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leech-sim")]
#[command(about = "Cycle-accurate PS/2 receiver simulator")]
#[command(version)]
struct Args {
    /// Bytes for the device to send, in hex (e.g. 1c f0 1c)
    #[arg(value_name = "BYTES", value_parser = parse_byte)]
    bytes: Vec<u8>,

    /// SoC configuration
    #[arg(short, long, default_value = "configs/leech.yaml")]
    config: Utf8PathBuf,

    /// Override the system clock from the config
    #[arg(long)]
    sys_clk_freq: Option<u32>,

    /// PS/2 clock driven by the device
    #[arg(long, default_value_t = PS2_CLK_DEFAULT_HZ)]
    ps2_clk_hz: u32,

    /// VCD output file
    #[arg(long)]
    vcd: Option<Utf8PathBuf>,

    /// Maximum simulation cycles
    #[arg(long, default_value = "100000000")]
    max_cycles: u64,

    /// Read only while the interrupt line is raised
    #[arg(long)]
    interrupt: bool,

    /// System clock ticks per bus transaction
    #[arg(long)]
    bridge_latency: Option<u32>,

    /// Inject a clock glitch of this many ticks into every bit
    #[arg(long)]
    glitch: Option<u32>,
}

fn parse_byte(s: &str) -> Result<u8, std::num::ParseIntError> {
    u8::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args = Args::parse();

    let config = Config::from_path(args.config.as_std_path())?;
    let instance = config.ps2()?;
    if config.num_ps2() > 1 {
        warn!(count = config.num_ps2(), "config has several PS/2 instances, using the first");
    }
    let sys_clk_freq = args.sys_clk_freq.unwrap_or(config.sys_clk_freq());
    info!(name = %instance.name, base = instance.base_addr, sys_clk_freq, "using PS/2 instance");

    let mut soc = Soc::new(sys_clk_freq, args.ps2_clk_hz, instance.base_addr)
        .context("Failed to build simulation")?;
    if let Some(latency) = args.bridge_latency {
        soc.set_bridge_latency(latency);
    }
    soc.device_mut().set_glitch(args.glitch)?;
    if let Some(path) = &args.vcd {
        let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
        soc.trace_to(Box::new(BufWriter::new(file)))?;
    }

    for byte in &args.bytes {
        soc.device_mut().send_byte(*byte);
    }

    info!(ticks = soc.device().remaining_ticks(), "device waveform queued");

    let mode = if args.interrupt {
        ConsumeMode::Interrupt
    } else {
        ConsumeMode::Poll
    };
    let received = collect(&mut soc, mode, args.max_cycles)?;
    for byte in &received {
        println!("key {:02x}", byte);
    }

    let cycles = soc.cycle();
    let stats = soc.finish()?;
    println!(
        "{} cycles, {} frames, {} framing errors, {} parity errors, {} overflows, {} aborted",
        cycles,
        stats.frames,
        stats.framing_errors,
        stats.parity_errors,
        stats.overflows,
        stats.aborted
    );

    Ok(())
}
