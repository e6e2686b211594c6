//! Minimal VCD writer for the receiver's internal signals.

use std::io::Write;

use crate::error::Result;
use crate::ps2::Signals;

struct Var {
    id: char,
    name: &'static str,
    width: u32,
}

const VARS: &[Var] = &[
    Var { id: '!', name: "ps2_clk", width: 1 },
    Var { id: '"', name: "ps2_data", width: 1 },
    Var { id: '#', name: "clk", width: 1 },
    Var { id: '$', name: "data", width: 1 },
    Var { id: '%', name: "idle", width: 1 },
    Var { id: '&', name: "stable", width: 1 },
    Var { id: '\'', name: "pulse", width: 1 },
    Var { id: '(', name: "bit_count", width: 4 },
    Var { id: ')', name: "bits", width: 11 },
    Var { id: '*', name: "rx_valid", width: 1 },
    Var { id: '+', name: "rx_data", width: 8 },
    Var { id: ',', name: "irq", width: 1 },
];

fn values(signals: &Signals) -> [u32; 12] {
    [
        u32::from(signals.clk_raw),
        u32::from(signals.dat_raw),
        u32::from(signals.clk),
        u32::from(signals.dat),
        u32::from(signals.idle),
        u32::from(signals.stable),
        u32::from(signals.pulse),
        u32::from(signals.bit_count),
        u32::from(signals.bits),
        u32::from(signals.valid),
        u32::from(signals.data),
        u32::from(signals.irq),
    ]
}

/// Streams one sample per system clock tick, emitting only changed values
pub struct VcdWriter<W: Write> {
    out: W,
    period_ps: u64,
    last: Option<[u32; 12]>,
}

impl<W: Write> VcdWriter<W> {
    pub fn new(mut out: W, sys_clk_freq: u32) -> Result<Self> {
        let period_ps = 1_000_000_000_000 / u64::from(sys_clk_freq.max(1));

        writeln!(out, "$timescale 1ps $end")?;
        writeln!(out, "$scope module ps2 $end")?;
        for var in VARS {
            let kind = if var.width == 1 { "wire" } else { "reg" };
            writeln!(out, "$var {} {} {} {} $end", kind, var.width, var.id, var.name)?;
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;

        Ok(Self {
            out,
            period_ps,
            last: None,
        })
    }

    pub fn dump(&mut self, cycle: u64, signals: &Signals) -> Result<()> {
        let now = values(signals);
        let changed: Vec<usize> = (0..VARS.len())
            .filter(|&i| self.last.is_none_or(|last| last[i] != now[i]))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        writeln!(self.out, "#{}", cycle * self.period_ps)?;
        for i in changed {
            let var = &VARS[i];
            if var.width == 1 {
                writeln!(self.out, "{}{}", now[i], var.id)?;
            } else {
                writeln!(self.out, "b{:b} {}", now[i], var.id)?;
            }
        }
        self.last = Some(now);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_changes() {
        let mut vcd = VcdWriter::new(Vec::new(), 1_000_000).unwrap();
        let mut signals = Signals::default();
        vcd.dump(0, &signals).unwrap();
        vcd.dump(1, &signals).unwrap();
        signals.bit_count = 3;
        signals.irq = true;
        vcd.dump(2, &signals).unwrap();

        let text = String::from_utf8(vcd.into_inner()).unwrap();
        assert!(text.starts_with("$timescale 1ps $end\n"));
        assert!(text.contains("$var reg 4 ( bit_count $end"));
        assert!(text.contains("#0\n0!\n"));
        // Nothing changed on cycle 1
        assert!(!text.contains("#1000000\n"));
        assert!(text.ends_with("#2000000\nb11 (\n1,\n"));
    }
}
