use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Base address of the PS/2 receiver when the config does not give one.
const DEFAULT_PS2_BASE: u32 = 0x800;

#[derive(Deserialize, Debug, Clone)]
pub struct Io {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "baseAddr", default)]
    pub base_addr: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(rename = "sysClkFreq")]
    sys_clk_freq: u32,
    #[serde(default)]
    io: Vec<Io>,
}

/// A resolved PS/2 receiver instance from the `io` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ps2Instance {
    pub name: String,
    pub base_addr: u32,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        serde_yaml::from_reader(file).context(format!("Failed to parse YAML config: {:?}", path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML config")
    }

    pub fn sys_clk_freq(&self) -> u32 {
        self.sys_clk_freq
    }

    pub fn num_ps2(&self) -> usize {
        self.io.iter().filter(|io| io.ty == "ps2").count()
    }

    /// All PS/2 instances in declaration order, with parsed base addresses
    pub fn ps2_instances(&self) -> Result<Vec<Ps2Instance>> {
        self.io
            .iter()
            .filter(|io| io.ty == "ps2")
            .map(|io| {
                let base_addr = match &io.base_addr {
                    Some(addr) => parse_addr(addr)
                        .with_context(|| format!("Invalid baseAddr for {}: {addr}", io.name))?,
                    None => DEFAULT_PS2_BASE,
                };
                Ok(Ps2Instance {
                    name: io.name.clone(),
                    base_addr,
                })
            })
            .collect()
    }

    pub fn ps2(&self) -> Result<Ps2Instance> {
        self.ps2_instances()?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No ps2 instance in config"))
    }
}

fn parse_addr(s: &str) -> Result<u32> {
    let value = if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)?
    } else {
        s.parse()?
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::from_yaml(
            r#"
sysClkFreq: 48000000
io:
  - type: ps2
    name: ps2
    baseAddr: "0x800"
  - type: ctrl
    name: ctrl
    baseAddr: "0x0"
"#,
        )
        .unwrap();

        assert_eq!(config.sys_clk_freq(), 48_000_000);
        assert_eq!(config.num_ps2(), 1);
        assert_eq!(
            config.ps2().unwrap(),
            Ps2Instance {
                name: "ps2".to_string(),
                base_addr: 0x800,
            }
        );
    }

    #[test]
    fn test_default_base_addr() {
        let config = Config::from_yaml("sysClkFreq: 16000000\nio:\n  - type: ps2\n    name: kbd\n").unwrap();
        assert_eq!(config.ps2().unwrap().base_addr, DEFAULT_PS2_BASE);
    }

    #[test]
    fn test_missing_ps2() {
        let config = Config::from_yaml("sysClkFreq: 16000000\n").unwrap();
        assert_eq!(config.num_ps2(), 0);
        assert!(config.ps2().is_err());
    }

    #[test]
    fn test_bad_base_addr() {
        let config =
            Config::from_yaml("sysClkFreq: 1\nio:\n  - type: ps2\n    baseAddr: \"0xzz\"\n").unwrap();
        assert!(config.ps2_instances().is_err());
    }

    #[test]
    fn test_shipped_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/leech.yaml");
        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.sys_clk_freq(), 48_000_000);
        assert_eq!(config.ps2().unwrap().base_addr, 0x800);
    }
}
