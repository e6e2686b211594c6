//! Scenario runner
//!
//! Runs every YAML scenario in testbench/scenarios/ against the simulated
//! receiver and leaves a VCD trace per scenario under target/vcd/.

use anyhow::{Context, Result};
use glob::glob;
use libtest_mimic::{Arguments, Failed, Trial};
use std::path::{Path, PathBuf};
use testbench::Scenario;

const SCENARIO_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios");
const TARGET_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../target/");

fn main() -> Result<()> {
    let vcd_path = PathBuf::from(format!("{}/vcd", TARGET_PATH));
    std::fs::create_dir_all(&vcd_path)?;
    let args = Arguments::from_args();

    let tests = discover_tests()?;

    libtest_mimic::run(&args, tests).exit();
}

fn discover_tests() -> Result<Vec<Trial>> {
    let mut trials = Vec::new();

    for path in glob(&format!("{SCENARIO_PATH}/*.yaml"))? {
        let path = path?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context("Scenario file name is not UTF-8")?
            .to_owned();

        trials.push(Trial::test(format!("ps2::{}", name), move || {
            run_test(&path, &name)
        }));
    }

    Ok(trials)
}

fn run_test(path: &Path, name: &str) -> Result<(), Failed> {
    match run_test_impl(path, name) {
        Ok(()) => Ok(()),
        Err(e) => Err(format!("{:#}", e).into()),
    }
}

fn run_test_impl(path: &Path, name: &str) -> Result<()> {
    let scenario = Scenario::from_path(path)?;
    let vcd_path = PathBuf::from(format!("{}/vcd/ps2_{}.vcd", TARGET_PATH, name));

    println!("Running {}: {}", name, scenario.description);
    let stats = scenario.run(Some(&vcd_path))?;
    println!("{:?}", stats);
    Ok(())
}
