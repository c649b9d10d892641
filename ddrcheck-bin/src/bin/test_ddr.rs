use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ddrcheck_bin::{init_logging_with_progress, parse_hex, save_to_file};
use ddrcheck_core::diag::{FaultKind, WindowPolicy};
use ddrcheck_core::memory::{MemoryRegion, PhysAddr, SimMemory, WordAccess};
use ddrcheck_core::util::Rng;
use ddrcheck_core::{DiagConfig, SdramDiag, SdramReport, Stage};
use log::{debug, info};
use serde::Serialize;

/// CLI arguments for the `test_ddr` binary.
///
/// Runs the data pattern test and then the address line test over one SDRAM region.
/// The exit status is 0 on success, the failing pattern index + 1 for a data line
/// fault and 1 for an address line fault.
#[derive(Debug, Parser, Serialize, Clone)]
struct CliArgs {
    /// Physical base address (hex).
    #[clap(value_parser = parse_hex)]
    base: usize,
    /// Region size in bytes (hex).
    #[clap(value_parser = parse_hex)]
    size: usize,
    /// The ddrcheck config file.
    #[clap(long = "config")]
    config: Option<String>,
    /// Test the configured default region if the base is outside the SDRAM window.
    #[clap(long = "legacy-window")]
    legacy_window: bool,
    /// Abort the pattern test at the first mismatch.
    #[clap(long = "stop-on-first-fault")]
    stop_on_first_fault: bool,
    /// Run against simulated memory instead of /dev/mem.
    #[clap(long = "simulate")]
    simulate: bool,
    /// Seed for the simulated power-on contents.
    #[clap(long = "seed")]
    seed: Option<u64>,
    /// Output file for the report (JSON format).
    #[clap(long = "output")]
    output: Option<String>,
}

#[derive(Debug, Serialize)]
struct TestDdrResults<'a> {
    args: &'a CliArgs,
    status: u8,
    report: &'a SdramReport,
}

fn open_memory(args: &CliArgs, region: &MemoryRegion) -> Result<Box<dyn WordAccess>> {
    if args.simulate || region.size == 0 {
        let seed = args.seed.unwrap_or_else(rand::random);
        info!("simulating {} (seed {:#x})", region, seed);
        let mut mem = SimMemory::for_region(region);
        mem.randomize(&mut Rng::from_seed(seed));
        return Ok(Box::new(mem));
    }
    #[cfg(target_os = "linux")]
    {
        let window = ddrcheck_dev_mem::DevMemWindow::for_region(region)
            .with_context(|| format!("mapping {} from /dev/mem", region))?;
        Ok(Box::new(window))
    }
    #[cfg(not(target_os = "linux"))]
    anyhow::bail!("/dev/mem is only available on Linux, use --simulate")
}

fn print_report(report: &SdramReport) {
    for stage in &report.stages {
        match (stage.stage, stage.result.fault()) {
            (Stage::Pattern, None) => println!("pattern test OK"),
            (Stage::Address, None) => println!("addr test OK"),
            (_, Some(fault)) => {
                match fault.kind {
                    FaultKind::Pattern(pattern) => println!("pattern {} test FAILED", pattern),
                    FaultKind::AddressMirror => println!("addr test FAILED"),
                }
                println!(
                    "  at {:#010x}: wrote {:#010x}, read {:#010x}",
                    fault.addr, fault.expected, fault.actual
                );
            }
        }
    }
}

fn main() -> Result<ExitCode> {
    let progress = init_logging_with_progress()?;
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => DiagConfig::from_jsonfile(path)
            .with_context(|| format!("loading config {}", path))?,
        None => DiagConfig::default(),
    };
    if args.legacy_window {
        config.sdram.window_policy = WindowPolicy::Legacy;
    }
    if args.stop_on_first_fault {
        config.sdram.stop_on_first_fault = true;
    }

    let region = MemoryRegion::new(PhysAddr::new(args.base), args.size)?;
    let diag = SdramDiag::new(&config.sdram).with_progress(progress);
    let regions = diag.stage_regions(region)?;
    let report = if regions.is_shared() {
        let mut mem = open_memory(&args, &region)?;
        diag.run(&mut mem, region)?
    } else {
        debug!(
            "pattern test maps {}, address test maps {}",
            regions.pattern, regions.address
        );
        let mut pattern_mem = open_memory(&args, &regions.pattern)?;
        let mut address_mem = open_memory(&args, &regions.address)?;
        diag.run_split(&mut pattern_mem, &mut address_mem, region)?
    };
    print_report(&report);

    let status = report.status_code();
    if let Some(output) = &args.output {
        save_to_file(
            &TestDdrResults {
                args: &args,
                status,
                report: &report,
            },
            output,
        )?;
    }
    Ok(ExitCode::from(status))
}
