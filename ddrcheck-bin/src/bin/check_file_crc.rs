use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ddrcheck_bin::init_logging_with_progress;
use ddrcheck_blockdev::FileStorage;
use ddrcheck_core::DiagConfig;
use ddrcheck_core::firmware::FirmwareImage;
use ddrcheck_core::storage::StorageSpan;
use ddrcheck_core::util::Size;
use ddrcheck_core::verify::{RoundTripVerifier, StagingBuffer};
use log::{error, info};

/// CLI arguments for the `check_file_crc` binary.
///
/// Reads a firmware image from storage into RAM and checks that it reads back
/// intact.
#[derive(Debug, Parser)]
struct CliArgs {
    /// Image to check: uboot, kernel, logo1, logo2 or waveform.
    name: String,
    /// The ddrcheck config file.
    #[clap(long = "config")]
    config: Option<String>,
    /// Storage device number, overrides the config file.
    #[clap(long = "devno")]
    devno: Option<u32>,
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn verify(storage: FileStorage, devno: u32, span: StorageSpan, staging: &mut StagingBuffer) -> bool {
    RoundTripVerifier::new(storage, devno)
        .with_cache(ddrcheck_dev_mem::Clflush)
        .run(span, staging)
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
fn verify(storage: FileStorage, devno: u32, span: StorageSpan, staging: &mut StagingBuffer) -> bool {
    RoundTripVerifier::new(storage, devno).run(span, staging)
}

fn main() -> Result<ExitCode> {
    init_logging_with_progress()?;
    let args = CliArgs::parse();

    let image: FirmwareImage = match args.name.parse() {
        Ok(image) => image,
        Err(e) => {
            error!("{}", e);
            println!("no available file to check for DDR");
            return Ok(ExitCode::FAILURE);
        }
    };
    let config = match &args.config {
        Some(path) => DiagConfig::from_jsonfile(path)
            .with_context(|| format!("loading config {}", path))?,
        None => DiagConfig::default(),
    };
    let devno = args.devno.unwrap_or(config.storage.devno);
    let span = config.firmware.span(image);
    info!(
        "checking {} ({} at {:#x}) on device {}",
        image,
        Size::from_bytes(span.len),
        span.offset,
        devno
    );

    let mut staging = StagingBuffer::with_capacity(config.storage.staging_capacity);
    let storage = FileStorage::from_config(&config.storage);
    if verify(storage, devno, span, &mut staging) {
        println!("file write and read check passed");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("file write and read check failed");
        Ok(ExitCode::FAILURE)
    }
}
