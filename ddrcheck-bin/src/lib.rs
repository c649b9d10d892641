//! # ddrcheck binaries
//!
//! Command line front ends for the ddrcheck diagnostics:
//!
//! - `test_ddr <base> <size>` checks the data and address lines of an SDRAM region,
//!   either through `/dev/mem` or against a simulated region (`--simulate`).
//! - `check_file_crc <name>` reads a firmware image from storage and checks that it
//!   reads back intact.
//!
//! ## Quickstart guide
//!
//! ```sh
//! cargo build --release
//! # simulated 1 MiB region, no hardware access
//! target/release/test_ddr 0x74100000 0x100000 --simulate
//! # real memory, needs root and a kernel that permits /dev/mem access
//! sudo target/release/test_ddr 0x74100000 0x100000 --output report.json
//! # firmware image, device table from the config file
//! target/release/check_file_crc kernel --config config/ddrcheck.json
//!```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::ParseIntError;

use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::info;
use serde::Serialize;

/// Installs `env_logger` behind a progress-bar-aware bridge.
pub fn init_logging_with_progress() -> anyhow::Result<MultiProgress> {
    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).build();
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    Ok(progress)
}

/// Parses a hexadecimal number, with or without `0x` prefix.
pub fn parse_hex(s: &str) -> Result<usize, ParseIntError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    usize::from_str_radix(digits, 16)
}

/// Writes `value` as pretty JSON to `filename`.
pub fn save_to_file<T: Serialize>(value: &T, filename: &str) -> anyhow::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    info!("Results saved to {}", filename);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_hex;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0x74100000"), Ok(0x7410_0000));
        assert_eq!(parse_hex("3F00000"), Ok(0x03F0_0000));
        assert_eq!(parse_hex("0Xff"), Ok(0xff));
        assert!(parse_hex("0x").is_err());
        assert!(parse_hex("74g").is_err());
    }
}
