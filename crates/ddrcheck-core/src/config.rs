//! Configuration file support.
//!
//! A [`DiagConfig`] is read from a JSON file with [`DiagConfig::from_jsonfile`]. Every
//! section and every field is optional, missing values take their defaults:
//!
//! ```json
//! {
//!   "sdram": { "window_policy": "legacy", "progress_interval": 4096 },
//!   "storage": { "devno": 1, "devices": [{ "devno": 1, "path": "disk.img", "block_len": 512 }] },
//!   "firmware": { "kernel": { "offset": 1048576, "len": 4194304 } }
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diag::{SdramWindow, WindowPolicy};
use crate::firmware::FirmwareLayout;
use crate::memory::MemoryRegion;
use crate::util::{PROGRESS_INTERVAL, Size};

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be read
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The file is not a valid configuration
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Settings of the SDRAM check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdramConfig {
    /// A base is inside the SDRAM window if it has any of these bits set
    pub window_mask: usize,
    /// Region tested instead of one outside the window in legacy mode
    pub legacy_default: MemoryRegion,
    /// How bases outside the window are handled
    pub window_policy: WindowPolicy,
    /// Abort the pattern test at the first mismatch
    pub stop_on_first_fault: bool,
    /// Strides between progress reports
    pub progress_interval: usize,
}

impl Default for SdramConfig {
    fn default() -> Self {
        let window = SdramWindow::default();
        SdramConfig {
            window_mask: window.mask,
            legacy_default: window.legacy_default,
            window_policy: WindowPolicy::Strict,
            stop_on_first_fault: false,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl SdramConfig {
    /// The SDRAM window described by this section.
    pub fn window(&self) -> SdramWindow {
        SdramWindow {
            mask: self.window_mask,
            legacy_default: self.legacy_default,
        }
    }
}

/// A storage device backed by a file or device node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Device number
    pub devno: u32,
    /// Image file or block device node
    pub path: PathBuf,
    /// Block size in bytes
    pub block_len: usize,
}

/// Settings of the firmware round-trip check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Device the firmware images are read from
    pub devno: u32,
    /// Known devices
    pub devices: Vec<DeviceEntry>,
    /// Staging buffer size in bytes
    pub staging_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            devno: 0,
            devices: vec![DeviceEntry {
                devno: 0,
                path: PathBuf::from("/dev/mmcblk0"),
                block_len: 512,
            }],
            staging_capacity: Size::MB(16).bytes(),
        }
    }
}

/// Complete ddrcheck configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagConfig {
    /// SDRAM check settings
    pub sdram: SdramConfig,
    /// Storage settings
    pub storage: StorageConfig,
    /// Firmware image table
    pub firmware: FirmwareLayout,
}

impl DiagConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `filepath` - Path to the JSON configuration file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_jsonfile(filepath: impl AsRef<Path>) -> Result<DiagConfig> {
        let mut file = File::open(filepath.as_ref())?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config: DiagConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// The device entry for `devno`, if configured.
    pub fn device(&self, devno: u32) -> Option<&DeviceEntry> {
        self.storage.devices.iter().find(|d| d.devno == devno)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{DiagConfig, Error};
    use crate::diag::WindowPolicy;
    use crate::firmware::{FirmwareImage, FirmwareLayout};

    #[test]
    fn test_defaults() {
        let config = DiagConfig::default();
        assert_eq!(config.sdram.window_mask, 0x7000_0000);
        assert_eq!(config.sdram.legacy_default.size, 0x03F0_0000);
        assert_eq!(config.sdram.window_policy, WindowPolicy::Strict);
        assert_eq!(config.sdram.progress_interval, 2048);
        assert_eq!(config.storage.staging_capacity, 16 << 20);
        assert_eq!(config.device(0).map(|d| d.block_len), Some(512));
        assert!(config.device(1).is_none());
    }

    #[test]
    fn test_from_jsonfile() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{
                "sdram": {{ "window_policy": "legacy", "stop_on_first_fault": true }},
                "storage": {{ "devno": 1, "devices": [{{ "devno": 1, "path": "disk.img", "block_len": 4096 }}] }},
                "firmware": {{ "logo1": {{ "offset": 4096, "len": 8192 }} }}
            }}"#
        )?;
        let config = DiagConfig::from_jsonfile(file.path())?;
        assert_eq!(config.sdram.window_policy, WindowPolicy::Legacy);
        assert!(config.sdram.stop_on_first_fault);
        assert_eq!(config.sdram.progress_interval, 2048);
        assert_eq!(config.device(1).map(|d| d.block_len), Some(4096));
        assert_eq!(config.firmware.span(FirmwareImage::Logo1).len, 8192);
        assert_eq!(config.firmware.kernel, FirmwareLayout::default().kernel);
        Ok(())
    }

    #[test]
    fn test_from_jsonfile_errors() -> anyhow::Result<()> {
        assert!(matches!(
            DiagConfig::from_jsonfile("/nonexistent/ddrcheck.json"),
            Err(Error::Io(_))
        ));
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{ "sdram": {{ "window_policy": "loose" }} }}"#)?;
        assert!(matches!(
            DiagConfig::from_jsonfile(file.path()),
            Err(Error::Json(_))
        ));
        Ok(())
    }
}
