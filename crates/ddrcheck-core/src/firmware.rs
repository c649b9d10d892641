//! Named firmware images and their location on storage.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageSpan;

/// A firmware image that can be verified by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareImage {
    /// Bootloader, also accepted as `uboot`
    Bootloader,
    /// Kernel image
    Kernel,
    /// First boot logo
    Logo1,
    /// Second boot logo
    Logo2,
    /// E-paper waveform table
    Waveform,
}

impl FirmwareImage {
    /// All images, in table order.
    pub const ALL: [FirmwareImage; 5] = [
        FirmwareImage::Bootloader,
        FirmwareImage::Kernel,
        FirmwareImage::Logo1,
        FirmwareImage::Logo2,
        FirmwareImage::Waveform,
    ];

    /// Canonical name.
    pub const fn name(&self) -> &'static str {
        match self {
            FirmwareImage::Bootloader => "bootloader",
            FirmwareImage::Kernel => "kernel",
            FirmwareImage::Logo1 => "logo1",
            FirmwareImage::Logo2 => "logo2",
            FirmwareImage::Waveform => "waveform",
        }
    }
}

impl std::fmt::Display for FirmwareImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The name does not denote a firmware image.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no firmware image named {0:?} (expected uboot, kernel, logo1, logo2 or waveform)")]
pub struct UnknownImage(pub String);

impl FromStr for FirmwareImage {
    type Err = UnknownImage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uboot" | "bootloader" => Ok(FirmwareImage::Bootloader),
            "kernel" => Ok(FirmwareImage::Kernel),
            "logo1" => Ok(FirmwareImage::Logo1),
            "logo2" => Ok(FirmwareImage::Logo2),
            "waveform" => Ok(FirmwareImage::Waveform),
            other => Err(UnknownImage(other.to_string())),
        }
    }
}

/// Where each firmware image lives on the storage device.
///
/// The defaults describe an example eMMC layout. Boards override them in the
/// `firmware` section of the configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareLayout {
    /// Bootloader span
    pub bootloader: StorageSpan,
    /// Kernel span
    pub kernel: StorageSpan,
    /// First logo span
    pub logo1: StorageSpan,
    /// Second logo span
    pub logo2: StorageSpan,
    /// Waveform span
    pub waveform: StorageSpan,
}

impl Default for FirmwareLayout {
    fn default() -> Self {
        FirmwareLayout {
            bootloader: StorageSpan::new(0x400, 0xF_FC00),
            kernel: StorageSpan::new(0x10_0000, 0x40_0000),
            logo1: StorageSpan::new(0x50_0000, 0x10_0000),
            logo2: StorageSpan::new(0x60_0000, 0x10_0000),
            waveform: StorageSpan::new(0x70_0000, 0x20_0000),
        }
    }
}

impl FirmwareLayout {
    /// Storage span of `image`.
    pub fn span(&self, image: FirmwareImage) -> StorageSpan {
        match image {
            FirmwareImage::Bootloader => self.bootloader,
            FirmwareImage::Kernel => self.kernel,
            FirmwareImage::Logo1 => self.logo1,
            FirmwareImage::Logo2 => self.logo2,
            FirmwareImage::Waveform => self.waveform,
        }
    }
}
