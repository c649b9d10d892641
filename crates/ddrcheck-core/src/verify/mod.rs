//! Firmware round-trip verification.
//!
//! [`RoundTripVerifier`] reads a [`StorageSpan`](crate::storage::StorageSpan) from a
//! block device into a caller-owned [`StagingBuffer`], stores a CRC-32 of the payload
//! in its last four bytes and checks the CRC-32 residue of the whole span. The
//! residue only matches if the staged bytes read back exactly as they were
//! checksummed, so it catches corruption on the path between storage and the CPU.

mod crc32;
mod round_trip;
mod staging;

pub use self::crc32::{CRC32_RESIDUE, Crc32, crc32, embed_checksum, residue};
pub use self::round_trip::{RoundTripVerifier, Verified, check_trailer};
pub use self::staging::StagingBuffer;

use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that end a verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// No device with this number
    #[error("storage device {devno} not found")]
    DeviceUnavailable {
        /// Requested device number
        devno: u32,
    },
    /// The device failed to initialize
    #[error("storage device {devno} init failed")]
    InitFailed {
        /// Device number
        devno: u32,
        /// Device error
        #[source]
        source: BoxedError,
    },
    /// The span cannot hold the checksum trailer
    #[error("span of {len} bytes is too short for a checksum trailer")]
    SpanTooShort {
        /// Span length
        len: usize,
    },
    /// The staged blocks do not fit the staging buffer
    #[error("staging {needed} bytes needs a larger buffer (capacity {capacity})")]
    StagingTooSmall {
        /// Bytes covered by the block range
        needed: usize,
        /// Staging buffer capacity
        capacity: usize,
    },
    /// The block range of the span is not addressable
    #[error("span {offset:#x}+{len:#x} exceeds the addressable block range")]
    BlockRange {
        /// Span offset
        offset: u64,
        /// Span length
        len: usize,
    },
    /// The device returned fewer blocks than requested
    #[error("read {read} of {requested} blocks starting at block {start}")]
    ShortRead {
        /// First block
        start: u64,
        /// Blocks requested
        requested: usize,
        /// Blocks read
        read: usize,
    },
    /// The device failed to read
    #[error("block read of {count} blocks at block {start} failed")]
    Read {
        /// First block
        start: u64,
        /// Blocks requested
        count: usize,
        /// Device error
        #[source]
        source: BoxedError,
    },
    /// The staged data does not match its checksum
    #[error("checksum residue {residue:#010x}, expected {expected:#010x}", expected = CRC32_RESIDUE)]
    ChecksumMismatch {
        /// Residue computed over payload and trailer
        residue: u32,
    },
}

/// Result type for verification.
pub type Result<T> = std::result::Result<T, VerifyError>;
