//! Block storage and cache maintenance seams.
//!
//! This module defines the [`BlockDevice`], [`StorageProvider`] and [`CacheControl`]
//! traits the [`RoundTripVerifier`](crate::verify::RoundTripVerifier) is written
//! against. Backends live in their own crates, e.g. `ddrcheck-blockdev` for image
//! files and block device nodes.

use serde::{Deserialize, Serialize};

/// A byte range on a storage device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageSpan {
    /// Byte offset from the start of the device
    pub offset: u64,
    /// Length in bytes, including the 4-byte checksum trailer
    pub len: usize,
}

impl StorageSpan {
    /// Creates a span of `len` bytes at `offset`.
    pub const fn new(offset: u64, len: usize) -> Self {
        StorageSpan { offset, len }
    }

    /// Byte offset one past the end of the span, if representable.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.len as u64)
    }
}

impl std::fmt::Display for StorageSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}+{:#x}", self.offset, self.len)
    }
}

/// Trait for block-addressed storage devices.
///
/// Implementors read whole blocks of [`block_len()`](BlockDevice::block_len) bytes.
///
/// # Associated Types
///
/// * `Error` - The error type returned by device operations. Must implement [`std::error::Error`].
///
/// # Required Methods
///
/// * [`init()`](BlockDevice::init) - Brings the device into a readable state
/// * [`block_len()`](BlockDevice::block_len) - Size of one block in bytes
/// * [`block_read()`](BlockDevice::block_read) - Reads a range of blocks
pub trait BlockDevice {
    /// The error type returned by device operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Initializes the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be brought up.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Size of one block in bytes. Never zero.
    fn block_len(&self) -> usize;

    /// Reads `count` blocks starting at block `start` into `dst`.
    ///
    /// `dst` holds at least `count * block_len()` bytes. Returns the number of
    /// blocks actually read, which is less than `count` if the device ends early.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails to read.
    fn block_read(&mut self, start: u64, count: usize, dst: &mut [u8])
    -> Result<usize, Self::Error>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    type Error = D::Error;

    fn init(&mut self) -> Result<(), Self::Error> {
        (**self).init()
    }

    fn block_len(&self) -> usize {
        (**self).block_len()
    }

    fn block_read(
        &mut self,
        start: u64,
        count: usize,
        dst: &mut [u8],
    ) -> Result<usize, Self::Error> {
        (**self).block_read(start, count, dst)
    }
}

/// Looks up storage devices by number.
pub trait StorageProvider {
    /// Device handle returned by [`find_device()`](StorageProvider::find_device).
    type Device: BlockDevice;

    /// Returns device `devno`, or `None` if there is no such device.
    fn find_device(&mut self, devno: u32) -> Option<Self::Device>;
}

/// Data cache maintenance over a byte range.
pub trait CacheControl {
    /// Writes back and invalidates the data cache lines covering `len` bytes at `ptr`.
    fn flush_range(&self, ptr: *const u8, len: usize);
}

/// [`CacheControl`] for coherent systems, does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCacheMaintenance;

impl CacheControl for NoCacheMaintenance {
    fn flush_range(&self, _ptr: *const u8, _len: usize) {}
}

#[cfg(test)]
mod tests {
    use super::StorageSpan;

    #[test]
    fn test_span_end() {
        let span = StorageSpan::new(0x400, 0x1000);
        assert_eq!(span.end(), Some(0x1400));
        assert_eq!(StorageSpan::new(u64::MAX, 1).end(), None);
        assert_eq!(span.to_string(), "0x400+0x1000");
    }
}
