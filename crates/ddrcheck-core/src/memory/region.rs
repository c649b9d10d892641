use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{PhysAddr, ProbeWalk};
use crate::util::{STRIDE_SIZE, Size, WORD_SIZE};

/// Errors that can occur when describing a memory region.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The base address is not word aligned
    #[error("region base {0:#x} is not word aligned")]
    Unaligned(PhysAddr),
    /// The probed footprint wraps around the address space
    #[error("region {base:#x}+{size:#x} overflows the address width")]
    Overflow {
        /// Requested base
        base: PhysAddr,
        /// Requested size in bytes
        size: usize,
    },
}

/// Result type for region operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A physical memory region under test.
///
/// `size` is the nominal byte count. The diagnostics probe at stride granularity and
/// can touch up to one stride (plus a word) past `base + size`, see
/// [`MemoryRegion::footprint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    /// Physical base address (word aligned)
    pub base: PhysAddr,
    /// Size in bytes
    pub size: usize,
}

impl MemoryRegion {
    /// Creates a validated region.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not word aligned or the footprint overflows.
    pub fn new(base: PhysAddr, size: usize) -> Result<Self> {
        let region = MemoryRegion { base, size };
        region.validate()?;
        Ok(region)
    }

    /// Checks the invariants of a region built from its public fields.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not word aligned or the footprint overflows.
    pub fn validate(&self) -> Result<()> {
        if !self.base.is_aligned(WORD_SIZE) {
            return Err(Error::Unaligned(self.base));
        }
        self.stride_count()
            .checked_mul(STRIDE_SIZE)
            .and_then(|span| span.checked_add(WORD_SIZE))
            .and_then(|span| self.base.checked_add(span))
            .map(|_| ())
            .ok_or(Error::Overflow {
                base: self.base,
                size: self.size,
            })
    }

    /// Nominal end address (`base + size`).
    pub fn end(&self) -> PhysAddr {
        self.base + self.size
    }

    /// Number of 1024-byte strides the diagnostics walk.
    pub fn stride_count(&self) -> usize {
        self.size.div_ceil(STRIDE_SIZE)
    }

    /// Range of addresses the diagnostics touch.
    ///
    /// The loop bound is checked per stride only, so the last stride probes its
    /// 1024-byte offset and the word stored there regardless of `size`.
    pub fn footprint(&self) -> Range<PhysAddr> {
        match self.stride_count() {
            0 => self.base..self.base,
            n => self.base..self.base + (n * STRIDE_SIZE + WORD_SIZE),
        }
    }

    /// Every probed address in traversal order.
    pub fn probes(&self) -> ProbeWalk {
        ProbeWalk::new(self.base, self.stride_count())
    }
}

impl std::fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#010x}..{:#010x} ({})",
            self.base,
            self.end(),
            Size::from_bytes(self.size)
        )
    }
}
