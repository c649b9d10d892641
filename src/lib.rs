//! # ddrcheck
//!
//! SDRAM address and data line diagnostics and firmware round-trip verification.
//!
//! This crate re-exports [`ddrcheck_core`] and, behind features, the backends:
//!
//! - `dev-mem`: [`dev_mem`], physical memory through `/dev/mem` (Linux).
//! - `blockdev`: [`blockdev`], firmware images in files or block device nodes.
//!
//! ```
//! use ddrcheck::memory::{MemoryRegion, PhysAddr, SimMemory};
//! use ddrcheck::SdramDiag;
//!
//! let region = MemoryRegion::new(PhysAddr::new(0x7410_0000), 0x1000).unwrap();
//! let mut mem = SimMemory::for_region(&region);
//! let report = SdramDiag::default().run(&mut mem, region).unwrap();
//! assert_eq!(report.status_code(), 0);
//! ```

pub use ddrcheck_core::*;

#[cfg(feature = "blockdev")]
pub use ddrcheck_blockdev as blockdev;
#[cfg(feature = "dev-mem")]
pub use ddrcheck_dev_mem as dev_mem;
