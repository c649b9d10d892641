//! The `memory` module provides the physical memory abstractions the diagnostics run on.
//!
//! The `memory` module provides the following abstractions:
//! - `WordAccess`: A trait for 32-bit loads and stores at physical addresses.
//! - `MappedMemory`: Volatile access to a mapped window of physical memory. This is the
//!   only type that dereferences raw memory.
//! - `SimMemory`: An in-memory simulation of a region with injectable address and data
//!   line faults.
//!
//! The `memory` module also provides the following helper structs:
//! - `PhysAddr`: A physical address.
//! - `MemoryRegion`: A base address and size under test.
//! - `ProbeWalk`: The sequence of probed addresses of a region.
mod mapped;
mod phys_addr;
mod probe;
mod region;
mod sim;

use std::ops::Range;

pub use self::mapped::MappedMemory;
pub use self::phys_addr::PhysAddr;
pub use self::probe::{PROBES_PER_STRIDE, Probe, ProbeWalk, probe_offset};
pub use self::region::{Error as RegionError, MemoryRegion};
pub use self::sim::{Fault as SimFault, SimMemory};

/// Word-granular access to physical memory.
///
/// Implementors perform exactly one 32-bit access per call, without caching or
/// reordering, so the diagnostics observe what the memory interface returns.
/// Accesses take `&mut self`: the region behind an implementor must be exclusively
/// owned while a diagnostic runs.
pub trait WordAccess {
    /// Range of physical addresses this accessor can reach.
    fn window(&self) -> Range<PhysAddr>;

    /// Loads the word at `addr`.
    ///
    /// # Panics
    ///
    /// Implementations panic if `addr` is unaligned or outside [`WordAccess::window`].
    fn read_word(&mut self, addr: PhysAddr) -> u32;

    /// Stores `value` at `addr`.
    ///
    /// # Panics
    ///
    /// Implementations panic if `addr` is unaligned or outside [`WordAccess::window`].
    fn write_word(&mut self, addr: PhysAddr, value: u32);

    /// Returns true if every address in `range` lies inside the window.
    fn covers(&self, range: &Range<PhysAddr>) -> bool {
        let window = self.window();
        range.is_empty() || (window.start <= range.start && range.end <= window.end)
    }
}

impl<T: WordAccess + ?Sized> WordAccess for &mut T {
    fn window(&self) -> Range<PhysAddr> {
        (**self).window()
    }

    fn read_word(&mut self, addr: PhysAddr) -> u32 {
        (**self).read_word(addr)
    }

    fn write_word(&mut self, addr: PhysAddr, value: u32) {
        (**self).write_word(addr, value)
    }
}

impl<T: WordAccess + ?Sized> WordAccess for Box<T> {
    fn window(&self) -> Range<PhysAddr> {
        (**self).window()
    }

    fn read_word(&mut self, addr: PhysAddr) -> u32 {
        (**self).read_word(addr)
    }

    fn write_word(&mut self, addr: PhysAddr, value: u32) {
        (**self).write_word(addr, value)
    }
}
