use std::fs::OpenOptions;
use std::ops::Range;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::ptr;

use ddrcheck_core::memory::{MappedMemory, MemoryRegion, PhysAddr, WordAccess};
use ddrcheck_core::util::{PAGE_MASK, PAGE_SIZE};
use libc::{MAP_FAILED, MAP_SHARED, O_SYNC, PROT_READ, PROT_WRITE, mmap, munmap};
use log::{debug, warn};
use thiserror::Error;

/// Errors that can occur while mapping `/dev/mem`.
#[derive(Debug, Error)]
pub enum DevMemError {
    /// Opening or mapping `/dev/mem` failed
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// The requested range cannot be mapped
    #[error("cannot map {len:#x} bytes at {phys:#x}")]
    InvalidRange {
        /// Requested physical address
        phys: PhysAddr,
        /// Requested length
        len: usize,
    },
}

/// Result type for `/dev/mem` mappings.
pub type Result<T> = std::result::Result<T, DevMemError>;

/// Page-aligned placement of a physical range inside an mmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PageSpan {
    /// Page-aligned physical start of the mapping
    base: usize,
    /// Offset of the requested address inside the mapping
    head: usize,
    /// Mapping length, a multiple of the page size
    len: usize,
}

fn page_span(phys: PhysAddr, len: usize) -> Option<PageSpan> {
    if len == 0 {
        return None;
    }
    let base = phys.as_usize() & !PAGE_MASK;
    let head = phys.as_usize() & PAGE_MASK;
    let len = head.checked_add(len)?.checked_next_multiple_of(PAGE_SIZE)?;
    base.checked_add(len)?;
    Some(PageSpan { base, head, len })
}

/// A window of physical memory mapped through `/dev/mem`.
///
/// The mapping is shared and opened with `O_SYNC`, so the kernel maps it uncached
/// where the architecture allows. It is unmapped on drop.
#[derive(Debug)]
pub struct DevMemWindow {
    mem: MappedMemory,
    map: *mut libc::c_void,
    map_len: usize,
}

impl DevMemWindow {
    /// Maps `len` bytes of physical memory starting at `phys`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is empty or wraps around, or if `/dev/mem` cannot
    /// be opened or mapped.
    pub fn map(phys: PhysAddr, len: usize) -> Result<Self> {
        let span = page_span(phys, len).ok_or(DevMemError::InvalidRange { phys, len })?;
        let offset = libc::off_t::try_from(span.base)
            .map_err(|_| DevMemError::InvalidRange { phys, len })?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_SYNC)
            .open("/dev/mem")?;
        debug!(
            "mmap /dev/mem {:#x}+{:#x} for {:#x}+{:#x}",
            span.base, span.len, phys, len
        );
        let map = unsafe {
            mmap(
                ptr::null_mut(),
                span.len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if map == MAP_FAILED {
            return Err(std::io::Error::last_os_error().into());
        }
        // the mapping stays valid after the file is closed
        let mem = unsafe { MappedMemory::new((map as *mut u8).add(span.head), phys, len) };
        Ok(DevMemWindow {
            mem,
            map,
            map_len: span.len,
        })
    }

    /// Maps everything the diagnostics touch in `region`, including the overrun of
    /// the last stride.
    ///
    /// # Errors
    ///
    /// See [`DevMemWindow::map`].
    pub fn for_region(region: &MemoryRegion) -> Result<Self> {
        let footprint = region.footprint();
        Self::map(footprint.start, footprint.end - footprint.start)
    }
}

impl WordAccess for DevMemWindow {
    fn window(&self) -> Range<PhysAddr> {
        self.mem.window()
    }

    fn read_word(&mut self, addr: PhysAddr) -> u32 {
        self.mem.read_word(addr)
    }

    fn write_word(&mut self, addr: PhysAddr, value: u32) {
        self.mem.write_word(addr, value)
    }
}

impl Drop for DevMemWindow {
    fn drop(&mut self) {
        if unsafe { munmap(self.map, self.map_len) } != 0 {
            warn!(
                "munmap of /dev/mem window failed: {}",
                std::io::Error::last_os_error()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PageSpan, page_span};
    use ddrcheck_core::memory::PhysAddr;

    #[test]
    fn test_page_span() {
        assert_eq!(
            page_span(PhysAddr::new(0x7410_0000), 0x1004),
            Some(PageSpan {
                base: 0x7410_0000,
                head: 0,
                len: 0x2000
            })
        );
        assert_eq!(
            page_span(PhysAddr::new(0x7410_0ffc), 8),
            Some(PageSpan {
                base: 0x7410_0000,
                head: 0xffc,
                len: 0x2000
            })
        );
        assert_eq!(page_span(PhysAddr::new(0x1000), 0), None);
        assert_eq!(page_span(PhysAddr::new(usize::MAX & !0xfff), 0x2000), None);
    }
}
