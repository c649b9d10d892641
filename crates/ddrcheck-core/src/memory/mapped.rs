use std::ops::Range;

use super::{PhysAddr, WordAccess};
use crate::util::WORD_SIZE;

/// Volatile word access to a mapped window of physical memory.
///
/// Holds a pointer through which the physical range `phys..phys + len` is reachable,
/// such as an mmap of `/dev/mem`. All loads and stores are volatile.
#[derive(Debug)]
pub struct MappedMemory {
    ptr: *mut u8,
    phys: PhysAddr,
    len: usize,
}

unsafe impl Send for MappedMemory {}

impl MappedMemory {
    /// Wraps a mapping of `len` bytes of physical memory starting at `phys`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for volatile reads and writes of `len` bytes for the
    /// lifetime of the returned value, and nothing else may access that memory while
    /// it is in use. `ptr` must be 4-byte aligned.
    pub unsafe fn new(ptr: *mut u8, phys: PhysAddr, len: usize) -> Self {
        assert!(
            (ptr as usize).is_multiple_of(WORD_SIZE),
            "mapping pointer {:p} is not word aligned",
            ptr
        );
        MappedMemory { ptr, phys, len }
    }

    fn word_ptr(&self, addr: PhysAddr) -> *mut u32 {
        assert!(
            addr >= self.phys && addr - self.phys + WORD_SIZE <= self.len,
            "MappedMemory access at {:#x} outside {:#x}+{:#x}",
            addr,
            self.phys,
            self.len
        );
        assert!(addr.is_aligned(WORD_SIZE), "unaligned access at {:#x}", addr);
        unsafe { self.ptr.byte_add(addr - self.phys) as *mut u32 }
    }
}

impl WordAccess for MappedMemory {
    fn window(&self) -> Range<PhysAddr> {
        self.phys..self.phys + self.len
    }

    fn read_word(&mut self, addr: PhysAddr) -> u32 {
        let ptr = self.word_ptr(addr);
        unsafe { std::ptr::read_volatile(ptr) }
    }

    fn write_word(&mut self, addr: PhysAddr, value: u32) {
        let ptr = self.word_ptr(addr);
        unsafe { std::ptr::write_volatile(ptr, value) }
    }
}

#[cfg(test)]
mod tests {
    use super::MappedMemory;
    use crate::memory::{PhysAddr, WordAccess};

    #[test]
    fn test_mapped_access_translates() {
        let mut backing = vec![0u32; 16];
        let phys = PhysAddr::new(0x7410_0000);
        let mut mem = unsafe { MappedMemory::new(backing.as_mut_ptr() as *mut u8, phys, 64) };
        mem.write_word(phys + 8, 0xDEAD_BEEF);
        assert_eq!(mem.read_word(phys + 8), 0xDEAD_BEEF);
        assert_eq!(mem.window(), phys..phys + 64);
        drop(mem);
        assert_eq!(backing[2], 0xDEAD_BEEF);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_mapped_access_bounds() {
        let mut backing = vec![0u32; 4];
        let phys = PhysAddr::new(0x1000);
        let mut mem = unsafe { MappedMemory::new(backing.as_mut_ptr() as *mut u8, phys, 16) };
        mem.read_word(phys + 16);
    }
}
