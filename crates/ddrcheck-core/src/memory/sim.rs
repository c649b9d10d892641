use std::ops::Range;

use log::trace;
use rand::RngCore;

use super::{MemoryRegion, PhysAddr, WordAccess};
use crate::util::{Rng, WORD_SIZE};

/// A wiring or cell defect injected into [`SimMemory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Accesses to `from` reach the cell at `to` (mirroring).
    Alias {
        /// Address that is decoded wrongly
        from: PhysAddr,
        /// Cell it reaches instead
        to: PhysAddr,
    },
    /// Address line `bit` is stuck at `high`, for every access.
    AddressLine {
        /// Address bit number
        bit: u32,
        /// Level the line is stuck at
        high: bool,
    },
    /// The bits in `mask` of the word at `addr` always read as the bits of `value`.
    StuckBits {
        /// Address of the faulty word
        addr: PhysAddr,
        /// Stuck bits
        mask: u32,
        /// Level of the stuck bits
        value: u32,
    },
    /// Storing `trigger` at `addr` stores `trigger ^ flip` instead.
    PatternSensitive {
        /// Address of the faulty word
        addr: PhysAddr,
        /// Value that corrupts the cell when written
        trigger: u32,
        /// Bits that flip on the triggering write
        flip: u32,
    },
}

/// An in-memory simulation of a physical memory window.
///
/// Backs the window with a word vector and applies injected [`Fault`]s on every
/// access, so the diagnostics can be exercised without hardware.
#[derive(Clone, Debug)]
pub struct SimMemory {
    base: PhysAddr,
    words: Vec<u32>,
    faults: Vec<Fault>,
}

impl SimMemory {
    /// Creates a zero-filled window of `len` bytes at `base`.
    pub fn new(base: PhysAddr, len: usize) -> Self {
        assert!(base.is_aligned(WORD_SIZE), "unaligned base {:#x}", base);
        SimMemory {
            base,
            words: vec![0; len.div_ceil(WORD_SIZE)],
            faults: vec![],
        }
    }

    /// Creates a window covering everything the diagnostics touch in `region`.
    pub fn for_region(region: &MemoryRegion) -> Self {
        let footprint = region.footprint();
        Self::new(footprint.start, footprint.end - footprint.start)
    }

    /// Fills the window with reproducible garbage, like DRAM after power-on.
    pub fn randomize(&mut self, rng: &mut Rng) {
        trace!("randomize sim memory with seed {:#x}", rng.seed());
        for word in self.words.iter_mut() {
            *word = rng.next_u32();
        }
    }

    /// Adds a fault, builder style.
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.inject(fault);
        self
    }

    /// Adds a fault.
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Reads a cell directly, bypassing all faults.
    pub fn peek(&self, addr: PhysAddr) -> u32 {
        self.words[self.index(addr)]
    }

    /// Writes a cell directly, bypassing all faults.
    pub fn poke(&mut self, addr: PhysAddr, value: u32) {
        let idx = self.index(addr);
        self.words[idx] = value;
    }

    fn index(&self, addr: PhysAddr) -> usize {
        let window = self.window();
        assert!(
            window.start <= addr && addr + WORD_SIZE <= window.end,
            "SimMemory access at {:#x} outside {:#x}..{:#x}",
            addr,
            window.start,
            window.end
        );
        assert!(addr.is_aligned(WORD_SIZE), "unaligned access at {:#x}", addr);
        (addr - self.base) / WORD_SIZE
    }

    /// Applies address decoding faults.
    fn decode(&self, addr: PhysAddr) -> PhysAddr {
        self.faults.iter().fold(addr, |addr, fault| match *fault {
            Fault::Alias { from, to } if from == addr => to,
            Fault::AddressLine { bit, high: true } => PhysAddr::new(addr.as_usize() | 1 << bit),
            Fault::AddressLine { bit, high: false } => {
                PhysAddr::new(addr.as_usize() & !(1 << bit))
            }
            _ => addr,
        })
    }

    fn stuck(&self, cell: PhysAddr, value: u32) -> u32 {
        self.faults.iter().fold(value, |value, fault| match *fault {
            Fault::StuckBits {
                addr,
                mask,
                value: level,
            } if addr == cell => (value & !mask) | (level & mask),
            _ => value,
        })
    }
}

impl WordAccess for SimMemory {
    fn window(&self) -> Range<PhysAddr> {
        self.base..self.base + self.words.len() * WORD_SIZE
    }

    fn read_word(&mut self, addr: PhysAddr) -> u32 {
        let cell = self.decode(addr);
        self.stuck(cell, self.peek(cell))
    }

    fn write_word(&mut self, addr: PhysAddr, value: u32) {
        let cell = self.decode(addr);
        let value = self.faults.iter().fold(value, |value, fault| match *fault {
            Fault::PatternSensitive {
                addr,
                trigger,
                flip,
            } if addr == cell && value == trigger => value ^ flip,
            _ => value,
        });
        let value = self.stuck(cell, value);
        self.poke(cell, value);
    }
}

#[cfg(test)]
mod tests {
    use super::{Fault, SimMemory};
    use crate::memory::{PhysAddr, WordAccess};
    use crate::util::Rng;

    const BASE: PhysAddr = PhysAddr::new(0x7410_0000);

    #[test]
    fn test_sim_plain_access() {
        let mut mem = SimMemory::new(BASE, 0x100);
        mem.write_word(BASE + 0x10, 0x1234_5678);
        assert_eq!(mem.read_word(BASE + 0x10), 0x1234_5678);
        assert_eq!(mem.peek(BASE + 0x10), 0x1234_5678);
        assert_eq!(mem.window(), BASE..BASE + 0x100);
    }

    #[test]
    fn test_sim_alias() {
        let mut mem = SimMemory::new(BASE, 0x100).with_fault(Fault::Alias {
            from: BASE + 0x40,
            to: BASE + 0x20,
        });
        mem.write_word(BASE + 0x20, 1);
        mem.write_word(BASE + 0x40, 2);
        assert_eq!(mem.read_word(BASE + 0x20), 2);
        assert_eq!(mem.peek(BASE + 0x40), 0);
    }

    #[test]
    fn test_sim_address_line() {
        let mut mem = SimMemory::new(BASE, 0x2000).with_fault(Fault::AddressLine {
            bit: 12,
            high: false,
        });
        mem.write_word(BASE + 0x1004, 7);
        assert_eq!(mem.peek(BASE + 0x4), 7);
        assert_eq!(mem.read_word(BASE + 0x4), 7);
    }

    #[test]
    fn test_sim_stuck_bits() {
        let mut mem = SimMemory::new(BASE, 0x100).with_fault(Fault::StuckBits {
            addr: BASE,
            mask: 0x1,
            value: 0x0,
        });
        mem.write_word(BASE, 0xFFFF_FFFF);
        assert_eq!(mem.read_word(BASE), 0xFFFF_FFFE);
        mem.poke(BASE, 0x5555_5555);
        assert_eq!(mem.read_word(BASE), 0x5555_5554);
    }

    #[test]
    fn test_sim_pattern_sensitive() {
        let mut mem = SimMemory::new(BASE, 0x100).with_fault(Fault::PatternSensitive {
            addr: BASE + 4,
            trigger: 0xFFFF_FFFF,
            flip: 0xFF,
        });
        mem.write_word(BASE + 4, 0xAAAA_AAAA);
        assert_eq!(mem.read_word(BASE + 4), 0xAAAA_AAAA);
        mem.write_word(BASE + 4, 0xFFFF_FFFF);
        assert_eq!(mem.read_word(BASE + 4), 0xFFFF_FF00);
    }

    #[test]
    fn test_sim_randomize_reproducible() {
        let mut a = SimMemory::new(BASE, 0x100);
        let mut b = SimMemory::new(BASE, 0x100);
        a.randomize(&mut Rng::from_seed(7));
        b.randomize(&mut Rng::from_seed(7));
        assert_eq!(a.peek(BASE + 0x80), b.peek(BASE + 0x80));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_sim_bounds() {
        let mut mem = SimMemory::new(BASE, 0x100);
        mem.read_word(BASE + 0x100);
    }
}
