use std::fmt::{Debug, Formatter};
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

#[repr(transparent)]
#[derive(
    Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
/// Physical memory address.
///
/// A newtype wrapper around a flat physical address value.
pub struct PhysAddr(usize);

impl Debug for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("PhysAddr(0x{:02x})", self.0))
    }
}

impl std::fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl PhysAddr {
    /// Creates a new physical address.
    pub const fn new(addr: usize) -> Self {
        PhysAddr(addr)
    }

    /// Returns the address as a usize.
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// The 32-bit word the address-line diagnostic stores at this address.
    ///
    /// Addresses above 4 GiB contribute their low 32 bits.
    pub const fn as_word(&self) -> u32 {
        self.0 as u32
    }

    /// Adds `rhs`, returning `None` on overflow.
    pub fn checked_add(self, rhs: usize) -> Option<PhysAddr> {
        self.0.checked_add(rhs).map(PhysAddr)
    }

    /// Returns true if the address is aligned to `align` bytes.
    pub fn is_aligned(&self, align: usize) -> bool {
        self.0.is_multiple_of(align)
    }
}

impl From<usize> for PhysAddr {
    fn from(addr: usize) -> PhysAddr {
        PhysAddr(addr)
    }
}

impl From<PhysAddr> for usize {
    fn from(addr: PhysAddr) -> usize {
        addr.0
    }
}

impl std::fmt::Pointer for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:p}", self.0 as *const u8)
    }
}

impl Sub<PhysAddr> for PhysAddr {
    type Output = usize;

    fn sub(self, rhs: PhysAddr) -> Self::Output {
        assert!(self.0 >= rhs.0);
        self.0 - rhs.0
    }
}

impl Add<usize> for PhysAddr {
    type Output = PhysAddr;

    fn add(self, rhs: usize) -> Self::Output {
        PhysAddr(self.0 + rhs)
    }
}

impl Sub<usize> for PhysAddr {
    type Output = PhysAddr;

    fn sub(self, rhs: usize) -> Self::Output {
        assert!(self.0 >= rhs);
        PhysAddr(self.0 - rhs)
    }
}
