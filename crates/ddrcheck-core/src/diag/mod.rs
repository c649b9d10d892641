//! SDRAM line diagnostics.
//!
//! This module defines the [`Diagnostic`] trait and the two diagnostics that probe a
//! [`MemoryRegion`] through a [`WordAccess`]:
//! - [`DataPatternDiagnostic`] writes four fixed bit patterns and finds stuck or
//!   shorted data lines.
//! - [`AddressLineDiagnostic`] writes every probed address into itself and finds
//!   address lines that mirror one cell onto another.
//!
//! Both walk the same [`ProbeWalk`](crate::memory::ProbeWalk) and always finish a
//! complete write pass before the first read of the matching read pass.

mod address_line;
mod data_pattern;
mod pass;
#[cfg(test)]
mod recording;

pub use self::address_line::AddressLineDiagnostic;
pub use self::data_pattern::{DataPatternDiagnostic, SdramWindow, WindowPolicy};

use crate::memory::{MemoryRegion, PhysAddr, RegionError, WordAccess};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four data patterns, in the order they are tested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitPattern {
    /// 0xAAAAAAAA, odd bits set
    Alternating10,
    /// 0x55555555, even bits set
    Alternating01,
    /// 0x00000000, every line low
    Zeros,
    /// 0xFFFFFFFF, every line high
    Ones,
}

impl BitPattern {
    /// All patterns in test order.
    pub const ALL: [BitPattern; 4] = [
        BitPattern::Alternating10,
        BitPattern::Alternating01,
        BitPattern::Zeros,
        BitPattern::Ones,
    ];

    /// The word written for this pattern.
    pub const fn value(&self) -> u32 {
        match self {
            BitPattern::Alternating10 => 0xAAAA_AAAA,
            BitPattern::Alternating01 => 0x5555_5555,
            BitPattern::Zeros => 0x0000_0000,
            BitPattern::Ones => 0xFFFF_FFFF,
        }
    }

    /// 0-based position in [`BitPattern::ALL`].
    pub const fn index(&self) -> usize {
        match self {
            BitPattern::Alternating10 => 0,
            BitPattern::Alternating01 => 1,
            BitPattern::Zeros => 2,
            BitPattern::Ones => 3,
        }
    }
}

impl std::fmt::Display for BitPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08X}", self.value())
    }
}

/// Which check detected a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FaultKind {
    /// A probed address read back another address (address lines mirror)
    AddressMirror,
    /// A data pattern did not read back as written
    Pattern(BitPattern),
}

impl FaultKind {
    /// Legacy numeric status: pattern index + 1, or 1 for the address test.
    pub fn status_code(&self) -> u8 {
        match self {
            FaultKind::AddressMirror => 1,
            FaultKind::Pattern(pattern) => pattern.index() as u8 + 1,
        }
    }
}

/// The first fault a diagnostic detected.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fault {
    /// Which check failed
    pub kind: FaultKind,
    /// Probed address
    pub addr: PhysAddr,
    /// Value written to `addr`
    pub expected: u32,
    /// Value read back from `addr`
    pub actual: u32,
}

impl core::fmt::Debug for Fault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fault")
            .field("kind", &self.kind)
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("expected", &format_args!("{:#010x}", self.expected))
            .field("actual", &format_args!("{:#010x}", self.actual))
            .finish()
    }
}

impl Fault {
    /// Bits that differ between the written and the read value.
    pub fn bitmask(&self) -> u32 {
        self.expected ^ self.actual
    }
}

/// Outcome of a diagnostic over a whole region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticResult {
    /// Every probed address read back what was written
    Pass,
    /// The first detected fault
    Fail(Fault),
}

impl DiagnosticResult {
    /// Returns true for [`DiagnosticResult::Pass`].
    pub fn is_pass(&self) -> bool {
        matches!(self, DiagnosticResult::Pass)
    }

    /// Returns the fault of a failed run.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            DiagnosticResult::Pass => None,
            DiagnosticResult::Fail(fault) => Some(fault),
        }
    }
}

/// Errors that prevent a diagnostic from running.
///
/// Detected hardware faults are not errors, they are reported as
/// [`DiagnosticResult::Fail`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiagError {
    /// The region itself is malformed
    #[error(transparent)]
    Region(#[from] RegionError),
    /// Strict window policy rejected a base outside the SDRAM window
    #[error("base {base:#x} is outside the SDRAM window (mask {mask:#x})")]
    OutsideWindow {
        /// Requested base
        base: PhysAddr,
        /// Window mask the base was tested against
        mask: usize,
    },
    /// The accessor cannot reach every probed address
    #[error("probed range {start:#x}..{end:#x} is not mapped by the accessor")]
    NotMapped {
        /// First probed address
        start: PhysAddr,
        /// End of the probed footprint
        end: PhysAddr,
    },
}

/// Trait for SDRAM diagnostics.
///
/// A diagnostic owns the region for the whole call: it writes, then reads back, and
/// compares. Implementors must finish a complete write pass before the first read of
/// the corresponding read pass, otherwise two addresses that alias the same cell
/// would hide each other.
pub trait Diagnostic {
    /// Short human readable name.
    fn name(&self) -> &'static str;

    /// Runs the diagnostic over `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is malformed, rejected, or not reachable
    /// through `mem`. Detected faults are `Ok(DiagnosticResult::Fail(_))`.
    fn run<M: WordAccess + ?Sized>(
        &self,
        mem: &mut M,
        region: MemoryRegion,
    ) -> Result<DiagnosticResult, DiagError>;
}

/// Checks that `region` is well formed and fully reachable through `mem`.
fn check_reachable<M: WordAccess + ?Sized>(
    mem: &M,
    region: &MemoryRegion,
) -> Result<(), DiagError> {
    region.validate()?;
    let footprint = region.footprint();
    if !mem.covers(&footprint) {
        return Err(DiagError::NotMapped {
            start: footprint.start,
            end: footprint.end,
        });
    }
    Ok(())
}
