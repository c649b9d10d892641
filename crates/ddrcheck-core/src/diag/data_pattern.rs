use std::ops::ControlFlow;

use indicatif::MultiProgress;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::pass::Passes;
use super::{
    BitPattern, DiagError, Diagnostic, DiagnosticResult, Fault, FaultKind, check_reachable,
};
use crate::memory::{MemoryRegion, PhysAddr, WordAccess};
use crate::util::PROGRESS_INTERVAL;

/// What to do with a base address outside the recognized SDRAM window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    /// Reject the region with [`DiagError::OutsideWindow`]
    #[default]
    Strict,
    /// Test [`SdramWindow::legacy_default`] instead of the requested region
    Legacy,
}

/// The physical window SDRAM is expected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdramWindow {
    /// A base is recognized if it has any of these bits set
    pub mask: usize,
    /// Region tested in place of an unrecognized one under [`WindowPolicy::Legacy`]
    pub legacy_default: MemoryRegion,
}

impl Default for SdramWindow {
    fn default() -> Self {
        SdramWindow {
            mask: 0x7000_0000,
            legacy_default: MemoryRegion {
                base: PhysAddr::new(0x7410_0000),
                size: 0x7800_0000 - 0x7410_0000,
            },
        }
    }
}

impl SdramWindow {
    /// Returns true if `base` lies in the SDRAM window.
    pub fn recognizes(&self, base: PhysAddr) -> bool {
        base.as_usize() & self.mask != 0
    }
}

/// Data line diagnostic.
///
/// For each [`BitPattern`] in order, writes the pattern to every probed address and
/// then reads every probed address back. Alternating patterns catch shorts between
/// neighbouring lines, all-zero and all-one catch lines stuck at either level.
///
/// A mismatch does not stop the scan: the read pass and the remaining patterns still
/// run, but the first mismatch (pattern order, then traversal order) is the one
/// reported. [`DataPatternDiagnostic::stop_on_first_fault`] aborts at that first
/// mismatch instead, which reports the same fault.
///
/// # Window policy
///
/// A base without any bit of [`SdramWindow::mask`] set is not a plausible SDRAM
/// address. Under [`WindowPolicy::Strict`] the run fails with
/// [`DiagError::OutsideWindow`]. Under [`WindowPolicy::Legacy`] the diagnostic tests
/// [`SdramWindow::legacy_default`] instead of the requested region and logs a
/// warning naming both; the result then describes the substituted region.
#[derive(Clone, Debug)]
pub struct DataPatternDiagnostic {
    window: SdramWindow,
    policy: WindowPolicy,
    stop_on_first_fault: bool,
    progress: Option<MultiProgress>,
    progress_interval: usize,
}

impl Default for DataPatternDiagnostic {
    fn default() -> Self {
        Self {
            window: SdramWindow::default(),
            policy: WindowPolicy::default(),
            stop_on_first_fault: false,
            progress: None,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl DataPatternDiagnostic {
    /// Creates the diagnostic with the default window in strict mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SDRAM window and what happens to bases outside of it.
    pub fn with_window(mut self, window: SdramWindow, policy: WindowPolicy) -> Self {
        self.window = window;
        self.policy = policy;
        self
    }

    /// Stops at the first mismatch instead of finishing all passes.
    pub fn stop_on_first_fault(mut self, stop: bool) -> Self {
        self.stop_on_first_fault = stop;
        self
    }

    /// Draws progress bars on `progress`.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Reports progress every `strides` strides.
    pub fn with_progress_interval(mut self, strides: usize) -> Self {
        self.progress_interval = strides;
        self
    }

    /// The region that will actually be tested for a requested `region`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagError::OutsideWindow`] for an unrecognized base in strict mode
    /// and [`DiagError::Region`] if `region` or the legacy default region is invalid.
    pub fn effective_region(&self, region: MemoryRegion) -> Result<MemoryRegion, DiagError> {
        region.validate()?;
        if self.window.recognizes(region.base) {
            return Ok(region);
        }
        match self.policy {
            WindowPolicy::Strict => Err(DiagError::OutsideWindow {
                base: region.base,
                mask: self.window.mask,
            }),
            WindowPolicy::Legacy => {
                self.window.legacy_default.validate()?;
                warn!(
                    "base {:#x} outside SDRAM window, legacy mode tests {} instead of {}",
                    region.base, self.window.legacy_default, region
                );
                Ok(self.window.legacy_default)
            }
        }
    }
}

impl Diagnostic for DataPatternDiagnostic {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn run<M: WordAccess + ?Sized>(
        &self,
        mem: &mut M,
        region: MemoryRegion,
    ) -> Result<DiagnosticResult, DiagError> {
        let region = self.effective_region(region)?;
        check_reachable(mem, &region)?;
        info!("check SDRAM {}", region);
        let passes = Passes::new(self.progress.as_ref(), self.progress_interval);

        let mut first: Option<Fault> = None;
        for pattern in BitPattern::ALL {
            let value = pattern.value();
            debug!("pattern {} writing", pattern);
            passes.write(mem, &region, &format!("Pattern {} write", pattern), |_| value);

            debug!("pattern {} reading", pattern);
            let mut mismatches = 0usize;
            let flow = passes.read(
                mem,
                &region,
                &format!("Pattern {} read", pattern),
                |addr, actual| {
                    if actual == value {
                        return ControlFlow::Continue(());
                    }
                    mismatches += 1;
                    if first.is_none() {
                        first = Some(Fault {
                            kind: FaultKind::Pattern(pattern),
                            addr,
                            expected: value,
                            actual,
                        });
                    }
                    if self.stop_on_first_fault {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            );
            if mismatches > 0 {
                warn!(
                    "pattern {} read back wrong at {} probed address(es)",
                    pattern, mismatches
                );
            }
            if flow.is_break() {
                break;
            }
        }

        Ok(match first {
            Some(fault) => {
                warn!(
                    "pattern test failed: first fault {:?} (pattern index {})",
                    fault,
                    fault.kind.status_code() - 1
                );
                DiagnosticResult::Fail(fault)
            }
            None => DiagnosticResult::Pass,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DataPatternDiagnostic, SdramWindow, WindowPolicy};
    use crate::diag::recording::{Access, RecordingMemory};
    use crate::diag::{BitPattern, DiagError, Diagnostic, DiagnosticResult, FaultKind};
    use crate::memory::{MemoryRegion, PhysAddr, RegionError, SimFault, SimMemory};
    use crate::util::Rng;

    const BASE: PhysAddr = PhysAddr::new(0x7410_0000);

    fn region(size: usize) -> MemoryRegion {
        MemoryRegion::new(BASE, size).unwrap()
    }

    fn first_failing_pattern(mask: u32, value: u32) -> BitPattern {
        let region = region(0x1000);
        let mut mem = SimMemory::for_region(&region).with_fault(SimFault::StuckBits {
            addr: BASE + 0x200,
            mask,
            value,
        });
        let result = DataPatternDiagnostic::new().run(&mut mem, region).unwrap();
        match result.fault().map(|f| f.kind) {
            Some(FaultKind::Pattern(pattern)) => pattern,
            other => panic!("expected pattern fault, got {:?}", other),
        }
    }

    #[test]
    fn test_pattern_pass() -> anyhow::Result<()> {
        let region = region(0x4000);
        let mut mem = SimMemory::for_region(&region);
        mem.randomize(&mut Rng::from_seed(1));
        assert_eq!(
            DataPatternDiagnostic::new().run(&mut mem, region)?,
            DiagnosticResult::Pass
        );
        // the last pattern stays in memory
        assert_eq!(mem.peek(BASE + 0x800), 0xFFFF_FFFF);
        Ok(())
    }

    #[test]
    fn test_single_bit_stuck_reports_first_differing_pattern() {
        // bit 0 stuck low: 0xAAAAAAAA has it clear, 0x55555555 is the first to differ
        assert_eq!(first_failing_pattern(0x1, 0x0), BitPattern::Alternating01);
        // bit 1 stuck low: already 0xAAAAAAAA differs
        assert_eq!(first_failing_pattern(0x2, 0x0), BitPattern::Alternating10);
        // bit 0 stuck high: 0xAAAAAAAA has it clear
        assert_eq!(first_failing_pattern(0x1, 0x1), BitPattern::Alternating10);
        // bit 31 stuck high: 0xAAAAAAAA has it set, 0x55555555 differs
        assert_eq!(first_failing_pattern(1 << 31, 1 << 31), BitPattern::Alternating01);
    }

    #[test]
    fn test_byte_corrupted_on_ones() -> anyhow::Result<()> {
        let region = region(0x1000);
        let mut mem = SimMemory::for_region(&region).with_fault(SimFault::PatternSensitive {
            addr: PhysAddr::new(0x7410_0400),
            trigger: 0xFFFF_FFFF,
            flip: 0x0000_FF00,
        });
        let result = DataPatternDiagnostic::new().run(&mut mem, region)?;
        let fault = result.fault().copied().expect("corruption not detected");
        assert_eq!(fault.kind, FaultKind::Pattern(BitPattern::Ones));
        assert_eq!(fault.kind.status_code(), 4);
        assert_eq!(fault.addr, PhysAddr::new(0x7410_0400));
        assert_eq!(fault.expected, 0xFFFF_FFFF);
        assert_eq!(fault.actual, 0xFFFF_00FF);
        Ok(())
    }

    #[test]
    fn test_first_fault_not_overwritten_by_later_patterns() -> anyhow::Result<()> {
        let region = region(0x2000);
        let mut mem = SimMemory::for_region(&region)
            .with_fault(SimFault::PatternSensitive {
                addr: BASE + 0x1000,
                trigger: 0x5555_5555,
                flip: 0x1,
            })
            .with_fault(SimFault::StuckBits {
                addr: BASE + 0x10,
                mask: 0xFF,
                value: 0xFF,
            });
        let fault = DataPatternDiagnostic::new()
            .run(&mut mem, region)?
            .fault()
            .copied()
            .unwrap();
        // 0x74101000 only fails 0x55555555, the stuck byte already fails 0xAAAAAAAA
        assert_eq!(fault.kind, FaultKind::Pattern(BitPattern::Alternating10));
        assert_eq!(fault.addr, BASE + 0x10);
        assert_eq!(fault.actual, 0xAAAA_AAFF);
        Ok(())
    }

    #[test]
    fn test_stop_on_first_fault_reports_same_fault() -> anyhow::Result<()> {
        let region = region(0x2000);
        let faulty = || {
            SimMemory::for_region(&region).with_fault(SimFault::StuckBits {
                addr: BASE + 0x1400,
                mask: 0x8000_0000,
                value: 0,
            })
        };
        let mut mem = faulty();
        let full = DataPatternDiagnostic::new().run(&mut mem, region)?;
        let mut mem = faulty();
        let strict = DataPatternDiagnostic::new()
            .stop_on_first_fault(true)
            .run(&mut mem, region)?;
        assert_eq!(full, strict);
        // aborted before the zeros pattern was written
        assert_eq!(mem.peek(BASE), 0xAAAA_AAAA);
        Ok(())
    }

    #[test]
    fn test_each_pattern_writes_before_reading() -> anyhow::Result<()> {
        let region = region(0x3000);
        let mut mem = RecordingMemory::new(SimMemory::for_region(&region));
        assert!(DataPatternDiagnostic::new().run(&mut mem, region)?.is_pass());
        let n = region.probes().len();
        let expected: Vec<(Access, usize)> = BitPattern::ALL
            .iter()
            .flat_map(|_| [(Access::Write, n), (Access::Read, n)])
            .collect();
        assert_eq!(mem.runs(), expected);
        Ok(())
    }

    #[test]
    fn test_stop_on_first_fault_ends_read_pass() -> anyhow::Result<()> {
        let region = region(0x2000);
        let faulty = BASE + 0x0800;
        let mut mem = RecordingMemory::new(SimMemory::for_region(&region).with_fault(
            SimFault::StuckBits {
                addr: faulty,
                mask: 0x2,
                value: 0,
            },
        ));
        let result = DataPatternDiagnostic::new()
            .stop_on_first_fault(true)
            .run(&mut mem, region)?;
        assert_eq!(
            result.fault().map(|f| (f.kind, f.addr)),
            Some((FaultKind::Pattern(BitPattern::Alternating10), faulty))
        );
        let n = region.probes().len();
        let reads = region
            .probes()
            .position(|p| p.addr == faulty)
            .map_or(0, |i| i + 1);
        assert_eq!(mem.runs(), vec![(Access::Write, n), (Access::Read, reads)]);
        assert_eq!(mem.inner.peek(BASE), 0xAAAA_AAAA);
        Ok(())
    }

    #[test]
    fn test_window_strict_rejects() {
        let region = MemoryRegion::new(PhysAddr::new(0x0010_0000), 0x1000).unwrap();
        let mut mem = SimMemory::for_region(&region);
        assert_eq!(
            DataPatternDiagnostic::new().run(&mut mem, region),
            Err(DiagError::OutsideWindow {
                base: PhysAddr::new(0x0010_0000),
                mask: 0x7000_0000
            })
        );
    }

    #[test]
    fn test_window_legacy_substitutes_default() -> anyhow::Result<()> {
        let window = SdramWindow {
            mask: 0x7000_0000,
            legacy_default: region(0x2000),
        };
        let diag = DataPatternDiagnostic::new().with_window(window, WindowPolicy::Legacy);
        let requested = MemoryRegion::new(PhysAddr::new(0x0010_0000), 0x1000)?;
        assert_eq!(diag.effective_region(requested)?, region(0x2000));

        let mut mem = SimMemory::for_region(&region(0x2000));
        assert!(diag.run(&mut mem, requested)?.is_pass());
        assert_eq!(mem.peek(BASE + 0x1C00), 0xFFFF_FFFF);

        // recognized bases are never replaced
        assert_eq!(diag.effective_region(region(0x400))?, region(0x400));
        Ok(())
    }

    #[test]
    fn test_invalid_legacy_default_rejected() -> anyhow::Result<()> {
        let broken = MemoryRegion {
            base: PhysAddr::new(usize::MAX & !0xFFF),
            size: 0x2000,
        };
        let window = SdramWindow {
            mask: 0x7000_0000,
            legacy_default: broken,
        };
        let diag = DataPatternDiagnostic::new().with_window(window, WindowPolicy::Legacy);
        let requested = MemoryRegion::new(PhysAddr::new(0x0010_0000), 0x1000)?;
        assert!(matches!(
            diag.effective_region(requested),
            Err(DiagError::Region(RegionError::Overflow { .. }))
        ));
        // an invalid request fails before the window is consulted
        assert!(matches!(
            diag.effective_region(broken),
            Err(DiagError::Region(RegionError::Overflow { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_default_window() {
        let window = SdramWindow::default();
        assert!(window.recognizes(BASE));
        assert!(!window.recognizes(PhysAddr::new(0x0800_0000)));
        assert_eq!(window.legacy_default.size, 0x03F0_0000);
    }
}
