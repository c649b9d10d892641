use std::ops::ControlFlow;

use indicatif::MultiProgress;
use log::{info, warn};

use super::pass::Passes;
use super::{DiagError, Diagnostic, DiagnosticResult, Fault, FaultKind, check_reachable};
use crate::memory::{MemoryRegion, WordAccess};
use crate::util::PROGRESS_INTERVAL;

/// Address line diagnostic.
///
/// Writes every probed address's own value into that address, then, after the whole
/// region has been written, reads every probed address back. An address line that
/// is stuck or shorted makes two probed addresses reach the same cell; the later
/// write overwrites the earlier one and the read pass sees a foreign address.
#[derive(Clone, Debug)]
pub struct AddressLineDiagnostic {
    progress: Option<MultiProgress>,
    progress_interval: usize,
}

impl Default for AddressLineDiagnostic {
    fn default() -> Self {
        Self {
            progress: None,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl AddressLineDiagnostic {
    /// Creates the diagnostic with default progress reporting.
    pub fn new() -> Self {
        Self::default()
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
}

impl Diagnostic for AddressLineDiagnostic {
    fn name(&self) -> &'static str {
        "addr"
    }

    fn run<M: WordAccess + ?Sized>(
        &self,
        mem: &mut M,
        region: MemoryRegion,
    ) -> Result<DiagnosticResult, DiagError> {
        check_reachable(mem, &region)?;
        info!("address line test over {}", region);
        let passes = Passes::new(self.progress.as_ref(), self.progress_interval);

        passes.write(mem, &region, "Address write", |addr| addr.as_word());

        let flow = passes.read(mem, &region, "Address check", |addr, actual| {
            if actual == addr.as_word() {
                return ControlFlow::Continue(());
            }
            ControlFlow::Break(Fault {
                kind: FaultKind::AddressMirror,
                addr,
                expected: addr.as_word(),
                actual,
            })
        });
        let result = match flow {
            ControlFlow::Continue(()) => DiagnosticResult::Pass,
            ControlFlow::Break(fault) => {
                warn!(
                    "address test failed at {:#010x}: content {:#010x}",
                    fault.addr, fault.actual
                );
                DiagnosticResult::Fail(fault)
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::AddressLineDiagnostic;
    use crate::diag::recording::{Access, RecordingMemory};
    use crate::diag::{DiagError, Diagnostic, DiagnosticResult, FaultKind};
    use crate::memory::{MemoryRegion, PhysAddr, SimFault, SimMemory};
    use crate::util::Rng;

    const BASE: PhysAddr = PhysAddr::new(0x7410_0000);

    fn region(size: usize) -> MemoryRegion {
        MemoryRegion::new(BASE, size).unwrap()
    }

    #[test]
    fn test_address_pass() -> anyhow::Result<()> {
        let region = region(0x1_0000);
        let mut mem = SimMemory::for_region(&region);
        mem.randomize(&mut Rng::from_seed(0x5eed));
        let result = AddressLineDiagnostic::new().run(&mut mem, region)?;
        assert_eq!(result, DiagnosticResult::Pass);
        assert_eq!(mem.peek(BASE + 0x400), 0x7410_0400);
        Ok(())
    }

    #[test]
    fn test_address_line_stuck_low() -> anyhow::Result<()> {
        let region = region(0x1_0000);
        let mut mem = SimMemory::for_region(&region).with_fault(SimFault::AddressLine {
            bit: 12,
            high: false,
        });
        let result = AddressLineDiagnostic::new().run(&mut mem, region)?;
        let fault = result.fault().copied().expect("stuck address line not detected");
        assert_eq!(fault.kind, FaultKind::AddressMirror);
        // 0x74101000 decodes onto 0x74100000 and wrote it last
        assert_eq!(fault.addr, BASE);
        assert_eq!(fault.expected, 0x7410_0000);
        assert_eq!(fault.actual, 0x7410_1000);
        Ok(())
    }

    #[test]
    fn test_address_alias_reported_at_first_address_in_traversal() -> anyhow::Result<()> {
        let region = region(0x1000);
        let mut mem = SimMemory::for_region(&region)
            .with_fault(SimFault::Alias {
                from: BASE + 0x0C20,
                to: BASE + 0x0820,
            })
            .with_fault(SimFault::Alias {
                from: BASE + 0x0840,
                to: BASE + 0x0440,
            });
        let result = AddressLineDiagnostic::new().run(&mut mem, region)?;
        let fault = result.fault().copied().unwrap();
        // stride 1 holds 0x74100440 and comes before stride 2 holding 0x74100820
        assert_eq!(fault.addr, BASE + 0x0440);
        assert_eq!(fault.actual, 0x7410_0840);
        Ok(())
    }

    #[test]
    fn test_address_writes_complete_before_reads() -> anyhow::Result<()> {
        let region = region(0x4000);
        let mut mem = RecordingMemory::new(SimMemory::for_region(&region));
        AddressLineDiagnostic::new().run(&mut mem, region)?;
        let n = region.probes().len();
        assert_eq!(mem.runs(), vec![(Access::Write, n), (Access::Read, n)]);
        Ok(())
    }

    #[test]
    fn test_address_read_pass_stops_at_fault() -> anyhow::Result<()> {
        let region = region(0x2000);
        let mut mem = RecordingMemory::new(SimMemory::for_region(&region).with_fault(
            SimFault::Alias {
                from: BASE + 0x1100,
                to: BASE + 0x0900,
            },
        ));
        let result = AddressLineDiagnostic::new().run(&mut mem, region)?;
        assert_eq!(result.fault().map(|f| f.addr), Some(BASE + 0x0900));
        let n = region.probes().len();
        let reads = region
            .probes()
            .position(|p| p.addr == BASE + 0x0900)
            .map_or(0, |i| i + 1);
        assert_eq!(mem.runs(), vec![(Access::Write, n), (Access::Read, reads)]);
        Ok(())
    }

    #[test]
    fn test_address_rejects_unmapped_footprint() {
        let region = region(0x1000);
        // exactly `size` bytes, without room for the last stride's overrun
        let mut mem = SimMemory::new(BASE, 0x1000);
        assert_eq!(
            AddressLineDiagnostic::new().run(&mut mem, region),
            Err(DiagError::NotMapped {
                start: BASE,
                end: BASE + 0x1004
            })
        );
    }

    #[test]
    fn test_address_small_regions() -> anyhow::Result<()> {
        let empty = region(0);
        let mut mem = SimMemory::new(BASE, 0x10);
        assert!(AddressLineDiagnostic::new().run(&mut mem, empty)?.is_pass());

        let tiny = region(16);
        let mut mem = SimMemory::for_region(&tiny);
        assert!(AddressLineDiagnostic::new().run(&mut mem, tiny)?.is_pass());
        Ok(())
    }
}
