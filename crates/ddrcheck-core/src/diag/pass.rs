use std::ops::ControlFlow;

use indicatif::{MultiProgress, ProgressBar};
use log::debug;

use crate::memory::{MemoryRegion, PhysAddr, Probe, WordAccess};
use crate::util::stride_bar;

/// Drives write and read passes over the probe walk of a region.
///
/// Reports progress every `interval` strides, as a debug line and, if enabled, on a
/// progress bar.
pub(super) struct Passes<'a> {
    progress: Option<&'a MultiProgress>,
    interval: usize,
}

impl<'a> Passes<'a> {
    pub(super) fn new(progress: Option<&'a MultiProgress>, interval: usize) -> Self {
        Passes {
            progress,
            interval: interval.max(1),
        }
    }

    /// Stores `value(addr)` at every probed address.
    pub(super) fn write<M: WordAccess + ?Sized>(
        &self,
        mem: &mut M,
        region: &MemoryRegion,
        label: &str,
        mut value: impl FnMut(PhysAddr) -> u32,
    ) {
        let bar = stride_bar(self.progress, label, region.stride_count());
        for probe in region.probes() {
            self.report(&bar, label, &probe);
            mem.write_word(probe.addr, value(probe.addr));
        }
        finish(bar);
    }

    /// Loads every probed address and hands `(addr, actual)` to `check`.
    ///
    /// Returns the `ControlFlow::Break` of `check` if it stopped the pass early.
    pub(super) fn read<M: WordAccess + ?Sized, B>(
        &self,
        mem: &mut M,
        region: &MemoryRegion,
        label: &str,
        mut check: impl FnMut(PhysAddr, u32) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        let bar = stride_bar(self.progress, label, region.stride_count());
        let mut flow = ControlFlow::Continue(());
        for probe in region.probes() {
            self.report(&bar, label, &probe);
            flow = check(probe.addr, mem.read_word(probe.addr));
            if flow.is_break() {
                break;
            }
        }
        finish(bar);
        flow
    }

    fn report(&self, bar: &Option<ProgressBar>, label: &str, probe: &Probe) {
        if probe.index != 0 {
            return;
        }
        if let Some(bar) = bar {
            bar.set_position(probe.stride as u64 + 1);
        }
        if probe.stride.is_multiple_of(self.interval) {
            debug!("{} @{:#010x} (stride {})", label, probe.addr, probe.stride);
        }
    }
}

fn finish(bar: Option<ProgressBar>) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}
