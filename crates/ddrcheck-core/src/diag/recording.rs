use std::ops::Range;

use crate::memory::{PhysAddr, SimMemory, WordAccess};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    Write,
    Read,
}

/// Accessor that logs the kind of every access it forwards to a [`SimMemory`].
pub(crate) struct RecordingMemory {
    pub(crate) inner: SimMemory,
    pub(crate) log: Vec<Access>,
}

impl RecordingMemory {
    pub(crate) fn new(inner: SimMemory) -> Self {
        RecordingMemory { inner, log: vec![] }
    }

    /// The log collapsed into runs of equal accesses.
    pub(crate) fn runs(&self) -> Vec<(Access, usize)> {
        let mut runs: Vec<(Access, usize)> = vec![];
        for &access in &self.log {
            match runs.last_mut() {
                Some((last, n)) if *last == access => *n += 1,
                _ => runs.push((access, 1)),
            }
        }
        runs
    }
}

impl WordAccess for RecordingMemory {
    fn window(&self) -> Range<PhysAddr> {
        self.inner.window()
    }

    fn read_word(&mut self, addr: PhysAddr) -> u32 {
        self.log.push(Access::Read);
        self.inner.read_word(addr)
    }

    fn write_word(&mut self, addr: PhysAddr, value: u32) {
        self.log.push(Access::Write);
        self.inner.write_word(addr, value)
    }
}
