use super::PhysAddr;
use crate::util::{STRIDE_SIZE, WORD_SIZE};

/// Number of probed offsets per stride: 0, then 4 doubling up to 1024.
pub const PROBES_PER_STRIDE: usize = 2 + (STRIDE_SIZE / WORD_SIZE).ilog2() as usize;

/// Byte offset of the `n`-th probe within a stride.
///
/// Offset 0 is followed by powers of two from 4 to 1024 inclusive, so the last probe
/// of a stride lands on the first word of the next one.
///
/// # Examples
///
/// ```
/// use ddrcheck_core::memory::{probe_offset, PROBES_PER_STRIDE};
///
/// let offsets: Vec<usize> = (0..PROBES_PER_STRIDE).map(probe_offset).collect();
/// assert_eq!(offsets, vec![0, 4, 8, 16, 32, 64, 128, 256, 512, 1024]);
/// ```
pub const fn probe_offset(n: usize) -> usize {
    match n {
        0 => 0,
        n => WORD_SIZE << (n - 1),
    }
}

/// A single probed address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    /// Index of the stride this probe belongs to
    pub stride: usize,
    /// Position within the stride (see [`probe_offset`])
    pub index: usize,
    /// Absolute address of the probed word
    pub addr: PhysAddr,
}

/// Iterator over every probed address of a region, stride by stride.
///
/// Within a stride the offsets ascend, strides ascend from the base. The walk is
/// deterministic, so a write pass and the following read pass visit exactly the
/// same addresses in the same order.
#[derive(Clone, Debug)]
pub struct ProbeWalk {
    base: PhysAddr,
    strides: usize,
    stride: usize,
    probe: usize,
}

impl ProbeWalk {
    /// Walks `strides` strides starting at `base`.
    pub fn new(base: PhysAddr, strides: usize) -> Self {
        ProbeWalk {
            base,
            strides,
            stride: 0,
            probe: 0,
        }
    }
}

impl Iterator for ProbeWalk {
    type Item = Probe;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stride >= self.strides {
            return None;
        }
        let probe = Probe {
            stride: self.stride,
            index: self.probe,
            addr: self.base + (self.stride * STRIDE_SIZE + probe_offset(self.probe)),
        };
        self.probe += 1;
        if self.probe == PROBES_PER_STRIDE {
            self.probe = 0;
            self.stride += 1;
        }
        Some(probe)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ProbeWalk {
    fn len(&self) -> usize {
        (self.strides - self.stride.min(self.strides)) * PROBES_PER_STRIDE - self.probe
    }
}

#[cfg(test)]
mod tests {
    use super::{PROBES_PER_STRIDE, ProbeWalk, probe_offset};
    use crate::memory::{MemoryRegion, PhysAddr};

    #[test]
    fn test_probe_offsets() {
        assert_eq!(PROBES_PER_STRIDE, 10);
        let offsets: Vec<usize> = (0..PROBES_PER_STRIDE).map(probe_offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 16, 32, 64, 128, 256, 512, 1024]);
    }

    #[test]
    fn test_walk_order() {
        let base = PhysAddr::new(0x7410_0000);
        let walk: Vec<_> = ProbeWalk::new(base, 2).collect();
        assert_eq!(walk.len(), 20);
        assert_eq!(walk[0].addr, base);
        assert_eq!(walk[9].addr, base + 1024);
        assert_eq!(walk[10].addr, base + 1024);
        assert_eq!(walk[10].stride, 1);
        assert_eq!(walk[10].index, 0);
        assert_eq!(walk[19].index, 9);
        assert_eq!(walk[19].addr, base + 2048);
        assert!(walk.windows(2).all(|w| w[0].stride <= w[1].stride));
    }

    #[test]
    fn test_walk_len_tracks_progress() {
        let mut walk = ProbeWalk::new(PhysAddr::new(0), 3);
        assert_eq!(walk.len(), 30);
        walk.nth(11);
        assert_eq!(walk.len(), 18);
        assert_eq!(walk.by_ref().count(), 18);
        assert_eq!(walk.len(), 0);
        assert_eq!(walk.next(), None);
    }

    #[test]
    fn test_walk_stays_in_footprint() {
        let region = MemoryRegion::new(PhysAddr::new(0x7410_0000), 0x1000 + 8).unwrap();
        let footprint = region.footprint();
        assert_eq!(region.probes().len(), 50);
        for probe in region.probes() {
            assert!(footprint.contains(&probe.addr));
            assert!(probe.addr + 4 <= footprint.end);
        }
        assert_eq!(region.probes().last().unwrap().addr + 4, footprint.end);
    }
}
