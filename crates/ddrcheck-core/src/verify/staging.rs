/// Caller-owned scratch memory the verifier stages blocks into.
///
/// The capacity is fixed at construction. Every verification borrows the buffer
/// mutably, so one buffer never serves two verifications at once.
#[derive(Debug)]
pub struct StagingBuffer {
    buf: Box<[u8]>,
}

impl StagingBuffer {
    /// Allocates a zeroed buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        StagingBuffer {
            buf: vec![0; capacity].into_boxed_slice(),
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Zeroes and returns the first `len` bytes, or `None` if `len` exceeds the
    /// capacity.
    pub fn zeroed(&mut self, len: usize) -> Option<&mut [u8]> {
        let area = self.buf.get_mut(..len)?;
        area.fill(0);
        Some(area)
    }

    /// The first `len` bytes as they are.
    pub fn get(&self, len: usize) -> Option<&[u8]> {
        self.buf.get(..len)
    }
}
