/// Page shift value (12 bits) for 4KB pages
pub const PAGE_SHIFT: usize = 12;
/// Standard page size (4096 bytes)
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// Mask for extracting page offset
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Stride shift value (10 bits) for 1KB probe strides
pub const STRIDE_SHIFT: usize = 10;
/// Granularity at which probe offsets repeat across a region (1024 bytes)
pub const STRIDE_SIZE: usize = 1 << STRIDE_SHIFT;

/// Width of a probed word in bytes
pub const WORD_SIZE: usize = 4;

/// Cache line size (64 bytes) for x86_64
pub const CL_SIZE: usize = 64;

/// Progress is reported every this many strides
pub const PROGRESS_INTERVAL: usize = 2 * 1024;
