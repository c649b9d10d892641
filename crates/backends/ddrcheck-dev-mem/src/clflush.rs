use std::arch::x86_64::{_mm_clflush, _mm_mfence};

use ddrcheck_core::storage::CacheControl;
use ddrcheck_core::util::CL_SIZE;

/// Flushes cache lines with `clflush`, fenced by `mfence`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clflush;

impl CacheControl for Clflush {
    fn flush_range(&self, ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        let start = ptr as usize & !(CL_SIZE - 1);
        let end = ptr as usize + len;
        unsafe {
            _mm_mfence();
            for line in (start..end).step_by(CL_SIZE) {
                _mm_clflush(line as *const u8);
            }
            _mm_mfence();
        }
    }
}
