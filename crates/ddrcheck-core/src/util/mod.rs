//! Address constants, [`Size`] for log output, the seedable [`Rng`] behind
//! simulated memory and the stride progress bars.

mod constants;
mod named_progress;
mod rng;
mod size;

pub use self::constants::*;
pub use self::named_progress::{NamedProgress, stride_bar};
pub use self::rng::Rng;
pub use self::size::Size;

/// Rounds `value` up to the next multiple of `align`.
///
/// Returns `None` on overflow or if `align` is zero.
///
/// # Examples
///
/// ```
/// use ddrcheck_core::util::align_up;
///
/// assert_eq!(align_up(1000, 512), Some(1024));
/// assert_eq!(align_up(1024, 512), Some(1024));
/// assert_eq!(align_up(1, 0), None);
/// ```
pub fn align_up(value: u64, align: u64) -> Option<u64> {
    if align == 0 {
        return None;
    }
    value.checked_next_multiple_of(align)
}

#[cfg(test)]
mod tests {
    use super::align_up;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 512), Some(0));
        assert_eq!(align_up(511, 512), Some(512));
        assert_eq!(align_up(513, 512), Some(1024));
        assert_eq!(align_up(u64::MAX, 512), None);
    }
}
