/// A byte count in binary units, for log lines and configuration defaults.
///
/// ```
/// use ddrcheck_core::util::Size;
///
/// assert_eq!(Size::MB(16).bytes(), 16 << 20);
/// assert_eq!(Size::from_bytes(0x03F0_0000).to_string(), "63 MB");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Size {
    /// Bytes
    B(usize),
    /// KiB
    KB(usize),
    /// MiB
    MB(usize),
    /// GiB
    GB(usize),
}

impl Size {
    /// Number of bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Size::B(bytes) => *bytes,
            Size::KB(kb) => *kb * (1 << 10),
            Size::MB(mb) => *mb * (1 << 20),
            Size::GB(gb) => *gb * (1 << 30),
        }
    }

    /// Picks the largest unit that represents `bytes` exactly.
    pub const fn from_bytes(bytes: usize) -> Self {
        if bytes != 0 && bytes.is_multiple_of(1 << 30) {
            Size::GB(bytes >> 30)
        } else if bytes != 0 && bytes.is_multiple_of(1 << 20) {
            Size::MB(bytes >> 20)
        } else if bytes != 0 && bytes.is_multiple_of(1 << 10) {
            Size::KB(bytes >> 10)
        } else {
            Size::B(bytes)
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Size::B(bytes) => write!(f, "{} B", bytes),
            Size::KB(kb) => write!(f, "{} KB", kb),
            Size::MB(mb) => write!(f, "{} MB", mb),
            Size::GB(gb) => write!(f, "{} GB", gb),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::util::Size;

    #[test]
    fn size_conversions() {
        let bytes = Size::B(12);
        assert_eq!(bytes.bytes(), 12);
        let mb = Size::MB(12);
        assert_eq!(mb.bytes(), 12 * (1 << 20));
        let gb = Size::GB(12);
        assert_eq!(gb.bytes(), 12 * (1 << 30));
    }

    #[test]
    fn size_from_bytes() {
        assert_eq!(Size::from_bytes(0x03F0_0000), Size::MB(63));
        assert_eq!(Size::from_bytes(0x1000), Size::KB(4));
        assert_eq!(Size::from_bytes(1000), Size::B(1000));
        assert_eq!(Size::from_bytes(0), Size::B(0));
        assert_eq!(Size::from_bytes(1 << 30).to_string(), "1 GB");
    }
}
