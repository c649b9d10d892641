const POLY: u32 = 0xEDB8_8320;

const TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Residue of the CRC-32 over a message followed by its own little-endian checksum,
/// after complementing.
pub const CRC32_RESIDUE: u32 = 0xdebb_20e3;

/// Incremental CRC-32 (IEEE 802.3, reflected, init and xorout `0xFFFFFFFF`).
#[derive(Clone, Copy, Debug)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    /// Starts a new checksum.
    pub const fn new() -> Self {
        Crc32 { state: 0xFFFF_FFFF }
    }

    /// Feeds `bytes` into the checksum.
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let idx = ((self.state ^ u32::from(byte)) & 0xFF) as usize;
            self.state = (self.state >> 8) ^ TABLE[idx];
        }
    }

    /// Returns the checksum of everything fed so far.
    pub const fn finalize(self) -> u32 {
        !self.state
    }
}

/// CRC-32 of `bytes`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finalize()
}

/// Stores the CRC-32 of `buf[..len - 4]` little-endian in the last 4 bytes of `buf`.
///
/// Returns the stored checksum, or `None` if `buf` is shorter than 4 bytes.
pub fn embed_checksum(buf: &mut [u8]) -> Option<u32> {
    let split = buf.len().checked_sub(4)?;
    let (payload, trailer) = buf.split_at_mut(split);
    let crc = crc32(payload);
    trailer.copy_from_slice(&crc.to_le_bytes());
    Some(crc)
}

/// Complemented CRC-32 over the whole of `buf`, trailer included.
///
/// Equals [`CRC32_RESIDUE`] iff the trailer matches the payload.
pub fn residue(buf: &[u8]) -> u32 {
    !crc32(buf)
}

#[cfg(test)]
mod tests {
    use rand::RngCore;

    use super::{CRC32_RESIDUE, Crc32, crc32, embed_checksum, residue};
    use crate::util::Rng;

    #[test]
    fn test_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_incremental() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut crc = Crc32::new();
        crc.update(&data[..10]);
        crc.update(&data[10..]);
        assert_eq!(crc.finalize(), crc32(data));
        assert_eq!(crc32(data), 0x414F_A339);
    }

    #[test]
    fn test_residue_law() {
        let mut rng = Rng::from_seed(0xc0ffee);
        let mut random = vec![0u8; 4099];
        rng.fill_bytes(&mut random);
        for mut buf in [vec![0u8; 1024], vec![0xFFu8; 1024], random, vec![0u8; 4]] {
            embed_checksum(&mut buf).unwrap();
            assert_eq!(residue(&buf), CRC32_RESIDUE);
        }
    }

    #[test]
    fn test_residue_detects_corruption() {
        let mut buf = b"123456789\0\0\0\0".to_vec();
        assert_eq!(embed_checksum(&mut buf), Some(0xCBF4_3926));
        assert_eq!(&buf[9..], &[0x26, 0x39, 0xF4, 0xCB]);
        buf[3] ^= 0x10;
        assert_ne!(residue(&buf), CRC32_RESIDUE);
        assert_eq!(embed_checksum(&mut [0u8; 3]), None);
    }
}
