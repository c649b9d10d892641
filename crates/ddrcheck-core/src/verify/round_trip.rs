use log::{debug, info, warn};
use serde::Serialize;

use super::{CRC32_RESIDUE, Result, StagingBuffer, VerifyError, embed_checksum, residue};
use crate::storage::{BlockDevice, CacheControl, NoCacheMaintenance, StorageProvider, StorageSpan};
use crate::util::align_up;

/// A successful round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Verified {
    /// Verified span
    pub span: StorageSpan,
    /// First block read
    pub start_block: u64,
    /// Number of blocks read
    pub block_count: usize,
    /// Device block size
    pub block_len: usize,
    /// Checksum stored in the trailer
    pub crc: u32,
}

/// Verifies that storage spans read back into RAM intact.
///
/// For every span the verifier
/// 1. looks up device `devno` and initializes it,
/// 2. reads the blocks covering the span into a zeroed [`StagingBuffer`],
/// 3. flushes the staged range from the data cache,
/// 4. stores the CRC-32 of the payload little-endian in the last four bytes of the
///    span and checks the CRC-32 residue over payload and trailer.
///
/// The last four bytes of the span are overwritten in the staging buffer, never on
/// the device.
pub struct RoundTripVerifier<P, C = NoCacheMaintenance> {
    provider: P,
    cache: C,
    devno: u32,
}

impl<P: StorageProvider> RoundTripVerifier<P> {
    /// Creates a verifier reading from device `devno` of `provider`.
    pub fn new(provider: P, devno: u32) -> Self {
        RoundTripVerifier {
            provider,
            cache: NoCacheMaintenance,
            devno,
        }
    }
}

impl<P: StorageProvider, C: CacheControl> RoundTripVerifier<P, C> {
    /// Uses `cache` for maintenance of the staged range.
    pub fn with_cache<C2: CacheControl>(self, cache: C2) -> RoundTripVerifier<P, C2> {
        RoundTripVerifier {
            provider: self.provider,
            cache,
            devno: self.devno,
        }
    }

    /// Reads `span` into `staging` and checks the checksum residue.
    ///
    /// # Errors
    ///
    /// Returns an error naming the step that failed. A missing device fails before
    /// anything is staged or checksummed.
    pub fn verify(&mut self, span: StorageSpan, staging: &mut StagingBuffer) -> Result<Verified> {
        if span.len < 4 {
            return Err(VerifyError::SpanTooShort { len: span.len });
        }
        let devno = self.devno;
        let mut device = self
            .provider
            .find_device(devno)
            .ok_or(VerifyError::DeviceUnavailable { devno })?;
        device.init().map_err(|e| VerifyError::InitFailed {
            devno,
            source: Box::new(e),
        })?;

        let block_len = device.block_len();
        let range_err = || VerifyError::BlockRange {
            offset: span.offset,
            len: span.len,
        };
        let (start, count) = block_range(span, block_len).ok_or_else(range_err)?;
        let needed = count.checked_mul(block_len).ok_or_else(range_err)?;
        let head = (span.offset % block_len as u64) as usize;

        let capacity = staging.capacity();
        let staged = staging
            .zeroed(needed)
            .ok_or(VerifyError::StagingTooSmall { needed, capacity })?;
        debug!(
            "reading {} blocks of {} bytes from block {} (span {})",
            count, block_len, start, span
        );
        let read = device
            .block_read(start, count, staged)
            .map_err(|e| VerifyError::Read {
                start,
                count,
                source: Box::new(e),
            })?;
        if read < count {
            return Err(VerifyError::ShortRead {
                start,
                requested: count,
                read,
            });
        }
        self.cache.flush_range(staged.as_ptr(), needed);

        let payload = &mut staged[head..head + span.len];
        embed_checksum(payload).ok_or(VerifyError::SpanTooShort { len: span.len })?;
        let crc = check_trailer(payload)?;
        Ok(Verified {
            span,
            start_block: start,
            block_count: count,
            block_len,
            crc,
        })
    }

    /// Like [`verify()`](Self::verify), but logs the outcome and returns `true` iff
    /// the span verified.
    pub fn run(&mut self, span: StorageSpan, staging: &mut StagingBuffer) -> bool {
        match self.verify(span, staging) {
            Ok(verified) => {
                info!(
                    "file write and read check passed (span {}, crc {:#010x})",
                    span, verified.crc
                );
                true
            }
            Err(e) => {
                warn!("file write and read check failed: {}", e);
                false
            }
        }
    }
}

/// Checks the residue of a payload whose last four bytes hold its checksum.
///
/// Returns the checksum stored in the trailer.
///
/// # Errors
///
/// Returns [`VerifyError::SpanTooShort`] for less than four bytes and
/// [`VerifyError::ChecksumMismatch`] if the trailer does not match the payload.
pub fn check_trailer(payload: &[u8]) -> Result<u32> {
    let split = payload
        .len()
        .checked_sub(4)
        .ok_or(VerifyError::SpanTooShort { len: payload.len() })?;
    let residue = residue(payload);
    if residue != CRC32_RESIDUE {
        return Err(VerifyError::ChecksumMismatch { residue });
    }
    let mut trailer = [0u8; 4];
    trailer.copy_from_slice(&payload[split..]);
    Ok(u32::from_le_bytes(trailer))
}

/// First block and block count covering `span`.
fn block_range(span: StorageSpan, block_len: usize) -> Option<(u64, usize)> {
    let block_len = block_len as u64;
    if block_len == 0 {
        return None;
    }
    let start = span.offset / block_len;
    let end = align_up(span.end()?, block_len)? / block_len;
    Some((start, usize::try_from(end - start).ok()?))
}
