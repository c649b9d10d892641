use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use ddrcheck_core::config::StorageConfig;
use ddrcheck_core::storage::{BlockDevice, StorageProvider};
use log::{debug, info};
use thiserror::Error;

/// Errors of file-backed block devices.
#[derive(Debug, Error)]
pub enum BlockDevError {
    /// `block_read` before a successful `init`
    #[error("device {0} is not initialized")]
    NotInitialized(PathBuf),
    /// The block size is zero
    #[error("device {0} has block size 0")]
    ZeroBlockLen(PathBuf),
    /// The destination cannot hold the requested blocks
    #[error("destination of {available} bytes cannot hold {needed} bytes")]
    ShortBuffer {
        /// Bytes requested
        needed: usize,
        /// Bytes available in the destination
        available: usize,
    },
    /// Reading the file failed
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// A block device backed by an image file or a device node.
///
/// The file is opened read-only by [`init()`](BlockDevice::init). A trailing partial
/// block of an image file counts as read, its missing bytes are left untouched in
/// the destination.
#[derive(Debug)]
pub struct FileBlockDevice {
    path: PathBuf,
    block_len: usize,
    file: Option<File>,
}

impl FileBlockDevice {
    /// Creates a device for `path` with blocks of `block_len` bytes.
    pub fn new(path: impl Into<PathBuf>, block_len: usize) -> Self {
        FileBlockDevice {
            path: path.into(),
            block_len,
            file: None,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileBlockDevice {
    type Error = BlockDevError;

    fn init(&mut self) -> Result<(), Self::Error> {
        if self.block_len == 0 {
            return Err(BlockDevError::ZeroBlockLen(self.path.clone()));
        }
        self.file = Some(File::open(&self.path)?);
        info!("opened {} ({} byte blocks)", self.path.display(), self.block_len);
        Ok(())
    }

    fn block_len(&self) -> usize {
        self.block_len
    }

    fn block_read(
        &mut self,
        start: u64,
        count: usize,
        dst: &mut [u8],
    ) -> Result<usize, Self::Error> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| BlockDevError::NotInitialized(self.path.clone()))?;
        let needed = count * self.block_len;
        let available = dst.len();
        let dst = dst
            .get_mut(..needed)
            .ok_or(BlockDevError::ShortBuffer { needed, available })?;
        file.seek(SeekFrom::Start(start * self.block_len as u64))?;

        let mut filled = 0;
        while filled < needed {
            match file.read(&mut dst[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let blocks = filled.div_ceil(self.block_len);
        debug!(
            "{}: read {} of {} blocks at block {}",
            self.path.display(),
            blocks,
            count,
            start
        );
        Ok(blocks)
    }
}

/// Storage provider mapping device numbers to files.
///
/// A device is found only if its file exists.
#[derive(Clone, Debug, Default)]
pub struct FileStorage {
    devices: BTreeMap<u32, (PathBuf, usize)>,
}

impl FileStorage {
    /// Creates a provider without devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider with the devices of the `storage` configuration section.
    pub fn from_config(config: &StorageConfig) -> Self {
        config
            .devices
            .iter()
            .fold(Self::new(), |storage, dev| {
                storage.with_device(dev.devno, &dev.path, dev.block_len)
            })
    }

    /// Adds device `devno` backed by `path`, builder style.
    pub fn with_device(mut self, devno: u32, path: impl Into<PathBuf>, block_len: usize) -> Self {
        self.devices.insert(devno, (path.into(), block_len));
        self
    }
}

impl StorageProvider for FileStorage {
    type Device = FileBlockDevice;

    fn find_device(&mut self, devno: u32) -> Option<Self::Device> {
        let (path, block_len) = self.devices.get(&devno)?;
        if !path.exists() {
            debug!("device {} backing file {} missing", devno, path.display());
            return None;
        }
        Some(FileBlockDevice::new(path.clone(), *block_len))
    }
}
