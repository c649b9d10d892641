//! File-backed storage for ddrcheck.
//!
//! This crate reads firmware spans from image files or block device nodes such as
//! `/dev/mmcblk0`. Implements the [`ddrcheck_core::storage::StorageProvider`] and
//! [`ddrcheck_core::storage::BlockDevice`] traits.

#![warn(missing_docs)]

mod file;

pub use file::{BlockDevError, FileBlockDevice, FileStorage};
