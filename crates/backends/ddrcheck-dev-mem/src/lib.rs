//! /dev/mem backend for ddrcheck.
//!
//! This crate maps physical memory through `/dev/mem` so the SDRAM diagnostics can
//! run on a live Linux system. Requires root privileges.
//!
//! Provides [`DevMemWindow`], an implementation of
//! [`ddrcheck_core::memory::WordAccess`], and on x86_64 the [`Clflush`]
//! implementation of [`ddrcheck_core::storage::CacheControl`].
//!
//! # Platform Requirements
//!
//! - Linux
//! - Root privileges for `/dev/mem` access
//! - Kernel must allow `/dev/mem` access to the tested range (`CONFIG_STRICT_DEVMEM`
//!   restricts it to non-RAM ranges on most distributions)

#![warn(missing_docs)]

#[cfg(target_arch = "x86_64")]
mod clflush;
mod dev_mem;

#[cfg(target_arch = "x86_64")]
pub use clflush::Clflush;
pub use dev_mem::{DevMemError, DevMemWindow};
