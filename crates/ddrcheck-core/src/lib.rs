//! # ddrcheck Core
//!
//! `ddrcheck-core` is the foundational library of the ddrcheck SDRAM diagnostics.
//! It proves that every address line and data line of an SDRAM interface is wired
//! and working, and that firmware images read from block storage into RAM read back
//! byte-identical.
//!
//! ## Architecture Overview
//!
//! The library is built around three traits that isolate everything touching
//! hardware:
//!
//! - [`memory::WordAccess`] - 32-bit loads and stores at physical addresses. The
//!   only place where raw memory is dereferenced is [`memory::MappedMemory`];
//!   [`memory::SimMemory`] simulates a region (with injectable faults) for tests.
//!
//! - [`storage::BlockDevice`] / [`storage::StorageProvider`] - block reads from the
//!   storage device holding the firmware images.
//!
//! - [`storage::CacheControl`] - cache maintenance after device-driven writes into RAM.
//!
//! ## Main Components
//!
//! - [`diag::AddressLineDiagnostic`] - detects address lines that mirror or short.
//! - [`diag::DataPatternDiagnostic`] - detects stuck or shorted data lines.
//! - [`SdramDiag`] - runs both diagnostics over one region in the legacy order.
//! - [`verify::RoundTripVerifier`] - CRC-32 residue check of a staged firmware image.
//!
//! ## Concurrency
//!
//! Everything is synchronous and single-threaded. The region under test and the
//! staging buffer must be exclusively owned for the duration of a call; the APIs take
//! them by `&mut` and callers must serialize calls that target the same hardware.

#![warn(missing_docs)]

pub mod config;
pub mod diag;
pub mod firmware;
pub mod memory;
mod sdram;
pub mod storage;
pub mod util;
pub mod verify;

pub use crate::config::DiagConfig;
pub use crate::sdram::{SdramDiag, SdramReport, Stage, StageRegions, StageResult};
