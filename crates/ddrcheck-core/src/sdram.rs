use indicatif::MultiProgress;
use log::{info, warn};
use serde::Serialize;

use crate::config::SdramConfig;
use crate::diag::{
    AddressLineDiagnostic, DataPatternDiagnostic, DiagError, Diagnostic, DiagnosticResult,
};
use crate::memory::{MemoryRegion, WordAccess};

/// A stage of the SDRAM check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Data line check with the four bit patterns
    Pattern,
    /// Address line check
    Address,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Pattern => write!(f, "pattern"),
            Stage::Address => write!(f, "addr"),
        }
    }
}

/// Outcome of one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StageResult {
    /// Which stage ran
    pub stage: Stage,
    /// Region the stage actually tested
    pub tested: MemoryRegion,
    /// Pass or the first fault
    pub result: DiagnosticResult,
}

/// Results of a complete SDRAM check.
///
/// Stages that did not run because an earlier one failed are absent.
#[derive(Clone, Debug, Serialize)]
pub struct SdramReport {
    /// RFC 3339 timestamp of when the check ran
    pub date: String,
    /// Requested region
    pub region: MemoryRegion,
    /// Stages in the order they ran
    pub stages: Vec<StageResult>,
}

impl SdramReport {
    /// Returns true if every stage ran and passed.
    pub fn is_pass(&self) -> bool {
        self.stages.len() == 2 && self.stages.iter().all(|s| s.result.is_pass())
    }

    /// Status code of the check.
    ///
    /// 0 on success, the failing pattern index + 1 for a data line fault, 1 for an
    /// address line fault.
    pub fn status_code(&self) -> u8 {
        self.stages
            .iter()
            .find_map(|s| s.result.fault())
            .map(|fault| fault.kind.status_code())
            .unwrap_or(0)
    }
}

/// Regions tested by the two stages of one check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageRegions {
    /// Region of the pattern stage
    pub pattern: MemoryRegion,
    /// Region of the address stage, always the requested one
    pub address: MemoryRegion,
}

impl StageRegions {
    /// Returns true if both stages test the same region.
    pub fn is_shared(&self) -> bool {
        self.pattern == self.address
    }
}

/// Runs the data pattern check and then the address line check over one region.
///
/// The address check only runs if the pattern check passed: with broken data lines
/// the address values cannot be read back reliably either.
#[derive(Clone, Debug, Default)]
pub struct SdramDiag {
    pattern: DataPatternDiagnostic,
    address: AddressLineDiagnostic,
}

impl SdramDiag {
    /// Creates the check from the `sdram` configuration section.
    pub fn new(config: &SdramConfig) -> Self {
        SdramDiag {
            pattern: DataPatternDiagnostic::new()
                .with_window(config.window(), config.window_policy)
                .stop_on_first_fault(config.stop_on_first_fault)
                .with_progress_interval(config.progress_interval),
            address: AddressLineDiagnostic::new()
                .with_progress_interval(config.progress_interval),
        }
    }

    /// Draws progress bars for both stages on `progress`.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.pattern = self.pattern.with_progress(progress.clone());
        self.address = self.address.with_progress(progress);
        self
    }

    /// Regions the two stages test for a requested `region`.
    ///
    /// Under the legacy window policy the pattern stage may test the substituted
    /// region while the address stage tests the requested one. Accessors handed to
    /// [`run_split()`](Self::run_split) must cover the footprint of their stage's
    /// region.
    ///
    /// # Errors
    ///
    /// Returns [`DiagError::Region`] for an invalid region and
    /// [`DiagError::OutsideWindow`] for a rejected base.
    pub fn stage_regions(&self, region: MemoryRegion) -> Result<StageRegions, DiagError> {
        Ok(StageRegions {
            pattern: self.pattern.effective_region(region)?,
            address: region,
        })
    }

    /// Runs both stages over `region` through one accessor.
    ///
    /// `mem` must cover both regions of [`stage_regions()`](Self::stage_regions).
    ///
    /// # Errors
    ///
    /// Returns the [`DiagError`] of the first stage that could not run. Detected
    /// faults are part of the report.
    pub fn run<M: WordAccess + ?Sized>(
        &self,
        mem: &mut M,
        region: MemoryRegion,
    ) -> Result<SdramReport, DiagError> {
        self.run_stages(region, |stage, tested| match stage {
            Stage::Pattern => self.pattern.run(mem, tested),
            Stage::Address => self.address.run(mem, tested),
        })
    }

    /// Runs the pattern stage through `pattern_mem` and the address stage through
    /// `address_mem`.
    ///
    /// # Errors
    ///
    /// See [`run()`](Self::run).
    pub fn run_split<P, A>(
        &self,
        pattern_mem: &mut P,
        address_mem: &mut A,
        region: MemoryRegion,
    ) -> Result<SdramReport, DiagError>
    where
        P: WordAccess + ?Sized,
        A: WordAccess + ?Sized,
    {
        self.run_stages(region, |stage, tested| match stage {
            Stage::Pattern => self.pattern.run(pattern_mem, tested),
            Stage::Address => self.address.run(address_mem, tested),
        })
    }

    fn run_stages(
        &self,
        region: MemoryRegion,
        mut stage: impl FnMut(Stage, MemoryRegion) -> Result<DiagnosticResult, DiagError>,
    ) -> Result<SdramReport, DiagError> {
        let regions = self.stage_regions(region)?;
        let mut report = SdramReport {
            date: chrono::Local::now().to_rfc3339(),
            region,
            stages: Vec::with_capacity(2),
        };

        let result = stage(Stage::Pattern, regions.pattern)?;
        report.stages.push(StageResult {
            stage: Stage::Pattern,
            tested: regions.pattern,
            result,
        });
        if let DiagnosticResult::Fail(fault) = result {
            warn!("pattern {:08X} test FAILED, skipping address test", fault.expected);
            return Ok(report);
        }
        info!("pattern test OK");

        let result = stage(Stage::Address, regions.address)?;
        report.stages.push(StageResult {
            stage: Stage::Address,
            tested: regions.address,
            result,
        });
        if result.is_pass() {
            info!("addr test OK");
        }
        Ok(report)
    }
}
