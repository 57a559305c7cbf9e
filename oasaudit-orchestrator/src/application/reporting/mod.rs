//! Report Emitter - JSON, SARIF and highlights outputs
//!
//! Every audited contract appears in every report, whatever its status. Jobs that did not
//! complete carry empty findings and an explanatory note.

pub mod highlights;
pub mod json;
pub mod sarif;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use oasaudit_api::SkippedContract;
use oasaudit_core::config::ReportConfig;

use crate::application::gate::SqgVerdict;
use crate::TOOL_NAME;
use crate::domain::{AuditJob, AuditStatus, RepoKey};

pub use highlights::{Highlights, build_highlights};
pub use json::{JsonReport, build_json_report};
pub use sarif::{SarifExporter, SarifLevel, SarifReport};

/// A finished job with its gate verdict; only completed jobs have one
#[derive(Debug, Clone)]
pub struct ContractOutcome {
    pub job: AuditJob,
    pub verdict: Option<SqgVerdict>,
}

impl ContractOutcome {
    pub fn passed(&self) -> Option<bool> {
        self.verdict.as_ref().map(|v| v.passed)
    }
}

/// Per-category counts for the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub classified: usize,
    pub skipped: usize,
    pub audited: usize,
    pub failed: usize,
    pub quota_exceeded: usize,
    pub sqg_passed: usize,
    pub sqg_failed: usize,
}

impl RunSummary {
    pub fn tally(discovered: usize, skipped: usize, contracts: &[ContractOutcome]) -> Self {
        let mut summary = Self {
            discovered,
            classified: contracts.len(),
            skipped,
            ..Self::default()
        };

        for outcome in contracts {
            match outcome.job.status {
                AuditStatus::Completed => summary.audited += 1,
                AuditStatus::QuotaExceeded => summary.quota_exceeded += 1,
                AuditStatus::Failed | AuditStatus::Pending | AuditStatus::Submitted => {
                    summary.failed += 1
                }
            }
            match outcome.passed() {
                Some(true) => summary.sqg_passed += 1,
                Some(false) => summary.sqg_failed += 1,
                None => {}
            }
        }
        summary
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discovered {} | classified {} | skipped {} | audited {} | failed {} | quota exceeded {} | SQG passed {} | SQG failed {}",
            self.discovered,
            self.classified,
            self.skipped,
            self.audited,
            self.failed,
            self.quota_exceeded,
            self.sqg_passed,
            self.sqg_failed
        )
    }
}

/// Everything the reports are built from
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    pub target: RepoKey,
    pub enforce: bool,
    pub summary: RunSummary,
    pub contracts: Vec<ContractOutcome>,
    pub skipped: Vec<SkippedContract>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Paths written, plus the SARIF bytes for code-scanning upload
#[derive(Debug, Clone, Default)]
pub struct EmittedReports {
    pub json_path: PathBuf,
    pub sarif: Option<(PathBuf, Vec<u8>)>,
    pub highlights_path: Option<PathBuf>,
}

pub struct ReportEmitter {
    config: ReportConfig,
    sarif: SarifExporter,
}

impl ReportEmitter {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            sarif: SarifExporter::default(),
        }
    }

    /// Check every requested path can be written, without leaving new files behind
    pub fn check_writable(&self) -> Result<(), ReportError> {
        let requested = std::iter::once(&self.config.json_path)
            .chain(self.config.sarif_path.as_ref())
            .chain(self.config.highlights_path.as_ref());
        for path in requested {
            ensure_writable(path)?;
        }
        Ok(())
    }

    /// Write the JSON report and any optional reports that were requested
    #[instrument(skip(self, run), fields(contracts = run.contracts.len()))]
    pub fn emit(&self, run: &AuditRun) -> Result<EmittedReports, ReportError> {
        let json = serde_json::to_vec_pretty(&build_json_report(run))?;
        write_report(&self.config.json_path, &json)?;
        info!(path = %self.config.json_path.display(), "Wrote JSON report");

        let mut emitted = EmittedReports {
            json_path: self.config.json_path.clone(),
            ..EmittedReports::default()
        };

        if let Some(path) = &self.config.sarif_path {
            let document = serde_json::to_vec_pretty(&self.sarif.export(run))?;
            write_report(path, &document)?;
            info!(path = %path.display(), "Wrote SARIF report");
            emitted.sarif = Some((path.clone(), document));
        }

        if let Some(path) = &self.config.highlights_path {
            let document = serde_json::to_vec_pretty(&build_highlights(run))?;
            write_report(path, &document)?;
            info!(path = %path.display(), "Wrote highlights report");
            emitted.highlights_path = Some(path.clone());
        }

        Ok(emitted)
    }
}

fn ensure_writable(path: &Path) -> Result<(), ReportError> {
    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let existed = path.exists();
    fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(write_err)?;
    if !existed {
        fs::remove_file(path).map_err(write_err)?;
    }
    Ok(())
}

fn write_report(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, contents).map_err(write_err)
}
