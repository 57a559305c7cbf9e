//! Orchestrator - sequences discovery, enrichment, dispatch, gating and reporting
//!
//! This is the only place that decides whether an error is fatal. Lower layers hand back
//! typed outcomes; per-contract problems end up on the contract's job and never abort the run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use oasaudit_api::{
    ContractClassifier, ContractDiscoverer, ContractEnricher, DiscoverContractsUseCase,
    DiscoveryError, DiscoveryOptions, EnrichContractsUseCase,
};
use oasaudit_api::infrastructure::data_dictionary::DataDictionary;
use oasaudit_core::Config;

use super::dispatcher::AuditDispatcher;
use super::gate::GateCriteria;
use super::reporting::{AuditRun, ContractOutcome, EmittedReports, ReportEmitter, ReportError, RunSummary};
use crate::domain::{AuditStatus, RepoKey};
use crate::infrastructure::backend::{AuditBackend, BackendError, HttpAuditBackend};
use crate::infrastructure::code_scanning::{CodeScanningUploader, UploadError};
use crate::infrastructure::quota::{QuotaLimits, QuotaState, SystemClock};
use crate::infrastructure::resilience::RetryPolicy;

/// Organization key used when none is configured
pub const LOCAL_ORGANIZATION: &str = "local";

/// Fatal run errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Audit backend rejected the credentials: {0}")]
    Authentication(BackendError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Final status of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// SQG failed with enforcement on
    GateFailed,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run: AuditRun,
    pub reports: EmittedReports,
    pub status: RunStatus,
    pub cancelled: bool,
}

pub struct AuditPipeline {
    config: Config,
    backend: Arc<dyn AuditBackend>,
    quota: Arc<QuotaState>,
}

impl AuditPipeline {
    pub fn new(config: Config, backend: Arc<dyn AuditBackend>, quota: Arc<QuotaState>) -> Self {
        Self {
            config,
            backend,
            quota,
        }
    }

    /// HTTP backend and system-clock quota cache, loaded from `quota.cache_path` when set
    pub fn from_config(config: Config) -> Result<Self, PipelineError> {
        let backend =
            HttpAuditBackend::from_config(&config.backend).map_err(PipelineError::Authentication)?;
        let quota = load_quota(&config);
        Ok(Self::new(config, Arc::new(backend), Arc::new(quota)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[instrument(skip(self, cancel), fields(root = %root.display()))]
    pub async fn run(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        debug!(config = ?self.config.redacted(), "Effective configuration");
        preflight(&self.config, root)?;

        let discovery = DiscoverContractsUseCase::new(
            ContractDiscoverer::new(DiscoveryOptions::from(&self.config.discovery))?,
            ContractClassifier::new(),
        )
        .execute(root)?;

        for skipped in &discovery.skipped {
            warn!(file = %skipped.path, reason = %skipped.reason, "Skipping contract");
        }

        let enricher = ContractEnricher::new(
            DataDictionary::builtin(),
            self.config.enrichment.enabled,
        );
        let contracts = discovery.contracts;
        let enriched = tokio::task::spawn_blocking(move || {
            EnrichContractsUseCase::new(enricher).execute(contracts)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("enrichment task failed: {}", e)))?;

        let target = resolve_target(&self.config, root);
        let run_token = cancel.child_token();
        let timer = self.config.dispatch.run_timeout_seconds.map(|secs| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                warn!(timeout_seconds = secs, "Run timeout reached, cancelling audits");
                token.cancel();
            })
        });

        let dispatcher = AuditDispatcher::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.quota),
            RetryPolicy::from(&self.config.dispatch.retry),
            self.config.dispatch.concurrency,
        );
        let dispatched = dispatcher.dispatch(enriched, &target, &run_token).await;
        if let Some(timer) = timer {
            timer.abort();
        }
        let cancelled = run_token.is_cancelled();

        self.persist_quota().await;

        if let Some(error) = dispatched.auth_failure {
            return Err(PipelineError::Authentication(error));
        }

        let criteria = GateCriteria::from(&self.config.gate);
        let contracts: Vec<ContractOutcome> = dispatched
            .jobs
            .into_iter()
            .map(|job| {
                let verdict = match (&job.status, &job.result) {
                    (AuditStatus::Completed, Some(result)) => Some(criteria.evaluate(result)),
                    _ => None,
                };
                ContractOutcome { job, verdict }
            })
            .collect();

        let summary = RunSummary::tally(discovery.discovered, discovery.skipped.len(), &contracts);
        info!(
            discovered = summary.discovered,
            classified = summary.classified,
            skipped = summary.skipped,
            audited = summary.audited,
            failed = summary.failed,
            quota_exceeded = summary.quota_exceeded,
            sqg_passed = summary.sqg_passed,
            sqg_failed = summary.sqg_failed,
            cancelled,
            "Audit run summary"
        );

        let run = AuditRun {
            generated_at: Utc::now(),
            root: root.to_path_buf(),
            target,
            enforce: self.config.gate.enforce,
            summary,
            contracts,
            skipped: discovery.skipped,
        };

        let reports = ReportEmitter::new(self.config.report.clone()).emit(&run)?;
        self.upload(&reports, root).await?;

        let status = if self.config.gate.enforce && summary.sqg_failed > 0 {
            RunStatus::GateFailed
        } else {
            if summary.sqg_failed > 0 {
                info!(failed = summary.sqg_failed, "SQG failed but enforcement is off");
            }
            RunStatus::Success
        };

        Ok(RunOutcome {
            run,
            reports,
            status,
            cancelled,
        })
    }

    async fn upload(&self, reports: &EmittedReports, root: &Path) -> Result<(), PipelineError> {
        if !self.config.github.upload_to_code_scanning {
            return Ok(());
        }
        let Some((_, sarif)) = &reports.sarif else {
            warn!("Code-scanning upload requested but no SARIF report was written");
            return Ok(());
        };

        CodeScanningUploader::from_config(&self.config.github, &self.config.backend.user_agent)?
            .upload(sarif, root)
            .await?;
        Ok(())
    }

    async fn persist_quota(&self) {
        let Some(path) = &self.config.quota.cache_path else {
            return;
        };
        if let Err(e) = self.quota.save(path).await {
            warn!(path = %path.display(), error = %e, "Failed to persist quota cache");
        }
    }
}

/// Fail fast on a missing root or an unwritable report path, before any quota is spent
pub fn preflight(config: &Config, root: &Path) -> Result<(), PipelineError> {
    if !root.exists() {
        return Err(DiscoveryError::RootNotFound(root.to_path_buf()).into());
    }
    ReportEmitter::new(config.report.clone()).check_writable()?;
    Ok(())
}

/// Quota cache for `config`, read from disk when a cache path is configured
pub fn load_quota(config: &Config) -> QuotaState {
    let limits = QuotaLimits::from(&config.quota);
    let clock = Arc::new(SystemClock);
    match &config.quota.cache_path {
        Some(path) => QuotaState::load(path, limits, clock),
        None => QuotaState::new(limits, clock),
    }
}

/// Quota key: configured repository or the root directory's name, and the organization or `local`
pub fn resolve_target(config: &Config, root: &Path) -> RepoKey {
    let repository = config.github.repository.clone().unwrap_or_else(|| {
        std::path::absolute(root)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| root.display().to_string())
    });
    let organization = config
        .github
        .effective_organization()
        .unwrap_or_else(|| LOCAL_ORGANIZATION.to_string());
    RepoKey::new(organization, repository)
}
