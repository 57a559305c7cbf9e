//! Audit Dispatcher - bounded worker pool over the backend
//!
//! Quota is reserved in contract order before a worker is spawned, so with a cap of N the
//! first N contracts are the ones submitted. Workers apply their own quota side effects
//! (observe / mark_exhausted) before releasing their permit.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use oasaudit_api::EnrichmentResult;

use crate::domain::{AuditErrorKind, AuditJob, AuditResult, AuditStatus, RepoKey};
use crate::infrastructure::backend::{AuditBackend, AuditRequest, AuditResponse, BackendError};
use crate::infrastructure::quota::QuotaState;
use crate::infrastructure::resilience::{RetryOutcome, RetryPolicy, retry_with_policy};

/// Jobs in input order, plus the authentication failure that stopped the run, if any
#[derive(Debug)]
pub struct DispatchOutcome {
    pub jobs: Vec<AuditJob>,
    pub auth_failure: Option<BackendError>,
}

impl DispatchOutcome {
    pub fn count(&self, status: AuditStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }
}

struct WorkerReport {
    index: usize,
    outcome: WorkerOutcome,
}

enum WorkerOutcome {
    Finished(RetryOutcome<AuditResponse>),
    Cancelled,
}

pub struct AuditDispatcher {
    backend: Arc<dyn AuditBackend>,
    quota: Arc<QuotaState>,
    policy: RetryPolicy,
    concurrency: usize,
}

impl AuditDispatcher {
    pub fn new(
        backend: Arc<dyn AuditBackend>,
        quota: Arc<QuotaState>,
        policy: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            backend,
            quota,
            policy,
            concurrency: concurrency.max(1),
        }
    }

    /// Audit every contract, isolating failures per contract.
    ///
    /// Cancelling `cancel` stops new submissions and abandons in-flight ones, which end
    /// up `Failed(cancelled)`. Results already received are kept.
    #[instrument(skip_all, fields(target = %target, contracts = contracts.len(), concurrency = self.concurrency))]
    pub async fn dispatch(
        &self,
        contracts: Vec<EnrichmentResult>,
        target: &RepoKey,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let mut jobs: Vec<AuditJob> = contracts
            .into_iter()
            .map(|contract| AuditJob::new(Arc::new(contract)))
            .collect();
        let mut auth_failure = None;

        // cancelled on external cancellation or on the first authentication failure
        let abort = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers: JoinSet<WorkerReport> = JoinSet::new();

        for index in 0..jobs.len() {
            let permit = tokio::select! {
                biased;
                _ = abort.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };

            while let Some(joined) = workers.try_join_next() {
                record(&mut jobs, joined, &mut auth_failure);
            }

            let Some(permit) = permit else {
                break;
            };
            if abort.is_cancelled() {
                break;
            }

            let job = &mut jobs[index];
            match self.quota.try_reserve(target).await {
                Ok(reservation) => {
                    debug!(
                        contract = %job.contract_path(),
                        used = reservation.used,
                        remaining = reservation.remaining,
                        "Reserved audit quota"
                    );
                }
                Err(denial) => {
                    warn!(contract = %job.contract_path(), reason = %denial, "Audit quota exhausted");
                    if let Err(e) = job.fail(AuditErrorKind::QuotaExceeded, denial.to_string(), 0) {
                        error!(error = %e, "Unexpected audit transition");
                    }
                    continue;
                }
            }

            if let Err(e) = job.mark_submitted() {
                error!(error = %e, "Unexpected audit transition");
                continue;
            }

            let request = AuditRequest::new(&job.contract, target);
            let backend = Arc::clone(&self.backend);
            let quota = Arc::clone(&self.quota);
            let policy = self.policy.clone();
            let abort = abort.clone();
            let target = target.clone();

            workers.spawn(async move {
                let _permit = permit;
                let backend = &backend;
                let request = &request;

                let outcome = tokio::select! {
                    biased;
                    _ = abort.cancelled() => WorkerOutcome::Cancelled,
                    outcome = retry_with_policy(&policy, move |_| backend.submit(request)) => {
                        WorkerOutcome::Finished(outcome)
                    }
                };

                if let WorkerOutcome::Finished(finished) = &outcome {
                    match &finished.result {
                        Ok(response) => {
                            if let Some(snapshot) = &response.quota {
                                quota.observe(&target, snapshot).await;
                            }
                        }
                        Err(BackendError::QuotaExceeded { .. }) => {
                            quota.mark_exhausted(&target).await;
                        }
                        Err(BackendError::Authentication { .. }) => abort.cancel(),
                        Err(_) => {}
                    }
                }

                WorkerReport { index, outcome }
            });
        }

        while let Some(joined) = workers.join_next().await {
            record(&mut jobs, joined, &mut auth_failure);
        }

        for job in jobs.iter_mut().filter(|job| !job.status.is_terminal()) {
            let (kind, message) = match job.status {
                AuditStatus::Submitted => (AuditErrorKind::InternalError, "audit worker panicked"),
                _ if auth_failure.is_some() => {
                    (AuditErrorKind::Cancelled, "not submitted after authentication failure")
                }
                _ => (AuditErrorKind::Cancelled, "cancelled"),
            };
            let attempts = job.attempts;
            if let Err(e) = job.fail(kind, message, attempts) {
                error!(error = %e, "Unexpected audit transition");
            }
        }

        DispatchOutcome { jobs, auth_failure }
    }
}

fn record(
    jobs: &mut [AuditJob],
    joined: Result<WorkerReport, JoinError>,
    auth_failure: &mut Option<BackendError>,
) {
    let report = match joined {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Audit worker panicked");
            return;
        }
    };

    let Some(job) = jobs.get_mut(report.index) else {
        return;
    };

    let transition = match report.outcome {
        WorkerOutcome::Cancelled => {
            let attempts = job.attempts;
            job.fail(AuditErrorKind::Cancelled, "cancelled", attempts)
        }
        WorkerOutcome::Finished(RetryOutcome {
            result: Ok(response),
            attempts,
        }) => job.complete(
            AuditResult {
                findings: response.findings,
                score: response.score,
            },
            attempts,
        ),
        WorkerOutcome::Finished(RetryOutcome {
            result: Err(e),
            attempts,
        }) => {
            if matches!(e, BackendError::Authentication { .. }) && auth_failure.is_none() {
                *auth_failure = Some(e.clone());
            }
            job.fail(e.kind(), e.to_string(), attempts)
        }
    };

    match transition {
        Ok(()) => info!(
            contract = %job.contract_path(),
            status = %job.status,
            attempts = job.attempts,
            "Audit finished"
        ),
        Err(e) => error!(error = %e, "Unexpected audit transition"),
    }
}
