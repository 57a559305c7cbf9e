//! Audit job entity

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use oasaudit_api::EnrichmentResult;
use oasaudit_core::{Finding, SeverityBreakdown};

use super::value_objects::{AuditErrorKind, AuditStatus, AuditTransitionError};

/// Findings and gate inputs returned for one contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditResult {
    pub findings: Vec<Finding>,
    /// Backend audit score, 0-100
    pub score: Option<f64>,
}

impl AuditResult {
    pub fn severity_breakdown(&self) -> SeverityBreakdown {
        SeverityBreakdown::from_severities(self.findings.iter().map(|f| &f.severity))
    }
}

/// Recorded reason for a Failed or QuotaExceeded job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFailure {
    pub kind: AuditErrorKind,
    pub message: String,
}

/// One audit of one contract. Created and mutated by the dispatcher only.
#[derive(Debug, Clone)]
pub struct AuditJob {
    pub id: Uuid,
    pub contract: Arc<EnrichmentResult>,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub result: Option<AuditResult>,
    pub failure: Option<AuditFailure>,
}

impl AuditJob {
    pub fn new(contract: Arc<EnrichmentResult>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract,
            status: AuditStatus::Pending,
            created_at: Utc::now(),
            submitted_at: None,
            finished_at: None,
            attempts: 0,
            result: None,
            failure: None,
        }
    }

    pub fn contract_path(&self) -> &str {
        self.contract.contract.relative_path()
    }

    /// Explanation shown for jobs without findings
    pub fn note(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|failure| format!("{}: {}", failure.kind, failure.message))
    }

    pub(crate) fn mark_submitted(&mut self) -> Result<(), AuditTransitionError> {
        self.transition_to(AuditStatus::Submitted)?;
        self.submitted_at = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn complete(
        &mut self,
        result: AuditResult,
        attempts: u32,
    ) -> Result<(), AuditTransitionError> {
        self.transition_to(AuditStatus::Completed)?;
        self.attempts = attempts;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn fail(
        &mut self,
        kind: AuditErrorKind,
        message: impl Into<String>,
        attempts: u32,
    ) -> Result<(), AuditTransitionError> {
        let target = if kind == AuditErrorKind::QuotaExceeded {
            AuditStatus::QuotaExceeded
        } else {
            AuditStatus::Failed
        };
        self.transition_to(target)?;
        self.attempts = attempts;
        self.failure = Some(AuditFailure {
            kind,
            message: message.into(),
        });
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn transition_to(&mut self, target: AuditStatus) -> Result<(), AuditTransitionError> {
        if !self.status.can_transition_to(&target) {
            return Err(AuditTransitionError {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}
