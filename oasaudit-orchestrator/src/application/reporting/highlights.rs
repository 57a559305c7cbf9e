//! PDF-ready highlights: the numbers a one-page summary needs, nothing else

use chrono::{DateTime, Utc};
use serde::Serialize;

use oasaudit_core::SeverityBreakdown;

use super::AuditRun;
use crate::domain::AuditStatus;

#[derive(Debug, Clone, Serialize)]
pub struct Highlights {
    pub generated_at: DateTime<Utc>,
    pub totals_by_severity: SeverityBreakdown,
    pub passed: usize,
    pub failed: usize,
    /// Contracts without a completed audit
    pub not_evaluated: usize,
    pub contracts: Vec<ContractHighlight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractHighlight {
    pub path: String,
    pub status: AuditStatus,
    pub counts_by_severity: SeverityBreakdown,
    pub passed: Option<bool>,
}

pub fn build_highlights(run: &AuditRun) -> Highlights {
    let mut totals = SeverityBreakdown::default();
    let mut contracts = Vec::with_capacity(run.contracts.len());

    for outcome in &run.contracts {
        let counts = outcome
            .job
            .result
            .as_ref()
            .map(|r| r.severity_breakdown())
            .unwrap_or_default();
        totals.merge(&counts);
        contracts.push(ContractHighlight {
            path: outcome.job.contract_path().to_string(),
            status: outcome.job.status,
            counts_by_severity: counts,
            passed: outcome.passed(),
        });
    }

    let passed = contracts.iter().filter(|c| c.passed == Some(true)).count();
    let failed = contracts.iter().filter(|c| c.passed == Some(false)).count();

    Highlights {
        generated_at: run.generated_at,
        totals_by_severity: totals,
        passed,
        failed,
        not_evaluated: contracts.len() - passed - failed,
        contracts,
    }
}
