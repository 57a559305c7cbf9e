//! Machine-readable JSON report

use chrono::{DateTime, Utc};
use serde::Serialize;

use oasaudit_api::{InjectedConstraint, SkippedContract};
use oasaudit_core::Finding;

use super::{AuditRun, ContractOutcome, RunSummary, TOOL_NAME};
use crate::application::gate::SqgVerdict;
use crate::domain::AuditStatus;

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub organization: &'a str,
    pub repository: &'a str,
    pub enforce: bool,
    pub summary: RunSummary,
    pub contracts: Vec<ContractEntry<'a>>,
    pub skipped: &'a [SkippedContract],
}

#[derive(Debug, Serialize)]
pub struct ContractEntry<'a> {
    pub path: &'a str,
    pub spec_version: String,
    pub status: AuditStatus,
    pub attempts: u32,
    /// Why there are no findings, for jobs that did not complete
    pub note: Option<String>,
    pub score: Option<f64>,
    pub findings: &'a [Finding],
    pub verdict: Option<&'a SqgVerdict>,
    pub enrichment: &'a [InjectedConstraint],
}

impl<'a> From<&'a ContractOutcome> for ContractEntry<'a> {
    fn from(outcome: &'a ContractOutcome) -> Self {
        let job = &outcome.job;
        Self {
            path: job.contract_path(),
            spec_version: job.contract.contract.version.to_string(),
            status: job.status,
            attempts: job.attempts,
            note: job.note(),
            score: job.result.as_ref().and_then(|r| r.score),
            findings: job
                .result
                .as_ref()
                .map(|r| r.findings.as_slice())
                .unwrap_or(&[]),
            verdict: outcome.verdict.as_ref(),
            enrichment: &job.contract.injected,
        }
    }
}

pub fn build_json_report(run: &AuditRun) -> JsonReport<'_> {
    JsonReport {
        tool: TOOL_NAME,
        version: env!("CARGO_PKG_VERSION"),
        generated_at: run.generated_at,
        organization: &run.target.organization,
        repository: &run.target.repository,
        enforce: run.enforce,
        summary: run.summary,
        contracts: run.contracts.iter().map(ContractEntry::from).collect(),
        skipped: &run.skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use insta::assert_json_snapshot;
    use oasaudit_core::Severity;

    #[test]
    fn completed_contract_entry_shape() {
        let run = run(vec![completed(
            "specs/pets.yaml",
            vec![finding(
                "specs/pets.yaml",
                "missing-auth",
                Severity::High,
                "/paths/~1pets/get",
            )],
        )]);
        let report = build_json_report(&run);

        assert_json_snapshot!(report.contracts[0], @r#"
        {
          "path": "specs/pets.yaml",
          "spec_version": "3.0.3",
          "status": "completed",
          "attempts": 1,
          "note": null,
          "score": 72.5,
          "findings": [
            {
              "rule_id": "missing-auth",
              "severity": "high",
              "message": "missing-auth triggered",
              "location": {
                "contract_path": "specs/pets.yaml",
                "pointer": "/paths/~1pets/get"
              }
            }
          ],
          "verdict": {
            "passed": false,
            "violations": [
              {
                "criterion": "max_count",
                "message": "1 high findings, at most 0 allowed"
              }
            ]
          },
          "enrichment": []
        }
        "#);
    }

    #[test]
    fn quota_exceeded_entry_has_note_and_no_findings() {
        let run = run(vec![quota_exceeded("c.yaml")]);
        let value = serde_json::to_value(build_json_report(&run)).unwrap();

        let entry = &value["contracts"][0];
        assert_eq!(entry["status"], "quota_exceeded");
        assert_eq!(entry["note"], "quota-exceeded: monthly audit cap reached");
        assert_eq!(entry["findings"], serde_json::json!([]));
        assert!(entry["verdict"].is_null());
        assert_eq!(value["tool"], "oasaudit");
        assert_eq!(value["generated_at"], "2026-03-10T12:00:00Z");
        assert_eq!(value["summary"]["quota_exceeded"], 1);
    }
}
