//! SARIF v2.1.0 export
//!
//! One run per audited contract so a single file carries every contract's results,
//! including the ones that never completed (reported as failed invocations).

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use oasaudit_api::resolve_pointer_line;
use oasaudit_core::{Finding, Severity};

use super::{AuditRun, ContractOutcome, TOOL_NAME};
use crate::domain::AuditStatus;

const SARIF_SCHEMA: &str =
    "https://docs.oasis-open.org/sarif/sarif/v2.1.0/os/schemas/sarif-schema-2.1.0.json";
const SRCROOT: &str = "%SRCROOT%";

#[derive(Debug, Clone, Serialize)]
pub struct SarifReport {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub version: String,
    pub runs: Vec<SarifRun>,
}

impl Default for SarifReport {
    fn default() -> Self {
        Self {
            schema: SARIF_SCHEMA.to_string(),
            version: "2.1.0".to_string(),
            runs: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRun {
    pub tool: SarifTool,
    pub automation_details: SarifAutomationDetails,
    pub results: Vec<SarifResult>,
    pub invocations: Vec<SarifInvocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SarifTool {
    pub driver: SarifToolDriver,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifToolDriver {
    pub name: String,
    pub semantic_version: String,
    pub rules: Vec<SarifRule>,
}

/// Distinguishes runs for the same tool; one per contract
#[derive(Debug, Clone, Serialize)]
pub struct SarifAutomationDetails {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRule {
    pub id: String,
    pub short_description: SarifMessage,
    pub default_configuration: SarifDefaultConfiguration,
}

#[derive(Debug, Clone, Serialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SarifDefaultConfiguration {
    pub level: SarifLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SarifLevel {
    Note,
    Warning,
    Error,
}

impl From<&Severity> for SarifLevel {
    fn from(severity: &Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => SarifLevel::Error,
            Severity::Medium => SarifLevel::Warning,
            Severity::Low | Severity::Info => SarifLevel::Note,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: String,
    pub level: SarifLevel,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
    pub properties: SarifResultProperties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResultProperties {
    pub json_pointer: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifPhysicalLocation {
    pub artifact_location: SarifArtifactLocation,
    /// Absent when the pointer does not resolve; the location is then the whole file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<SarifRegion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifArtifactLocation {
    pub uri: String,
    pub uri_base_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRegion {
    pub start_line: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifInvocation {
    pub execution_successful: bool,
    pub tool_execution_notifications: Vec<SarifNotification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SarifNotification {
    pub level: SarifLevel,
    pub message: SarifMessage,
}

/// Builds SARIF documents from an audit run
#[derive(Debug, Clone)]
pub struct SarifExporter {
    tool_name: String,
    tool_version: String,
}

impl Default for SarifExporter {
    fn default() -> Self {
        Self {
            tool_name: TOOL_NAME.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl SarifExporter {
    #[instrument(skip(self, run), fields(contracts = run.contracts.len()))]
    pub fn export(&self, run: &AuditRun) -> SarifReport {
        let runs: Vec<SarifRun> = run.contracts.iter().map(|c| self.contract_run(c)).collect();

        debug!(
            runs = runs.len(),
            results = runs.iter().map(|r| r.results.len()).sum::<usize>(),
            "Generated SARIF report"
        );

        SarifReport {
            runs,
            ..SarifReport::default()
        }
    }

    fn contract_run(&self, outcome: &ContractOutcome) -> SarifRun {
        let job = &outcome.job;
        let findings: &[Finding] = job
            .result
            .as_ref()
            .map(|r| r.findings.as_slice())
            .unwrap_or(&[]);

        // first occurrence defines the rule
        let mut rules: BTreeMap<&str, SarifRule> = BTreeMap::new();
        for finding in findings {
            rules
                .entry(finding.rule_id.as_str())
                .or_insert_with(|| SarifRule {
                    id: finding.rule_id.clone(),
                    short_description: SarifMessage {
                        text: finding.message.clone(),
                    },
                    default_configuration: SarifDefaultConfiguration {
                        level: SarifLevel::from(&finding.severity),
                    },
                });
        }

        let results = findings
            .iter()
            .map(|finding| self.finding_to_result(outcome, finding))
            .collect();

        let notifications = match (job.status, job.note()) {
            (AuditStatus::Failed, Some(note)) => vec![SarifNotification {
                level: SarifLevel::Error,
                message: SarifMessage { text: note },
            }],
            (AuditStatus::QuotaExceeded, Some(note)) => vec![SarifNotification {
                level: SarifLevel::Warning,
                message: SarifMessage { text: note },
            }],
            _ => Vec::new(),
        };

        SarifRun {
            tool: SarifTool {
                driver: SarifToolDriver {
                    name: self.tool_name.clone(),
                    semantic_version: self.tool_version.clone(),
                    rules: rules.into_values().collect(),
                },
            },
            automation_details: SarifAutomationDetails {
                id: format!("{}/{}", self.tool_name, job.contract_path()),
            },
            results,
            invocations: vec![SarifInvocation {
                execution_successful: job.status == AuditStatus::Completed,
                tool_execution_notifications: notifications,
            }],
        }
    }

    fn finding_to_result(&self, outcome: &ContractOutcome, finding: &Finding) -> SarifResult {
        let contract = &outcome.job.contract.contract;
        let region = resolve_pointer_line(
            &contract.source.content,
            contract.format,
            &finding.location.pointer,
        )
        .map(|start_line| SarifRegion { start_line });

        SarifResult {
            rule_id: finding.rule_id.clone(),
            level: SarifLevel::from(&finding.severity),
            message: SarifMessage {
                text: finding.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifactLocation {
                        uri: contract.relative_path().replace('\\', "/"),
                        uri_base_id: SRCROOT.to_string(),
                    },
                    region,
                },
            }],
            properties: SarifResultProperties {
                json_pointer: finding.location.pointer.clone(),
                severity: finding.severity,
            },
        }
    }
}
