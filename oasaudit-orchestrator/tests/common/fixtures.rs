//! Test data fixtures for oasaudit-orchestrator

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use oasaudit_api::{ApiContract, CandidateFile, ContractFormat, EnrichmentResult, SpecVersion};
use oasaudit_core::{Finding, FindingLocation, Severity};
use oasaudit_orchestrator::{
    AuditResponse, FixedClock, QuotaLimits, QuotaState, RepoKey, RetryPolicy,
};

pub const PETSTORE_YAML: &str = r#"openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
paths:
  /pets:
    get:
      parameters:
        - name: id
          in: query
          schema:
            type: string
            format: uuid
      responses:
        '200':
          description: ok
"#;

pub const SWAGGER_JSON: &str = r#"{
  "swagger": "2.0",
  "info": { "title": "Legacy", "version": "1" },
  "paths": {}
}"#;

pub const OPENAPI_31_YAML: &str = "openapi: 3.1.0\ninfo:\n  title: New\n  version: '1'\npaths: {}\n";

pub fn target() -> RepoKey {
    RepoKey::new("acme", "acme/api")
}

/// Unenriched contract named `path`
pub fn contract(path: &str) -> EnrichmentResult {
    let source = Arc::new(CandidateFile {
        path: PathBuf::from(path),
        relative_path: path.to_string(),
        format: ContractFormat::Yaml,
        content: PETSTORE_YAML.to_string(),
    });
    EnrichmentResult::untouched(ApiContract {
        source,
        version: SpecVersion::OpenApi30("3.0.3".into()),
        format: ContractFormat::Yaml,
        document: serde_json::json!({"openapi": "3.0.3", "info": {}, "paths": {}}),
    })
}

/// `c01.yaml` .. `cNN.yaml`, in dispatch order
pub fn contracts(count: usize) -> Vec<EnrichmentResult> {
    (1..=count).map(|i| contract(&contract_name(i))).collect()
}

pub fn contract_name(index: usize) -> String {
    format!("c{:02}.yaml", index)
}

pub fn finding(path: &str, severity: Severity) -> Finding {
    Finding {
        rule_id: format!("{}-rule", severity),
        severity,
        message: format!("{} issue", severity),
        location: FindingLocation {
            contract_path: path.to_string(),
            pointer: "/paths/~1pets/get".to_string(),
        },
    }
}

pub fn clean_response() -> AuditResponse {
    AuditResponse {
        findings: Vec::new(),
        score: Some(95.0),
        quota: None,
    }
}

pub fn response_with(findings: Vec<Finding>) -> AuditResponse {
    AuditResponse {
        findings,
        score: Some(60.0),
        quota: None,
    }
}

/// Retries without real waiting
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    }
}

pub fn quota_state() -> Arc<QuotaState> {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap(),
    ));
    Arc::new(QuotaState::new(QuotaLimits::default(), clock))
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
