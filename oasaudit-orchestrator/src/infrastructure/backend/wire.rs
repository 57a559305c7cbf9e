//! Versioned backend response schema

use serde::Deserialize;
use std::time::Duration;

use oasaudit_core::{Finding, FindingLocation, Severity};

use super::{AuditResponse, BackendError, QuotaSnapshot};

/// Response schema version understood by this client
pub const SCHEMA_VERSION: u32 = 1;

/// A decoded backend reply, tagged by `status`
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    Completed(AuditResponse),
    Rejected(BackendError),
}

impl BackendReply {
    /// Decode a response body. Finding locations are attributed to `contract_path`.
    pub fn decode(body: &[u8], contract_path: &str) -> Result<Self, BackendError> {
        let reply: WireReply =
            serde_json::from_slice(body).map_err(|e| BackendError::InvalidResponse {
                message: format!("undecodable response body: {}", e),
            })?;

        match reply {
            WireReply::Completed {
                schema_version,
                findings,
                sqg,
                quota,
            } => {
                check_version(schema_version)?;
                let findings = findings
                    .into_iter()
                    .map(|f| f.into_finding(contract_path))
                    .collect();
                Ok(Self::Completed(AuditResponse {
                    findings,
                    score: sqg.and_then(|s| s.score),
                    quota,
                }))
            }
            WireReply::Error {
                schema_version,
                error,
            } => {
                check_version(schema_version)?;
                Ok(Self::Rejected(error.into_backend_error()))
            }
        }
    }

    pub fn into_result(self) -> Result<AuditResponse, BackendError> {
        match self {
            Self::Completed(response) => Ok(response),
            Self::Rejected(error) => Err(error),
        }
    }
}

fn check_version(version: u32) -> Result<(), BackendError> {
    if version == SCHEMA_VERSION {
        Ok(())
    } else {
        Err(BackendError::InvalidResponse {
            message: format!(
                "unsupported response schema version {} (expected {})",
                version, SCHEMA_VERSION
            ),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum WireReply {
    Completed {
        schema_version: u32,
        #[serde(default)]
        findings: Vec<WireFinding>,
        #[serde(default)]
        sqg: Option<WireSqg>,
        #[serde(default)]
        quota: Option<QuotaSnapshot>,
    },
    Error {
        schema_version: u32,
        error: WireError,
    },
}

#[derive(Debug, Deserialize)]
struct WireFinding {
    #[serde(alias = "ruleId")]
    rule_id: String,
    severity: Severity,
    message: String,
    #[serde(default)]
    pointer: String,
}

impl WireFinding {
    fn into_finding(self, contract_path: &str) -> Finding {
        Finding {
            rule_id: self.rule_id,
            severity: self.severity,
            message: self.message,
            location: FindingLocation {
                contract_path: contract_path.to_string(),
                pointer: self.pointer,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireSqg {
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum WireErrorKind {
    RateLimited,
    QuotaExceeded,
    InvalidContract,
    InternalError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    kind: WireErrorKind,
    #[serde(default)]
    message: String,
    #[serde(default)]
    retry_after_seconds: Option<u64>,
}

impl WireError {
    fn into_backend_error(self) -> BackendError {
        let message = self.message;
        match self.kind {
            WireErrorKind::RateLimited => BackendError::RateLimited {
                message,
                retry_after: self.retry_after_seconds.map(Duration::from_secs),
            },
            WireErrorKind::QuotaExceeded => BackendError::QuotaExceeded { message },
            WireErrorKind::InvalidContract => BackendError::InvalidContract { message },
            WireErrorKind::InternalError => BackendError::Internal { message },
        }
    }
}
