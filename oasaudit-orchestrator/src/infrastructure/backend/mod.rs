//! Remote audit backend boundary
//!
//! Everything the backend says is decoded once, in [`wire`], into either an
//! [`AuditResponse`] or a typed [`BackendError`]. Nothing past this module sees raw JSON.

pub mod http;
pub mod wire;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

use oasaudit_api::{EnrichmentResult, InjectedConstraint};
use oasaudit_core::Finding;

use crate::domain::{AuditErrorKind, RepoKey};

pub use http::HttpAuditBackend;
pub use wire::{BackendReply, SCHEMA_VERSION};

/// Audit submission payload
#[derive(Debug, Clone, Serialize)]
pub struct AuditRequest {
    pub schema_version: u32,
    pub contract_path: String,
    pub spec_version: String,
    pub contract: JsonValue,
    pub enrichment: Vec<InjectedConstraint>,
    pub repository: String,
    pub organization: String,
}

impl AuditRequest {
    pub fn new(enriched: &EnrichmentResult, target: &RepoKey) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            contract_path: enriched.contract.relative_path().to_string(),
            spec_version: enriched.contract.version.to_string(),
            contract: enriched.contract.document.clone(),
            enrichment: enriched.injected.clone(),
            repository: target.repository.clone(),
            organization: target.organization.clone(),
        }
    }
}

/// Backend's view of the repository's monthly usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct QuotaSnapshot {
    pub used: u32,
    pub limit: Option<u32>,
}

/// Successful audit
#[derive(Debug, Clone, PartialEq)]
pub struct AuditResponse {
    pub findings: Vec<Finding>,
    pub score: Option<f64>,
    pub quota: Option<QuotaSnapshot>,
}

/// Backend failure, one variant per error kind
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Rate limited by audit backend: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Audit quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Contract rejected by audit backend: {message}")]
    InvalidContract { message: String },

    #[error("Audit backend internal error: {message}")]
    Internal { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request to audit backend timed out")]
    Timeout,

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Invalid response from audit backend: {message}")]
    InvalidResponse { message: String },
}

impl BackendError {
    pub fn kind(&self) -> AuditErrorKind {
        match self {
            Self::RateLimited { .. } => AuditErrorKind::RateLimited,
            Self::QuotaExceeded { .. } => AuditErrorKind::QuotaExceeded,
            Self::InvalidContract { .. } => AuditErrorKind::InvalidContract,
            Self::Internal { .. } => AuditErrorKind::InternalError,
            Self::Network { .. } => AuditErrorKind::Network,
            Self::Timeout => AuditErrorKind::Timeout,
            Self::Authentication { .. } => AuditErrorKind::Authentication,
            Self::InvalidResponse { .. } => AuditErrorKind::InvalidResponse,
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Internal { .. } | Self::Network { .. } | Self::Timeout
        )
    }

    /// Server-suggested wait before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Something that can audit a contract
#[async_trait]
pub trait AuditBackend: Send + Sync {
    async fn submit(&self, request: &AuditRequest) -> Result<AuditResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_retry() {
        assert!(BackendError::Timeout.is_retryable());
        assert!(
            BackendError::Internal {
                message: "502".into()
            }
            .is_retryable()
        );
        assert!(!BackendError::auth("bad token").is_retryable());
        assert!(
            !BackendError::QuotaExceeded {
                message: "cap".into()
            }
            .is_retryable()
        );
        assert!(
            !BackendError::InvalidContract {
                message: "bad".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        let limited = BackendError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(BackendError::Timeout.retry_after(), None);
    }
}
