//! Audit value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Created, not yet sent
    Pending,
    /// Sent to the backend
    Submitted,
    /// Backend returned findings
    Completed,
    /// Gave up: permanent error, retries exhausted or cancelled
    Failed,
    /// Refused by the local quota or by the backend
    QuotaExceeded,
}

impl AuditStatus {
    /// Returns the set of valid target states from the current state.
    ///
    /// ```text
    /// Pending ──► Submitted ──► Completed
    ///   │            │
    ///   ├────────────┴──► Failed
    ///   └────────────┴──► QuotaExceeded
    /// ```
    pub fn valid_transitions(&self) -> &[AuditStatus] {
        match self {
            Self::Pending => &[Self::Submitted, Self::Failed, Self::QuotaExceeded],
            Self::Submitted => &[Self::Completed, Self::Failed, Self::QuotaExceeded],
            Self::Completed | Self::Failed | Self::QuotaExceeded => &[],
        }
    }

    pub fn can_transition_to(&self, target: &AuditStatus) -> bool {
        self.valid_transitions().contains(target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::QuotaExceeded)
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Submitted => write!(f, "Submitted"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::QuotaExceeded => write!(f, "QuotaExceeded"),
        }
    }
}

/// Error returned when an invalid status transition is attempted.
#[derive(Debug, thiserror::Error)]
#[error("Invalid audit transition from {from} to {to}")]
pub struct AuditTransitionError {
    pub from: AuditStatus,
    pub to: AuditStatus,
}

/// Why an audit did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditErrorKind {
    RateLimited,
    QuotaExceeded,
    InvalidContract,
    InternalError,
    Network,
    Timeout,
    Authentication,
    InvalidResponse,
    Cancelled,
}

impl fmt::Display for AuditErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate-limited",
            Self::QuotaExceeded => "quota-exceeded",
            Self::InvalidContract => "invalid-contract",
            Self::InternalError => "internal-error",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::InvalidResponse => "invalid-response",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Organization and repository an audit is billed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoKey {
    pub organization: String,
    pub repository: String,
}

impl RepoKey {
    pub fn new(organization: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            repository: repository.into(),
        }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.organization, self.repository)
    }
}
