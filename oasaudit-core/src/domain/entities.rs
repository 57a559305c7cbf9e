//! Audit findings

use serde::{Deserialize, Serialize};

use super::value_objects::Severity;

/// Where a finding points inside a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingLocation {
    /// Contract path relative to the scanned root, forward slashes
    pub contract_path: String,
    /// RFC 6901 JSON pointer into the contract document
    pub pointer: String,
}

/// One issue reported by the audit backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub location: FindingLocation,
}
