//! Contract entities

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::sync::Arc;

use super::value_objects::{ConstraintKind, ContractFormat, SpecVersion};

/// A `.json`/`.yaml`/`.yml` file found under the scanned root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Location on disk
    pub path: PathBuf,
    /// Path relative to the scanned root, forward slashes
    pub relative_path: String,
    /// Format implied by the extension
    pub format: ContractFormat,
    pub content: String,
}

impl CandidateFile {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// A document that passed OpenAPI 2.0 / 3.0.x classification
#[derive(Debug, Clone)]
pub struct ApiContract {
    pub source: Arc<CandidateFile>,
    pub version: SpecVersion,
    /// Format the document was actually parsed as
    pub format: ContractFormat,
    pub document: JsonValue,
}

impl ApiContract {
    pub fn relative_path(&self) -> &str {
        &self.source.relative_path
    }

    pub fn title(&self) -> Option<&str> {
        self.document
            .pointer("/info/title")
            .and_then(JsonValue::as_str)
    }
}

/// One constraint added by the enricher
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectedConstraint {
    /// JSON pointer of the schema node that received the constraint
    pub pointer: String,
    pub format: String,
    pub constraint: ConstraintKind,
    pub value: JsonValue,
}

/// Contract after enrichment, with a record of every change
#[derive(Debug, Clone)]
pub struct EnrichmentResult {
    pub contract: ApiContract,
    pub injected: Vec<InjectedConstraint>,
}

impl EnrichmentResult {
    /// Result for a contract that was not enriched
    pub fn untouched(contract: ApiContract) -> Self {
        Self {
            contract,
            injected: Vec::new(),
        }
    }
}

/// Why a recognised-but-unaudited file was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Version discriminator present but outside 2.0 / 3.0.x
    UnsupportedVersion { version: String },
    /// Supported version but a required top-level object is missing
    Incomplete { missing: Vec<String> },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnsupportedVersion { version } => {
                write!(f, "unsupported version {}", version)
            }
            SkipReason::Incomplete { missing } => {
                write!(f, "missing required field(s): {}", missing.join(", "))
            }
        }
    }
}

/// A file reported to the user but not audited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedContract {
    pub path: String,
    pub reason: SkipReason,
}

/// Result of classifying one candidate
#[derive(Debug, Clone)]
pub enum ClassificationOutcome {
    Contract(ApiContract),
    Skipped(SkippedContract),
    /// Not an OpenAPI document; dropped silently
    NotAContract,
}
