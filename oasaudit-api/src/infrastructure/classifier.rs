//! OpenAPI 2.0 / 3.0.x classification

use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::{
    ApiContract, CandidateFile, ClassificationOutcome, ContractFormat, SkipReason,
    SkippedContract, SpecVersion,
};

/// Parse failure; never surfaced beyond debug logs since most json/yaml files are not contracts
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error in {file}: {message}")]
    Json { file: String, message: String },

    #[error("YAML parse error in {file}: {message}")]
    Yaml { file: String, message: String },
}

/// What the version discriminator says about a document
#[derive(Debug, PartialEq)]
enum VersionMarker {
    Supported(SpecVersion),
    Unsupported(String),
    Absent,
}

/// Decides whether a candidate is an auditable contract
#[derive(Debug, Default, Clone, Copy)]
pub struct ContractClassifier;

impl ContractClassifier {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, candidate), fields(file = %candidate.relative_path))]
    pub fn classify(&self, candidate: Arc<CandidateFile>) -> ClassificationOutcome {
        let (document, format) = match parse_document(&candidate) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Not a contract: unparseable");
                return ClassificationOutcome::NotAContract;
            }
        };

        let Some(object) = document.as_object() else {
            debug!("Not a contract: top level is not a mapping");
            return ClassificationOutcome::NotAContract;
        };

        let version = match detect_version(object) {
            VersionMarker::Supported(version) => version,
            VersionMarker::Unsupported(version) => {
                info!(version = %version, "Contract uses an unsupported OpenAPI version");
                return ClassificationOutcome::Skipped(SkippedContract {
                    path: candidate.relative_path.clone(),
                    reason: SkipReason::UnsupportedVersion { version },
                });
            }
            VersionMarker::Absent => {
                debug!("Not a contract: no swagger/openapi field");
                return ClassificationOutcome::NotAContract;
            }
        };

        let missing: Vec<String> = ["info", "paths"]
            .into_iter()
            .filter(|field| !object.get(*field).is_some_and(JsonValue::is_object))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            info!(missing = ?missing, "Contract is missing required fields");
            return ClassificationOutcome::Skipped(SkippedContract {
                path: candidate.relative_path.clone(),
                reason: SkipReason::Incomplete { missing },
            });
        }

        debug!(version = %version, format = ?format, "Classified API contract");
        ClassificationOutcome::Contract(ApiContract {
            source: candidate,
            version,
            format,
            document,
        })
    }
}

/// Parse by extension, falling back to content sniffing when the two disagree
fn parse_document(candidate: &CandidateFile) -> Result<(JsonValue, ContractFormat), ParseError> {
    let sniffed = ContractFormat::sniff(&candidate.content);
    match (candidate.format, sniffed) {
        (ContractFormat::Json, ContractFormat::Json) => {
            parse_json(candidate).map(|doc| (doc, ContractFormat::Json))
        }
        (ContractFormat::Yaml, ContractFormat::Json) => match parse_json(candidate) {
            Ok(doc) => Ok((doc, ContractFormat::Json)),
            Err(_) => parse_yaml(candidate).map(|doc| (doc, ContractFormat::Yaml)),
        },
        (_, ContractFormat::Yaml) => parse_yaml(candidate).map(|doc| (doc, ContractFormat::Yaml)),
    }
}

fn parse_json(candidate: &CandidateFile) -> Result<JsonValue, ParseError> {
    serde_json::from_str(&candidate.content).map_err(|e| ParseError::Json {
        file: candidate.relative_path.clone(),
        message: e.to_string(),
    })
}

fn parse_yaml(candidate: &CandidateFile) -> Result<JsonValue, ParseError> {
    serde_yml::from_str(&candidate.content).map_err(|e| ParseError::Yaml {
        file: candidate.relative_path.clone(),
        message: e.to_string(),
    })
}

fn detect_version(object: &serde_json::Map<String, JsonValue>) -> VersionMarker {
    if let Some(value) = object.get("swagger") {
        return match value {
            JsonValue::String(s) if s == "2.0" => VersionMarker::Supported(SpecVersion::Swagger2),
            // unquoted `swagger: 2.0` in YAML
            JsonValue::Number(n) if n.as_f64() == Some(2.0) => {
                VersionMarker::Supported(SpecVersion::Swagger2)
            }
            other => VersionMarker::Unsupported(render_version(other)),
        };
    }

    if let Some(value) = object.get("openapi") {
        return match value {
            JsonValue::String(s) if is_openapi_30(s) => {
                VersionMarker::Supported(SpecVersion::OpenApi30(s.clone()))
            }
            other => VersionMarker::Unsupported(render_version(other)),
        };
    }

    VersionMarker::Absent
}

/// `3.0.<digits>`
fn is_openapi_30(version: &str) -> bool {
    version
        .strip_prefix("3.0.")
        .is_some_and(|patch| !patch.is_empty() && patch.chars().all(|c| c.is_ascii_digit()))
}

fn render_version(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
