//! Contract value objects

use serde::{Serialize, Serializer};
use std::fmt;

/// Serialization format of a candidate file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractFormat {
    Json,
    Yaml,
}

impl ContractFormat {
    /// Format implied by a file extension, if it is one we look at
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Guess from content: JSON documents open with `{` or `[`
    pub fn sniff(content: &str) -> Self {
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

/// Supported OpenAPI versions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpecVersion {
    /// `swagger: "2.0"`
    Swagger2,
    /// `openapi: "3.0.x"`, keeps the exact patch string
    OpenApi30(String),
}

impl SpecVersion {
    pub fn is_swagger(&self) -> bool {
        matches!(self, SpecVersion::Swagger2)
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecVersion::Swagger2 => f.write_str("2.0"),
            SpecVersion::OpenApi30(version) => f.write_str(version),
        }
    }
}

impl Serialize for SpecVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Constraint keyword injected by enrichment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConstraintKind {
    #[serde(rename = "pattern")]
    Pattern,
    #[serde(rename = "minLength")]
    MinLength,
    #[serde(rename = "maxLength")]
    MaxLength,
    #[serde(rename = "minimum")]
    Minimum,
    #[serde(rename = "maximum")]
    Maximum,
}

impl ConstraintKind {
    /// JSON Schema keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            ConstraintKind::Pattern => "pattern",
            ConstraintKind::MinLength => "minLength",
            ConstraintKind::MaxLength => "maxLength",
            ConstraintKind::Minimum => "minimum",
            ConstraintKind::Maximum => "maximum",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(ContractFormat::from_extension("JSON"), Some(ContractFormat::Json));
        assert_eq!(ContractFormat::from_extension("yml"), Some(ContractFormat::Yaml));
        assert_eq!(ContractFormat::from_extension("txt"), None);
    }

    #[test]
    fn sniffing_skips_bom_and_whitespace() {
        assert_eq!(ContractFormat::sniff("\u{feff}  {\"a\": 1}"), ContractFormat::Json);
        assert_eq!(ContractFormat::sniff("openapi: 3.0.0"), ContractFormat::Yaml);
    }

    #[test]
    fn version_display() {
        assert_eq!(SpecVersion::Swagger2.to_string(), "2.0");
        assert_eq!(SpecVersion::OpenApi30("3.0.3".into()).to_string(), "3.0.3");
    }
}
