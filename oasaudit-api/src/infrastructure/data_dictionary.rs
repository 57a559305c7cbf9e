//! Built-in data dictionary: validation constraints implied by a schema `format`

use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;

use crate::domain::ConstraintKind;

/// Schema type a dictionary entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
}

impl ValueKind {
    /// Whether a node declaring `type` (or none) accepts this entry
    pub fn accepts(&self, declared_type: Option<&str>) -> bool {
        match (self, declared_type) {
            (_, None) => true,
            (ValueKind::String, Some(t)) => t == "string",
            (ValueKind::Integer, Some(t)) => t == "integer" || t == "number",
        }
    }
}

/// Constraints for one format
#[derive(Debug, Clone)]
pub struct FormatEntry {
    pub kind: ValueKind,
    pub constraints: Vec<(ConstraintKind, JsonValue)>,
}

impl FormatEntry {
    fn string(pattern: Option<&str>, min_length: Option<u64>, max_length: Option<u64>) -> Self {
        let mut constraints = Vec::new();
        if let Some(pattern) = pattern {
            constraints.push((ConstraintKind::Pattern, json!(pattern)));
        }
        if let Some(min) = min_length {
            constraints.push((ConstraintKind::MinLength, json!(min)));
        }
        if let Some(max) = max_length {
            constraints.push((ConstraintKind::MaxLength, json!(max)));
        }
        Self {
            kind: ValueKind::String,
            constraints,
        }
    }

    fn integer(minimum: i64, maximum: i64) -> Self {
        Self {
            kind: ValueKind::Integer,
            constraints: vec![
                (ConstraintKind::Minimum, json!(minimum)),
                (ConstraintKind::Maximum, json!(maximum)),
            ],
        }
    }
}

/// Format name to constraint table
#[derive(Debug, Clone)]
pub struct DataDictionary {
    entries: BTreeMap<String, FormatEntry>,
}

impl Default for DataDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DataDictionary {
    pub fn builtin() -> Self {
        let octet = r"(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])";
        let label = r"[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?";
        let entries = [
            (
                "uuid",
                FormatEntry::string(
                    Some("^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"),
                    Some(36),
                    Some(36),
                ),
            ),
            (
                "date-time",
                FormatEntry::string(
                    Some(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:[0-9]{2})$"),
                    Some(20),
                    Some(35),
                ),
            ),
            (
                "date",
                FormatEntry::string(Some("^[0-9]{4}-[0-9]{2}-[0-9]{2}$"), Some(10), Some(10)),
            ),
            (
                "time",
                FormatEntry::string(
                    Some(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:[0-9]{2})?$"),
                    Some(8),
                    Some(24),
                ),
            ),
            (
                "email",
                FormatEntry::string(Some(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"), Some(6), Some(254)),
            ),
            (
                "hostname",
                FormatEntry::string(
                    Some(&format!(r"^{label}(\.{label})*$")),
                    Some(1),
                    Some(253),
                ),
            ),
            (
                "ipv4",
                FormatEntry::string(
                    Some(&format!(r"^({octet}\.){{3}}{octet}$")),
                    Some(7),
                    Some(15),
                ),
            ),
            (
                "ipv6",
                FormatEntry::string(Some("^[0-9A-Fa-f:.]+$"), Some(2), Some(45)),
            ),
            (
                "uri",
                FormatEntry::string(Some(r"^[A-Za-z][A-Za-z0-9+.-]*:\S+$"), Some(3), Some(2048)),
            ),
            (
                "url",
                FormatEntry::string(Some(r"^https?://\S+$"), Some(10), Some(2048)),
            ),
            (
                "byte",
                FormatEntry::string(
                    Some("^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$"),
                    None,
                    None,
                ),
            ),
            ("password", FormatEntry::string(None, Some(8), Some(128))),
            (
                "int32",
                FormatEntry::integer(i32::MIN as i64, i32::MAX as i64),
            ),
            ("int64", FormatEntry::integer(i64::MIN, i64::MAX)),
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|(format, entry)| (format.to_string(), entry))
                .collect(),
        }
    }

    pub fn get(&self, format: &str) -> Option<&FormatEntry> {
        self.entries.get(format)
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_entry_has_length_and_pattern() {
        let dictionary = DataDictionary::builtin();
        let entry = dictionary.get("uuid").unwrap();
        assert_eq!(entry.kind, ValueKind::String);
        let keywords: Vec<_> = entry.constraints.iter().map(|(k, _)| k.keyword()).collect();
        assert_eq!(keywords, ["pattern", "minLength", "maxLength"]);
    }

    #[test]
    fn ipv4_pattern_expands_octets() {
        let dictionary = DataDictionary::builtin();
        let (_, pattern) = &dictionary.get("ipv4").unwrap().constraints[0];
        let pattern = pattern.as_str().unwrap();
        assert!(pattern.starts_with("^((25[0-5]"));
        assert!(pattern.contains("\\.){3}"));
    }

    #[test]
    fn type_compatibility() {
        assert!(ValueKind::String.accepts(None));
        assert!(ValueKind::String.accepts(Some("string")));
        assert!(!ValueKind::String.accepts(Some("integer")));
        assert!(ValueKind::Integer.accepts(Some("integer")));
        assert!(!ValueKind::Integer.accepts(Some("string")));
    }

    #[test]
    fn unknown_format_has_no_entry() {
        assert!(DataDictionary::builtin().get("color").is_none());
        assert!(DataDictionary::builtin().formats().any(|f| f == "date-time"));
    }
}
