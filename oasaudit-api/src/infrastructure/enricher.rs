//! Format-driven constraint injection

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, instrument};

use crate::domain::{ApiContract, EnrichmentResult, InjectedConstraint};
use crate::infrastructure::data_dictionary::DataDictionary;

/// Keywords whose values are data, not schemas
const OPAQUE_KEYWORDS: [&str; 5] = ["example", "examples", "default", "enum", "const"];

/// Keywords whose children are keyed by user-chosen names.
/// `examples` is absent on purpose: it is opaque wherever it appears.
const NAMED_CONTAINERS: [&str; 15] = [
    "properties",
    "patternProperties",
    "definitions",
    "schemas",
    "paths",
    "responses",
    "parameters",
    "headers",
    "requestBodies",
    "securitySchemes",
    "securityDefinitions",
    "links",
    "callbacks",
    "content",
    "encoding",
];

/// Adds data-dictionary constraints to schema nodes that declare a known `format`.
///
/// Existing constraints are never touched, which also makes enrichment idempotent.
#[derive(Debug, Clone)]
pub struct ContractEnricher {
    dictionary: DataDictionary,
    enabled: bool,
}

impl Default for ContractEnricher {
    fn default() -> Self {
        Self::new(DataDictionary::builtin(), true)
    }
}

impl ContractEnricher {
    pub fn new(dictionary: DataDictionary, enabled: bool) -> Self {
        Self {
            dictionary,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[instrument(skip(self, contract), fields(file = %contract.relative_path()))]
    pub fn enrich(&self, contract: ApiContract) -> EnrichmentResult {
        if !self.enabled {
            return EnrichmentResult::untouched(contract);
        }

        let mut contract = contract;
        let mut injected = Vec::new();
        let mut pointer = String::new();
        self.walk(&mut contract.document, &mut pointer, false, &mut injected);

        debug!(injected = injected.len(), "Enrichment completed");
        EnrichmentResult { contract, injected }
    }

    fn walk(
        &self,
        node: &mut JsonValue,
        pointer: &mut String,
        named_children: bool,
        injected: &mut Vec<InjectedConstraint>,
    ) {
        match node {
            JsonValue::Object(object) => {
                self.apply(object, pointer, injected);

                for (key, child) in object.iter_mut() {
                    if !named_children && is_opaque(key) {
                        continue;
                    }
                    let child_named = !named_children && NAMED_CONTAINERS.contains(&key.as_str());
                    let len = pointer.len();
                    push_token(pointer, key);
                    self.walk(child, pointer, child_named, injected);
                    pointer.truncate(len);
                }
            }
            JsonValue::Array(items) => {
                for (index, child) in items.iter_mut().enumerate() {
                    let len = pointer.len();
                    pointer.push('/');
                    pointer.push_str(&index.to_string());
                    self.walk(child, pointer, false, injected);
                    pointer.truncate(len);
                }
            }
            _ => {}
        }
    }

    fn apply(
        &self,
        object: &mut Map<String, JsonValue>,
        pointer: &str,
        injected: &mut Vec<InjectedConstraint>,
    ) {
        let Some(format) = object.get("format").and_then(JsonValue::as_str) else {
            return;
        };
        let Some(entry) = self.dictionary.get(format) else {
            return;
        };
        let declared_type = object.get("type").and_then(JsonValue::as_str);
        if !entry.kind.accepts(declared_type) {
            return;
        }

        let format = format.to_string();
        for (kind, value) in &entry.constraints {
            let keyword = kind.keyword();
            if object.contains_key(keyword) {
                continue;
            }
            object.insert(keyword.to_string(), value.clone());
            injected.push(InjectedConstraint {
                pointer: pointer.to_string(),
                format: format.clone(),
                constraint: *kind,
                value: value.clone(),
            });
        }
    }
}

fn is_opaque(key: &str) -> bool {
    OPAQUE_KEYWORDS.contains(&key) || key.starts_with("x-")
}

/// Append one RFC 6901 reference token
fn push_token(pointer: &mut String, token: &str) {
    pointer.push('/');
    for c in token.chars() {
        match c {
            '~' => pointer.push_str("~0"),
            '/' => pointer.push_str("~1"),
            other => pointer.push(other),
        }
    }
}
