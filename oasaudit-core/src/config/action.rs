//! GitHub Action inputs
//!
//! Actions expose `with:` inputs as `INPUT_<NAME>` variables (name upper-cased, dashes kept)
//! and the run context as `GITHUB_*` variables. Blank values count as unset and booleans
//! are true only for the literal `true`.

use std::path::PathBuf;

use super::Config;

pub const INPUT_ENFORCE_SQG: &str = "INPUT_ENFORCE-SQG";
pub const INPUT_DATA_ENRICH: &str = "INPUT_DATA-ENRICH";
pub const INPUT_UPLOAD_TO_CODE_SCANNING: &str = "INPUT_UPLOAD-TO-CODE-SCANNING";
pub const INPUT_LOG_LEVEL: &str = "INPUT_LOG-LEVEL";
pub const INPUT_SARIF_REPORT: &str = "INPUT_SARIF-REPORT";
pub const INPUT_EXPORT_AS_PDF: &str = "INPUT_EXPORT-AS-PDF";
pub const INPUT_TOKEN: &str = "INPUT_TOKEN";
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const GITHUB_REPOSITORY_OWNER: &str = "GITHUB_REPOSITORY_OWNER";
pub const GITHUB_REF: &str = "GITHUB_REF";
pub const GITHUB_SHA: &str = "GITHUB_SHA";

/// Levels an action user may pick
const ACTION_LOG_LEVELS: [&str; 5] = ["fail", "error", "warn", "info", "debug"];

impl Config {
    /// Overlay GitHub Action inputs read through `lookup`
    pub fn apply_action_inputs<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        if let Some(value) = get(INPUT_ENFORCE_SQG) {
            self.gate.enforce = parse_flag(&value);
        }
        if let Some(value) = get(INPUT_DATA_ENRICH) {
            self.enrichment.enabled = parse_flag(&value);
        }
        if let Some(value) = get(INPUT_UPLOAD_TO_CODE_SCANNING) {
            self.github.upload_to_code_scanning = parse_flag(&value);
        }
        if let Some(value) = get(INPUT_LOG_LEVEL) {
            self.logging.set_level(action_log_level(&value));
        }
        if let Some(value) = get(INPUT_SARIF_REPORT) {
            self.report.sarif_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get(INPUT_EXPORT_AS_PDF) {
            self.report.highlights_path = Some(PathBuf::from(value));
        }
        if let Some(token) = get(INPUT_TOKEN) {
            if self.backend.token.is_none() {
                self.backend.token = Some(token.clone());
            }
            self.github.token = Some(token);
        }
        if let Some(repository) = get(GITHUB_REPOSITORY) {
            self.github.repository = Some(repository);
        }
        if let Some(owner) = get(GITHUB_REPOSITORY_OWNER) {
            self.github.organization = Some(owner);
        }
        if let Some(git_ref) = get(GITHUB_REF) {
            self.github.git_ref = Some(git_ref);
        }
        if let Some(sha) = get(GITHUB_SHA) {
            self.github.sha = Some(sha);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn action_log_level(value: &str) -> &'static str {
    let lowered = value.trim().to_ascii_lowercase();
    ACTION_LOG_LEVELS
        .into_iter()
        .find(|level| *level == lowered)
        .unwrap_or("info")
}
