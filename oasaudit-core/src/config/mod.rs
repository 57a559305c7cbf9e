//! Layered configuration
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults (`Default` impls below)
//! 2. `oasaudit.toml` in the working directory, or an explicit file
//! 3. `OASAUDIT__SECTION__KEY` environment variables
//! 4. GitHub Action inputs (`INPUT_*`, `GITHUB_*`), see [`action`]
//!
//! Command-line flags are applied on top by the binary.

pub mod action;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{Severity, SeverityThresholds};
use validation::{Validate, ValidationError};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "oasaudit.toml";

/// Environment prefix for `OASAUDIT__SECTION__KEY` overrides
pub const ENV_PREFIX: &str = "OASAUDIT";

const REDACTED: &str = "***";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub discovery: DiscoveryConfig,
    pub enrichment: EnrichmentConfig,
    pub backend: BackendConfig,
    pub dispatch: DispatchConfig,
    pub quota: QuotaConfig,
    pub gate: GateConfig,
    pub report: ReportConfig,
    pub github: GitHubConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// fail, error, warn, info, debug or trace
    pub level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Store `level` normalised; unknown names become `info`
    pub fn set_level(&mut self, level: &str) {
        self.level = crate::logging::normalize_level(level).to_string();
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Repository walk settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Glob patterns a candidate must match; empty accepts every json/yaml file
    pub include: Vec<String>,
    /// Glob patterns pruned from the walk
    pub exclude: Vec<String>,
    /// Files above this size are skipped
    pub max_file_size_bytes: u64,
    pub follow_symlinks: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: vec![
                "**/.git".to_string(),
                "**/node_modules".to_string(),
                "**/target".to_string(),
                "**/vendor".to_string(),
            ],
            max_file_size_bytes: 5 * 1024 * 1024,
            follow_symlinks: false,
        }
    }
}

/// Data-dictionary enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Remote audit backend connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://audit.oasaudit.dev".to_string(),
            token: None,
            timeout_seconds: 30,
            user_agent: format!("oasaudit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Worker pool and retry settings for audit submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub concurrency: usize,
    /// Cancel the dispatch stage after this many seconds
    pub run_timeout_seconds: Option<u64>,
    pub retry: RetryConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            run_timeout_seconds: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Capped exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Audit allowance enforced locally before submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub audits_per_repo_per_month: u32,
    pub repos_per_org: u32,
    /// Persist the quota cache between runs
    pub cache_path: Option<PathBuf>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            audits_per_repo_per_month: 25,
            repos_per_org: 3,
            cache_path: None,
        }
    }
}

/// Security Quality Gate thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Fail the run when any contract fails the gate
    pub enforce: bool,
    /// Highest severity a contract may report
    pub max_severity: Option<Severity>,
    /// Maximum number of findings per severity
    pub max_counts: SeverityThresholds,
    pub max_total: Option<usize>,
    /// Minimum audit score reported by the backend
    pub min_score: Option<f64>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enforce: false,
            max_severity: None,
            max_counts: SeverityThresholds {
                critical: Some(0),
                high: Some(0),
                ..SeverityThresholds::default()
            },
            max_total: None,
            min_score: None,
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub json_path: PathBuf,
    pub sarif_path: Option<PathBuf>,
    /// PDF-ready highlights data
    pub highlights_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            json_path: PathBuf::from("oasaudit-report.json"),
            sarif_path: None,
            highlights_path: None,
        }
    }
}

/// GitHub repository context and code-scanning upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// `owner/name`
    pub repository: Option<String>,
    pub organization: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub sha: Option<String>,
    pub token: Option<String>,
    pub upload_to_code_scanning: bool,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repository: None,
            organization: None,
            git_ref: None,
            sha: None,
            token: None,
            upload_to_code_scanning: false,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl GitHubConfig {
    /// Organization, falling back to the owner part of `repository`
    pub fn effective_organization(&self) -> Option<String> {
        self.organization.clone().or_else(|| {
            self.repository
                .as_deref()
                .and_then(|repo| repo.split_once('/'))
                .map(|(owner, _)| owner.to_string())
        })
    }
}

impl Config {
    /// Load configuration from an optional file, the environment and GitHub Action inputs
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut config = Self::from_sources(path)?;
        config.apply_action_inputs(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// File and `OASAUDIT__*` sources only, without validation
    pub fn from_sources(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut config: Config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        let level = config.logging.level.clone();
        config.logging.set_level(&level);
        Ok(config)
    }

    /// Copy with every credential masked, for debug dumps
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.backend.token.is_some() {
            copy.backend.token = Some(REDACTED.to_string());
        }
        if copy.github.token.is_some() {
            copy.github.token = Some(REDACTED.to_string());
        }
        copy
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.discovery.validate()?;
        self.backend.validate()?;
        self.dispatch.validate()?;
        self.quota.validate()?;
        self.gate.validate()?;
        self.github.validate()?;
        Ok(())
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
