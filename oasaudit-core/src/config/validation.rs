//! Configuration validation module

use crate::config::{
    BackendConfig, DiscoveryConfig, DispatchConfig, GateConfig, GitHubConfig, QuotaConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Discovery configuration error: {message}")]
    Discovery { message: String },

    #[error("Backend configuration error: {message}")]
    Backend { message: String },

    #[error("Dispatch configuration error: {message}")]
    Dispatch { message: String },

    #[error("Quota configuration error: {message}")]
    Quota { message: String },

    #[error("Quality gate configuration error: {message}")]
    Gate { message: String },

    #[error("GitHub configuration error: {message}")]
    GitHub { message: String },
}

impl ValidationError {
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::Quota {
            message: message.into(),
        }
    }

    pub fn gate(message: impl Into<String>) -> Self {
        Self::Gate {
            message: message.into(),
        }
    }

    pub fn github(message: impl Into<String>) -> Self {
        Self::GitHub {
            message: message.into(),
        }
    }
}

impl Validate for DiscoveryConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_file_size_bytes == 0 {
            return Err(ValidationError::discovery(
                "max_file_size_bytes must be > 0",
            ));
        }
        for pattern in self.include.iter().chain(self.exclude.iter()) {
            if pattern.trim().is_empty() {
                return Err(ValidationError::discovery("Glob patterns cannot be empty"));
            }
        }
        Ok(())
    }
}

impl Validate for BackendConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::backend(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(ValidationError::backend("timeout_seconds must be > 0"));
        }
        Ok(())
    }
}

impl Validate for DispatchConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.concurrency == 0 {
            return Err(ValidationError::dispatch("concurrency must be >= 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::dispatch("retry.max_attempts must be >= 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ValidationError::dispatch(
                "retry.backoff_multiplier must be >= 1.0",
            ));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(ValidationError::dispatch(
                "retry.initial_delay_ms cannot exceed retry.max_delay_ms",
            ));
        }
        if self.run_timeout_seconds == Some(0) {
            return Err(ValidationError::dispatch("run_timeout_seconds must be > 0"));
        }
        Ok(())
    }
}

impl Validate for QuotaConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.audits_per_repo_per_month == 0 {
            return Err(ValidationError::quota(
                "audits_per_repo_per_month must be > 0",
            ));
        }
        if self.repos_per_org == 0 {
            return Err(ValidationError::quota("repos_per_org must be > 0"));
        }
        Ok(())
    }
}

impl Validate for GateConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(score) = self.min_score
            && !(0.0..=100.0).contains(&score)
        {
            return Err(ValidationError::gate(format!(
                "min_score must be between 0 and 100, got {}",
                score
            )));
        }
        Ok(())
    }
}

impl Validate for GitHubConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(repository) = &self.repository
            && !repository.contains('/')
        {
            return Err(ValidationError::github(format!(
                "'{}' is not a valid repository (expected owner/name)",
                repository
            )));
        }
        if self.upload_to_code_scanning {
            if self.token.is_none() {
                return Err(ValidationError::github(
                    "Uploading to code scanning requires a GitHub token",
                ));
            }
            if self.repository.is_none() {
                return Err(ValidationError::github(
                    "Uploading to code scanning requires a repository",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = Config::default();
        config.dispatch.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Dispatch { .. })
        ));
    }

    #[test]
    fn rejects_repository_without_owner() {
        let mut config = Config::default();
        config.github.repository = Some("payments".to_string());
        assert!(matches!(config.validate(), Err(ValidationError::GitHub { .. })));
    }

    #[test]
    fn upload_requires_token() {
        let mut config = Config::default();
        config.github.repository = Some("acme/payments".to_string());
        config.github.upload_to_code_scanning = true;
        assert!(config.validate().is_err());

        config.github.token = Some("ghp_token".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let mut config = Config::default();
        config.logging.set_level("verbose");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());

        config.logging.set_level("FAIL");
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn rejects_out_of_range_score() {
        let mut config = Config::default();
        config.gate.min_score = Some(120.0);
        assert!(matches!(config.validate(), Err(ValidationError::Gate { .. })));
    }
}
