//! GitHub code-scanning SARIF upload

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

use oasaudit_core::config::GitHubConfig;

use crate::TOOL_NAME;

const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Code-scanning upload requires a GitHub token")]
    MissingToken,

    #[error("Code-scanning upload requires a repository in owner/name form, got '{0}'")]
    InvalidRepository(String),

    #[error("Code-scanning upload requires {0}")]
    MissingContext(&'static str),

    #[error("Failed to compress SARIF report: {0}")]
    Encoding(#[from] std::io::Error),

    #[error("Code-scanning upload failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Code-scanning upload rejected with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Body of `POST /repos/{owner}/{repo}/code-scanning/sarifs`
#[derive(Debug, Serialize)]
struct SarifUpload<'a> {
    commit_sha: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
    sarif: String,
    tool_name: &'a str,
    checkout_uri: String,
}

/// Uploads SARIF documents to GitHub code scanning
pub struct CodeScanningUploader {
    client: Client,
    api_url: String,
    repository: String,
    token: String,
    commit_sha: String,
    git_ref: String,
}

impl CodeScanningUploader {
    pub fn from_config(config: &GitHubConfig, user_agent: &str) -> Result<Self, UploadError> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(UploadError::MissingToken)?;
        let repository = config
            .repository
            .clone()
            .ok_or(UploadError::MissingContext("a repository"))?;
        if !repository.contains('/') {
            return Err(UploadError::InvalidRepository(repository));
        }
        let commit_sha = config
            .sha
            .clone()
            .ok_or(UploadError::MissingContext("a commit sha"))?;
        let git_ref = config
            .git_ref
            .clone()
            .ok_or(UploadError::MissingContext("a git ref"))?;

        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repository,
            token,
            commit_sha,
            git_ref,
        })
    }

    /// Upload `sarif` once; any non-2xx answer is an error
    #[instrument(skip(self, sarif), fields(repository = %self.repository))]
    pub async fn upload(&self, sarif: &[u8], root: &Path) -> Result<(), UploadError> {
        let body = SarifUpload {
            commit_sha: &self.commit_sha,
            git_ref: &self.git_ref,
            sarif: encode_sarif(sarif)?,
            tool_name: TOOL_NAME,
            checkout_uri: checkout_uri(root),
        };

        let url = format!(
            "{}/repos/{}/code-scanning/sarifs",
            self.api_url, self.repository
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Uploaded SARIF report to code scanning");
        Ok(())
    }
}

/// gzip, then base64
pub fn encode_sarif(sarif: &[u8]) -> Result<String, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(sarif)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

fn checkout_uri(root: &Path) -> String {
    let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let path = absolute.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn github(token: Option<&str>, repository: Option<&str>) -> GitHubConfig {
        GitHubConfig {
            repository: repository.map(str::to_string),
            token: token.map(str::to_string),
            sha: Some("abc123".into()),
            git_ref: Some("refs/heads/main".into()),
            ..GitHubConfig::default()
        }
    }

    #[test]
    fn encode_sarif_is_gzip_base64() {
        let encoded = encode_sarif(br#"{"version":"2.1.0"}"#).unwrap();
        let compressed = STANDARD.decode(encoded).unwrap();
        let mut decoded = String::new();
        GzDecoder::new(&compressed[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, r#"{"version":"2.1.0"}"#);
    }

    #[test]
    fn missing_token_is_rejected() {
        let err = CodeScanningUploader::from_config(&github(None, Some("acme/api")), "test")
            .err()
            .unwrap();
        assert!(matches!(err, UploadError::MissingToken));
    }

    #[test]
    fn repository_needs_owner() {
        let err = CodeScanningUploader::from_config(&github(Some("t"), Some("api")), "test")
            .err()
            .unwrap();
        assert!(matches!(err, UploadError::InvalidRepository(_)));
    }

    #[test]
    fn checkout_uri_is_absolute_file_uri() {
        let uri = checkout_uri(Path::new("some/dir"));
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("some/dir"));
    }
}
