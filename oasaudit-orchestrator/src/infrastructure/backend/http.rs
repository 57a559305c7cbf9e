//! HTTP audit backend client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, instrument};

use oasaudit_core::config::BackendConfig;

use super::{AuditBackend, AuditRequest, AuditResponse, BackendError, BackendReply};

/// Longest error body echoed into messages
const MAX_ERROR_BODY: usize = 512;

/// Audit backend reached over HTTPS with a bearer token
pub struct HttpAuditBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpAuditBackend {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| BackendError::Network {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Build from configuration; a missing token is an authentication error
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BackendError::auth("no audit backend token configured"))?;

        Self::new(
            config.base_url.clone(),
            token,
            Duration::from_secs(config.timeout_seconds),
            &config.user_agent,
        )
    }

    fn audits_url(&self) -> String {
        format!("{}/api/v1/audits", self.base_url)
    }
}

#[async_trait]
impl AuditBackend for HttpAuditBackend {
    #[instrument(skip(self, request), fields(contract = %request.contract_path))]
    async fn submit(&self, request: &AuditRequest) -> Result<AuditResponse, BackendError> {
        debug!("Submitting contract for audit");

        let response = self
            .client
            .post(self.audits_url())
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response.bytes().await?;

        // a tagged body is authoritative over the status code
        match BackendReply::decode(&body, &request.contract_path) {
            Ok(BackendReply::Completed(_)) if !status.is_success() => {
                Err(BackendError::InvalidResponse {
                    message: format!("completed reply with status {}", status),
                })
            }
            Ok(reply) => reply
                .into_result()
                .map_err(|err| with_header_retry_after(err, retry_after)),
            Err(decode_error) => Err(classify_status(status, retry_after, &body, decode_error)),
        }
    }
}

/// Fill in a rate limit's delay from `Retry-After` when the body did not give one
fn with_header_retry_after(error: BackendError, header: Option<Duration>) -> BackendError {
    match error {
        BackendError::RateLimited {
            message,
            retry_after: None,
        } => BackendError::RateLimited {
            message,
            retry_after: header,
        },
        other => other,
    }
}

fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &[u8],
    decode_error: BackendError,
) -> BackendError {
    let message = format!("backend answered {}: {}", status, snippet(body));
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        BackendError::Authentication { message }
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited {
            message,
            retry_after,
        }
    } else if status.is_server_error() {
        BackendError::Internal { message }
    } else if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        BackendError::InvalidContract { message }
    } else if status.is_success() {
        decode_error
    } else {
        error!(status = %status, "Unexpected audit backend status");
        BackendError::InvalidResponse { message }
    }
}

/// `Retry-After` in delta-seconds form
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut end = text.len().min(MAX_ERROR_BODY);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn status_mapping_without_body() {
        let decode = || BackendError::InvalidResponse {
            message: "x".into(),
        };
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, None, b"", decode()),
            BackendError::Internal { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(1)), b"", decode()),
            BackendError::RateLimited { retry_after: Some(_), .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, None, b"bad", decode()),
            BackendError::InvalidContract { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, None, b"denied", decode()),
            BackendError::Authentication { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::OK, None, b"{}", decode()),
            BackendError::InvalidResponse { .. }
        ));
    }

    #[test]
    fn header_delay_only_fills_missing_rate_limit_delay() {
        let header = Some(Duration::from_secs(9));
        let bare = BackendError::RateLimited {
            message: "slow".into(),
            retry_after: None,
        };
        assert_eq!(with_header_retry_after(bare, header).retry_after(), header);

        let explicit = BackendError::RateLimited {
            message: "slow".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(
            with_header_retry_after(explicit, header).retry_after(),
            Some(Duration::from_secs(2))
        );
        assert_eq!(with_header_retry_after(BackendError::Timeout, header), BackendError::Timeout);
    }

    #[test]
    fn missing_token_is_an_auth_error() {
        let config = BackendConfig::default();
        assert!(matches!(
            HttpAuditBackend::from_config(&config),
            Err(BackendError::Authentication { .. })
        ));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(400);
        let cut = snippet(long.as_bytes());
        assert!(cut.len() <= MAX_ERROR_BODY);
    }
}
