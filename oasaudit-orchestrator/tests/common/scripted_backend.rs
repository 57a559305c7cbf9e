//! In-memory audit backend (test double)

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use oasaudit_orchestrator::{AuditBackend, AuditRequest, AuditResponse, BackendError};

use super::fixtures::clean_response;

/// Replies from a per-contract script, falling back to a clean audit
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Result<AuditResponse, BackendError>>>>,
    submissions: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each submission sleeps for `delay` before replying
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Queue replies for `path`; once drained, replies are clean
    pub async fn script(
        &self,
        path: &str,
        replies: impl IntoIterator<Item = Result<AuditResponse, BackendError>>,
    ) {
        self.scripts
            .lock()
            .await
            .entry(path.to_string())
            .or_default()
            .extend(replies);
    }

    /// Contract paths in submission order, one entry per attempt
    pub async fn submissions(&self) -> Vec<String> {
        self.submissions.lock().await.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditBackend for ScriptedBackend {
    async fn submit(&self, request: &AuditRequest) -> Result<AuditResponse, BackendError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.submissions
            .lock()
            .await
            .push(request.contract_path.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .scripts
            .lock()
            .await
            .get_mut(&request.contract_path)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(clean_response()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}
