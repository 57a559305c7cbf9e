//! Quota State - freemium usage cap shared by all dispatch workers
//!
//! Tracks, per organization:
//! - which repositories are registered (at most `repos_per_org`)
//! - audits used this month per repository (at most `audits_per_repo_per_month`)
//!
//! The backend is the authority. This is a cache: backend responses refresh it through
//! [`QuotaState::observe`] and a backend quota-exceeded verdict pins it with
//! [`QuotaState::mark_exhausted`]. Counters reset when the UTC month changes.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use oasaudit_core::config::QuotaConfig;

use super::backend::QuotaSnapshot;
use crate::domain::RepoKey;

/// Source of the current time, injected so month rollover is testable
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Usage caps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub audits_per_repo_per_month: u32,
    pub repos_per_org: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self::from(&QuotaConfig::default())
    }
}

impl From<&QuotaConfig> for QuotaLimits {
    fn from(config: &QuotaConfig) -> Self {
        Self {
            audits_per_repo_per_month: config.audits_per_repo_per_month,
            repos_per_org: config.repos_per_org,
        }
    }
}

/// Persisted ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct QuotaLedger {
    /// `YYYY-MM` in UTC
    month: String,
    organizations: BTreeMap<String, BTreeMap<String, RepoUsage>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RepoUsage {
    used: u32,
    #[serde(default)]
    exhausted: bool,
}

impl QuotaLedger {
    fn empty(month: String) -> Self {
        Self {
            month,
            organizations: BTreeMap::new(),
        }
    }

    fn roll(&mut self, month: &str) {
        if self.month != month {
            tracing::debug!(from = %self.month, to = %month, "Quota month changed, resetting counters");
            *self = Self::empty(month.to_string());
        }
    }

    fn usage(&self, key: &RepoKey) -> Option<&RepoUsage> {
        self.organizations
            .get(&key.organization)
            .and_then(|repos| repos.get(&key.repository))
    }

    /// Registered usage slot for `key`, registering the repository when the org has room
    fn slot(&mut self, key: &RepoKey, repos_per_org: u32) -> Option<&mut RepoUsage> {
        let repos = self
            .organizations
            .entry(key.organization.clone())
            .or_default();
        if !repos.contains_key(&key.repository) && repos.len() >= repos_per_org as usize {
            return None;
        }
        Some(repos.entry(key.repository.clone()).or_default())
    }
}

/// A granted audit slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaReservation {
    /// Audits used this month, this one included
    pub used: u32,
    pub remaining: u32,
}

/// Why a reservation was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaDenial {
    #[error("organization '{organization}' already has {limit} registered repositories")]
    RepoLimit { organization: String, limit: u32 },

    #[error("monthly audit cap reached for {repository} ({used}/{limit})")]
    MonthlyCap {
        repository: String,
        used: u32,
        limit: u32,
    },
}

/// Errors writing the quota cache
#[derive(Debug, thiserror::Error)]
pub enum QuotaPersistError {
    #[error("Failed to serialize quota cache: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write quota cache {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Process-wide quota cache with atomic check-and-increment
pub struct QuotaState {
    limits: QuotaLimits,
    clock: Arc<dyn Clock>,
    ledger: Mutex<QuotaLedger>,
}

impl fmt::Debug for QuotaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaState")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl QuotaState {
    pub fn new(limits: QuotaLimits, clock: Arc<dyn Clock>) -> Self {
        let month = month_key(clock.now());
        Self {
            limits,
            clock,
            ledger: Mutex::new(QuotaLedger::empty(month)),
        }
    }

    /// Load the cache from `path`, starting fresh when it is missing, corrupted or from another month
    pub fn load(path: &Path, limits: QuotaLimits, clock: Arc<dyn Clock>) -> Self {
        let state = Self::new(limits, clock);
        if !path.exists() {
            return state;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read quota cache, resetting");
                return state;
            }
        };

        let mut ledger: QuotaLedger = match serde_json::from_str(&content) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Quota cache corrupted, resetting");
                return state;
            }
        };

        ledger.roll(&month_key(state.clock.now()));
        Self {
            ledger: Mutex::new(ledger),
            ..state
        }
    }

    /// Persist the cache to `path`
    pub async fn save(&self, path: &Path) -> Result<(), QuotaPersistError> {
        let content = {
            let ledger = self.ledger.lock().await;
            serde_json::to_string_pretty(&*ledger)?
        };

        let io_err = |source| QuotaPersistError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await.map_err(io_err)?;
        // mode only applies on creation; tighten a cache written by an older run
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(io_err)?;
        }
        file.write_all(content.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(())
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Reserve one audit for `key`, registering the repository on first use
    pub async fn try_reserve(&self, key: &RepoKey) -> Result<QuotaReservation, QuotaDenial> {
        let month = month_key(self.clock.now());
        let limits = self.limits;
        let mut ledger = self.ledger.lock().await;
        ledger.roll(&month);

        let Some(usage) = ledger.slot(key, limits.repos_per_org) else {
            return Err(QuotaDenial::RepoLimit {
                organization: key.organization.clone(),
                limit: limits.repos_per_org,
            });
        };

        if usage.exhausted || usage.used >= limits.audits_per_repo_per_month {
            return Err(QuotaDenial::MonthlyCap {
                repository: key.to_string(),
                used: usage.used,
                limit: limits.audits_per_repo_per_month,
            });
        }

        usage.used += 1;
        Ok(QuotaReservation {
            used: usage.used,
            remaining: limits.audits_per_repo_per_month - usage.used,
        })
    }

    /// Record a backend quota-exceeded verdict; no further reservations this month
    pub async fn mark_exhausted(&self, key: &RepoKey) {
        let month = month_key(self.clock.now());
        let mut ledger = self.ledger.lock().await;
        ledger.roll(&month);
        if let Some(usage) = ledger.slot(key, self.limits.repos_per_org) {
            usage.exhausted = true;
        }
    }

    /// Refresh the cache from the backend's usage report. Counts only move upwards.
    pub async fn observe(&self, key: &RepoKey, snapshot: &QuotaSnapshot) {
        let month = month_key(self.clock.now());
        let cap = snapshot
            .limit
            .unwrap_or(self.limits.audits_per_repo_per_month)
            .min(self.limits.audits_per_repo_per_month);
        let mut ledger = self.ledger.lock().await;
        ledger.roll(&month);
        if let Some(usage) = ledger.slot(key, self.limits.repos_per_org) {
            usage.used = usage.used.max(snapshot.used);
            if usage.used >= cap {
                usage.exhausted = true;
            }
        }
    }

    pub async fn status(&self, key: &RepoKey) -> QuotaStatus {
        let now = self.clock.now();
        let month = month_key(now);
        let mut ledger = self.ledger.lock().await;
        ledger.roll(&month);

        let usage = ledger.usage(key).copied().unwrap_or_default();
        let registered_repos = ledger
            .organizations
            .get(&key.organization)
            .map(|repos| repos.len() as u32)
            .unwrap_or(0);
        let limit = self.limits.audits_per_repo_per_month;

        QuotaStatus {
            key: key.clone(),
            month,
            used: usage.used,
            limit,
            remaining: if usage.exhausted {
                0
            } else {
                limit.saturating_sub(usage.used)
            },
            registered_repos,
            repo_limit: self.limits.repos_per_org,
            resets_in: time_until_next_month(now),
        }
    }
}

/// Quota status for display
#[derive(Debug, Clone)]
pub struct QuotaStatus {
    pub key: RepoKey,
    pub month: String,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub registered_repos: u32,
    pub repo_limit: u32,
    pub resets_in: chrono::Duration,
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.resets_in.num_days();
        let hours = self.resets_in.num_hours() % 24;

        write!(
            f,
            "Quota for {} ({}): {}/{} audits ({} remaining) | Repos {}/{} | Resets in {}d {}h",
            self.key,
            self.month,
            self.used,
            self.limit,
            self.remaining,
            self.registered_repos,
            self.repo_limit,
            days,
            hours
        )
    }
}

fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

fn time_until_next_month(now: DateTime<Utc>) -> chrono::Duration {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    match Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single() {
        Some(start) => start.signed_duration_since(now),
        None => chrono::Duration::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn state_at(now: DateTime<Utc>) -> (QuotaState, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now));
        let state = QuotaState::new(QuotaLimits::default(), clock.clone());
        (state, clock)
    }

    fn repo(name: &str) -> RepoKey {
        RepoKey::new("acme", name)
    }

    #[tokio::test]
    async fn test_reserve_counts_down() {
        let (state, _clock) = state_at(at(2026, 3, 10));

        let first = state.try_reserve(&repo("api")).await.unwrap();
        assert_eq!(first.used, 1);
        assert_eq!(first.remaining, 24);
    }

    #[tokio::test]
    async fn test_monthly_cap_refuses_26th() {
        let (state, _clock) = state_at(at(2026, 3, 10));

        for _ in 0..25 {
            state.try_reserve(&repo("api")).await.unwrap();
        }

        let denial = state.try_reserve(&repo("api")).await.unwrap_err();
        assert_eq!(
            denial,
            QuotaDenial::MonthlyCap {
                repository: "acme:api".into(),
                used: 25,
                limit: 25
            }
        );
    }

    #[tokio::test]
    async fn test_fourth_repo_is_refused() {
        let (state, _clock) = state_at(at(2026, 3, 10));

        for name in ["a", "b", "c"] {
            state.try_reserve(&repo(name)).await.unwrap();
        }

        assert!(matches!(
            state.try_reserve(&repo("d")).await,
            Err(QuotaDenial::RepoLimit { limit: 3, .. })
        ));
        // Registered repos keep working
        assert!(state.try_reserve(&repo("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_month_rollover_resets_counters() {
        let (state, clock) = state_at(at(2026, 3, 31));
        for _ in 0..25 {
            state.try_reserve(&repo("api")).await.unwrap();
        }
        assert!(state.try_reserve(&repo("api")).await.is_err());

        clock.set(at(2026, 4, 1));
        let reservation = state.try_reserve(&repo("api")).await.unwrap();
        assert_eq!(reservation.used, 1);
    }

    #[tokio::test]
    async fn test_mark_exhausted_blocks_reservations() {
        let (state, _clock) = state_at(at(2026, 3, 10));
        state.try_reserve(&repo("api")).await.unwrap();

        state.mark_exhausted(&repo("api")).await;

        assert!(matches!(
            state.try_reserve(&repo("api")).await,
            Err(QuotaDenial::MonthlyCap { used: 1, .. })
        ));
        assert_eq!(state.status(&repo("api")).await.remaining, 0);
    }

    #[tokio::test]
    async fn test_observe_only_moves_upwards() {
        let (state, _clock) = state_at(at(2026, 3, 10));

        state
            .observe(&repo("api"), &QuotaSnapshot { used: 24, limit: Some(25) })
            .await;
        state
            .observe(&repo("api"), &QuotaSnapshot { used: 3, limit: None })
            .await;

        let status = state.status(&repo("api")).await;
        assert_eq!(status.used, 24);
        assert_eq!(status.remaining, 1);

        state.try_reserve(&repo("api")).await.unwrap();
        assert!(state.try_reserve(&repo("api")).await.is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache").join("quota.json");
        let clock = Arc::new(FixedClock::new(at(2026, 3, 10)));

        let state = QuotaState::new(QuotaLimits::default(), clock.clone());
        for _ in 0..7 {
            state.try_reserve(&repo("api")).await.unwrap();
        }
        state.save(&path).await.unwrap();

        let reloaded = QuotaState::load(&path, QuotaLimits::default(), clock.clone());
        assert_eq!(reloaded.status(&repo("api")).await.used, 7);

        clock.set(at(2026, 4, 2));
        let next_month = QuotaState::load(&path, QuotaLimits::default(), clock);
        assert_eq!(next_month.status(&repo("api")).await.used, 0);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_cache_privately() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("quota.json");
        fs::write(&path, "x".repeat(4096)).unwrap();

        let (state, clock) = state_at(at(2026, 3, 10));
        state.try_reserve(&repo("api")).await.unwrap();
        state.save(&path).await.unwrap();

        let reloaded = QuotaState::load(&path, QuotaLimits::default(), clock);
        assert_eq!(reloaded.status(&repo("api")).await.used, 1);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_corrupted_cache_starts_fresh() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("quota.json");
        fs::write(&path, "{ not json").unwrap();

        let clock = Arc::new(FixedClock::new(at(2026, 3, 10)));
        let state = QuotaState::load(&path, QuotaLimits::default(), clock);
        assert_eq!(state.status(&repo("api")).await.used, 0);
    }

    #[tokio::test]
    async fn test_status_display() {
        let (state, _clock) = state_at(at(2026, 3, 10));
        state.try_reserve(&repo("api")).await.unwrap();

        let display = state.status(&repo("api")).await.to_string();
        assert!(display.contains("acme:api"));
        assert!(display.contains("1/25"));
        assert!(display.contains("Repos 1/3"));
        assert!(display.contains("2026-03"));
    }
}
