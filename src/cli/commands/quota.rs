//! Quota Command - show the cached audit quota
//!
//! The backend is authoritative; this reads the local cache written by `audit`
//! when `quota.cache_path` is configured.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use oasaudit_orchestrator::{load_quota, resolve_target};

use crate::cli::context::CliContext;
use crate::cli::exit_codes;

#[derive(Args, Debug)]
pub struct QuotaArgs {
    /// Repository root, used to name the repository when none is configured
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

/// Quota information for JSON output
#[derive(Debug, Serialize)]
pub struct QuotaInfo {
    pub organization: String,
    pub repository: String,
    pub month: String,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub registered_repos: u32,
    pub repo_limit: u32,
    pub reset_days: i64,
    pub cached: bool,
}

pub async fn run(ctx: &CliContext, args: &QuotaArgs) -> Result<i32> {
    let config = &ctx.config;
    let cached = config.quota.cache_path.is_some();
    if !cached {
        tracing::warn!("No quota.cache_path configured; showing an empty ledger");
    }

    let quota = load_quota(config);
    let status = quota.status(&resolve_target(config, &args.root)).await;

    if args.json {
        let info = QuotaInfo {
            organization: status.key.organization.clone(),
            repository: status.key.repository.clone(),
            month: status.month.clone(),
            used: status.used,
            limit: status.limit,
            remaining: status.remaining,
            registered_repos: status.registered_repos,
            repo_limit: status.repo_limit,
            reset_days: status.resets_in.num_days(),
            cached,
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", status);
    }

    Ok(exit_codes::SUCCESS)
}
