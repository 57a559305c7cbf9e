//! oasaudit CLI - OpenAPI contract audits for CI pipelines
//!
//! Discovers OpenAPI 2.0 / 3.0.x contracts in a checkout, enriches them with
//! data-dictionary constraints, audits them against the remote backend and
//! writes JSON, SARIF and highlights reports.

mod commands;
mod context;

pub use context::CliContext;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use oasaudit_core::config::LogFormat;
use oasaudit_orchestrator::PipelineError;

/// oasaudit - OpenAPI contract security audits from the command line
#[derive(Parser, Debug)]
#[command(
    name = "oasaudit",
    version,
    about = "OpenAPI contract discovery and security audits",
    long_about = "oasaudit finds the OpenAPI 2.0 and 3.0.x contracts in a repository, enriches \
                  them with data-dictionary constraints and audits them against the remote \
                  audit backend.\n\n\
                  Free tier: 25 audits per repository per month, 3 repositories per organization."
)]
pub struct Cli {
    /// Configuration file (defaults to ./oasaudit.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: fail, error, warn, info or debug
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<CliLogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover, enrich and audit every contract under ROOT
    #[command(visible_alias = "a")]
    Audit(commands::audit::AuditArgs),

    /// List the contracts under ROOT without auditing them
    #[command(visible_alias = "d")]
    Discover(commands::discover::DiscoverArgs),

    /// Show the cached audit quota for this repository
    #[command(visible_alias = "q")]
    Quota(commands::quota::QuotaArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliLogFormat {
    Text,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Text => LogFormat::Text,
            CliLogFormat::Json => LogFormat::Json,
        }
    }
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
    context: CliContext,
}

impl CliApp {
    pub fn new(cli: Cli) -> anyhow::Result<Self> {
        let context = CliContext::new(&cli)?;
        Ok(Self { cli, context })
    }

    pub fn context(&self) -> &CliContext {
        &self.context
    }

    pub async fn run(self) -> anyhow::Result<i32> {
        let exit_code = match self.cli.command {
            Commands::Audit(ref args) => commands::audit::run(&self.context, args).await,
            Commands::Discover(ref args) => commands::discover::run(&self.context, args),
            Commands::Quota(ref args) => commands::quota::run(&self.context, args).await,
        }?;

        Ok(exit_code)
    }
}

/// Exit codes for CI integration
pub mod exit_codes {
    /// Success, or SQG failures without enforcement
    pub const SUCCESS: i32 = 0;
    /// A contract failed the SQG with enforcement on
    pub const SQG_FAILED: i32 = 1;
    /// Configuration or input error, including a missing root
    pub const CONFIG_ERROR: i32 = 2;
    /// Network or code-scanning upload error
    pub const NETWORK_ERROR: i32 = 3;
    /// A requested report could not be written
    pub const OUTPUT_ERROR: i32 = 4;
    /// Audit backend rejected or lacked credentials
    pub const AUTH_ERROR: i32 = 5;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = 99;
}

/// Exit code for a fatal pipeline error
pub fn exit_code_for(error: &PipelineError) -> i32 {
    match error {
        PipelineError::Discovery(_) => exit_codes::CONFIG_ERROR,
        PipelineError::Authentication(_) => exit_codes::AUTH_ERROR,
        PipelineError::Report(_) => exit_codes::OUTPUT_ERROR,
        PipelineError::Upload(_) => exit_codes::NETWORK_ERROR,
        PipelineError::Internal(_) => exit_codes::INTERNAL_ERROR,
    }
}
