//! Audit Command - full discovery, enrichment, audit and reporting run

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::error;

use oasaudit_core::Config;
use oasaudit_core::display_header;
use oasaudit_orchestrator::{AuditPipeline, AuditStatus, RunOutcome, RunStatus, preflight};

use crate::cli::context::CliContext;
use crate::cli::{exit_code_for, exit_codes};

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Repository root to scan
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Exit with status 1 when any contract fails the Security Quality Gate
    #[arg(long)]
    pub enforce_sqg: bool,

    /// Skip data-dictionary enrichment
    #[arg(long, conflicts_with = "enrich")]
    pub no_enrich: bool,

    /// Force data-dictionary enrichment on
    #[arg(long)]
    pub enrich: bool,

    /// Where to write the JSON report
    #[arg(long, value_name = "PATH")]
    pub json_report: Option<PathBuf>,

    /// Also write a SARIF report
    #[arg(long, value_name = "PATH")]
    pub sarif_report: Option<PathBuf>,

    /// Also write the highlights data used for the PDF summary
    #[arg(long, value_name = "PATH")]
    pub export_as_pdf: Option<PathBuf>,

    /// Maximum concurrent audit submissions
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Only consider files matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub include: Vec<String>,

    /// Skip files and directories matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Audit backend base URL
    #[arg(long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Audit backend token
    #[arg(long, env = "OASAUDIT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Upload the SARIF report to GitHub code scanning
    #[arg(long)]
    pub upload_to_code_scanning: bool,

    /// Cancel outstanding audits after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,
}

impl AuditArgs {
    /// Overlay flags onto `config`; only flags that were given take effect
    pub fn apply_to(&self, config: &mut Config) {
        if self.enforce_sqg {
            config.gate.enforce = true;
        }
        if self.no_enrich {
            config.enrichment.enabled = false;
        } else if self.enrich {
            config.enrichment.enabled = true;
        }
        if let Some(path) = &self.json_report {
            config.report.json_path = path.clone();
        }
        if let Some(path) = &self.sarif_report {
            config.report.sarif_path = Some(path.clone());
        }
        if let Some(path) = &self.export_as_pdf {
            config.report.highlights_path = Some(path.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.dispatch.concurrency = concurrency;
        }
        if !self.include.is_empty() {
            config.discovery.include = self.include.clone();
        }
        config.discovery.exclude.extend(self.exclude.iter().cloned());
        if let Some(url) = &self.backend_url {
            config.backend.base_url = url.clone();
        }
        if let Some(token) = self.token.as_ref().filter(|t| !t.trim().is_empty()) {
            config.backend.token = Some(token.clone());
        }
        if self.upload_to_code_scanning {
            config.github.upload_to_code_scanning = true;
        }
        if let Some(secs) = self.timeout_seconds {
            config.dispatch.run_timeout_seconds = Some(secs);
        }
    }
}

pub async fn run(ctx: &CliContext, args: &AuditArgs) -> Result<i32> {
    // input errors outrank a missing token
    if let Err(e) = preflight(&ctx.config, &args.root) {
        return Ok(fatal(&e));
    }

    let pipeline = match AuditPipeline::from_config(ctx.config.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => return Ok(fatal(&e)),
    };

    match pipeline.run(&args.root, &ctx.cancel).await {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(match outcome.status {
                RunStatus::Success => exit_codes::SUCCESS,
                RunStatus::GateFailed => exit_codes::SQG_FAILED,
            })
        }
        Err(e) => Ok(fatal(&e)),
    }
}

fn fatal(e: &oasaudit_orchestrator::PipelineError) -> i32 {
    error!(error = %e, "Audit run aborted");
    eprintln!("{}", display_header("oasaudit failed", &e.to_string()));
    exit_code_for(e)
}

fn print_outcome(outcome: &RunOutcome) {
    for contract in &outcome.run.contracts {
        let job = &contract.job;
        let detail = match (job.status, contract.passed()) {
            (AuditStatus::Completed, Some(passed)) => {
                let counts = job
                    .result
                    .as_ref()
                    .map(|r| r.severity_breakdown())
                    .unwrap_or_default();
                format!(
                    "{} findings (critical {}, high {}, medium {}, low {}, info {}), SQG {}",
                    counts.total(),
                    counts.critical,
                    counts.high,
                    counts.medium,
                    counts.low,
                    counts.info,
                    if passed { "passed" } else { "failed" }
                )
            }
            _ => job.note().unwrap_or_default(),
        };
        println!("{:<14} {}  {}", job.status.to_string(), job.contract_path(), detail);
    }
    for skipped in &outcome.run.skipped {
        println!("{:<14} {}  {}", "Skipped", skipped.path, skipped.reason);
    }

    println!("{}", outcome.run.summary);
    if outcome.cancelled {
        println!("Run was cancelled; unfinished audits are reported as failed.");
    }
    if outcome.status == RunStatus::GateFailed {
        eprintln!(
            "{}",
            display_header(
                "Security Quality Gate failed",
                &format!(
                    "{} contract(s) did not meet the SQG and enforcement is on",
                    outcome.run.summary.sqg_failed
                )
            )
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> AuditArgs {
        AuditArgs {
            root: PathBuf::from("."),
            enforce_sqg: false,
            no_enrich: false,
            enrich: false,
            json_report: None,
            sarif_report: None,
            export_as_pdf: None,
            concurrency: None,
            include: Vec::new(),
            exclude: Vec::new(),
            backend_url: None,
            token: None,
            upload_to_code_scanning: false,
            timeout_seconds: None,
        }
    }

    #[test]
    fn unset_flags_leave_config_alone() {
        let mut config = Config::default();
        config.gate.enforce = true;
        args().apply_to(&mut config);
        assert!(config.gate.enforce);
        assert!(config.enrichment.enabled);
        assert_eq!(config.dispatch.concurrency, 4);
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        let args = AuditArgs {
            no_enrich: true,
            sarif_report: Some(PathBuf::from("out/report.sarif")),
            exclude: vec!["**/testdata".into()],
            token: Some("tok".into()),
            timeout_seconds: Some(120),
            ..args()
        };
        args.apply_to(&mut config);

        assert!(!config.enrichment.enabled);
        assert_eq!(
            config.report.sarif_path,
            Some(PathBuf::from("out/report.sarif"))
        );
        assert!(config.discovery.exclude.contains(&"**/testdata".to_string()));
        assert!(config.discovery.exclude.contains(&"**/.git".to_string()));
        assert_eq!(config.backend.token.as_deref(), Some("tok"));
        assert_eq!(config.dispatch.run_timeout_seconds, Some(120));
    }
}
