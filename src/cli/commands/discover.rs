//! Discover Command - discovery and classification only
//!
//! Works fully offline and never consumes quota.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use oasaudit_api::{
    ContractClassifier, ContractDiscoverer, DiscoverContractsUseCase, DiscoveryOptions,
};
use oasaudit_core::display_header;

use crate::cli::context::CliContext;
use crate::cli::exit_codes;

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Repository root to scan
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Only consider files matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub include: Vec<String>,

    /// Skip files and directories matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(ctx: &CliContext, args: &DiscoverArgs) -> Result<i32> {
    let mut options = DiscoveryOptions::from(&ctx.config.discovery);
    if !args.include.is_empty() {
        options.include = args.include.clone();
    }
    options.exclude.extend(args.exclude.iter().cloned());

    let report = ContractDiscoverer::new(options)
        .map(|discoverer| DiscoverContractsUseCase::new(discoverer, ContractClassifier::new()))
        .and_then(|use_case| use_case.execute(&args.root));

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", display_header("oasaudit discover failed", &e.to_string()));
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    if args.json {
        let value = serde_json::json!({
            "discovered": report.discovered,
            "ignored": report.ignored,
            "contracts": report
                .contracts
                .iter()
                .map(|c| serde_json::json!({
                    "path": c.relative_path(),
                    "spec_version": c.version.to_string(),
                    "title": c.title(),
                }))
                .collect::<Vec<_>>(),
            "skipped": report.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(exit_codes::SUCCESS);
    }

    for contract in &report.contracts {
        println!(
            "{:<10} {}  OpenAPI {}{}",
            "contract",
            contract.relative_path(),
            contract.version,
            contract
                .title()
                .map(|t| format!(" ({})", t))
                .unwrap_or_default()
        );
    }
    for skipped in &report.skipped {
        println!("{:<10} {}  {}", "skipped", skipped.path, skipped.reason);
    }
    println!(
        "{} candidate file(s): {} contract(s), {} skipped, {} ignored",
        report.discovered,
        report.contracts.len(),
        report.skipped.len(),
        report.ignored
    );

    Ok(exit_codes::SUCCESS)
}
