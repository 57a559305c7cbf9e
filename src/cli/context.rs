//! CLI Context - configuration and cancellation shared by all commands

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use oasaudit_core::Config;
use oasaudit_core::config::validation::Validate;

use crate::cli::{Cli, Commands};

pub struct CliContext {
    /// Effective configuration: file, environment, Action inputs, then flags
    pub config: Config,

    /// Cancelled on Ctrl+C / SIGTERM
    pub cancel: CancellationToken,
}

impl CliContext {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::from_sources(cli.config.as_deref())
            .context("Failed to load configuration")?;
        config.apply_action_inputs(|key| std::env::var(key).ok());

        if let Some(level) = &cli.log_level {
            config.logging.set_level(level);
        }
        if let Some(format) = cli.log_format {
            config.logging.format = format.into();
        }
        if let Commands::Audit(args) = &cli.command {
            args.apply_to(&mut config);
        }

        config.validate().context("Invalid configuration")?;

        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }
}
