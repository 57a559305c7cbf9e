//! oasaudit - OpenAPI contract audits for CI pipelines

mod cli;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use oasaudit_core::{display_header, init_tracing};

use cli::{Cli, CliApp, exit_codes};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app = match CliApp::new(cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{}", display_header("Configuration error", &format!("{:#}", e)));
            std::process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    if let Err(e) = init_tracing(&app.context().config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tokio::spawn(shutdown_signal(app.context().cancel.clone()));

    let code = match app.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", display_header("Internal error", &format!("{:#}", e)));
            exit_codes::INTERNAL_ERROR
        }
    };

    std::process::exit(code);
}

/// Cancel the run on Ctrl+C or SIGTERM; in-flight audits are reported as cancelled
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Received Ctrl+C, cancelling outstanding audits");
        },
        _ = terminate => {
            tracing::warn!("Received SIGTERM, cancelling outstanding audits");
        },
    }

    cancel.cancel();
}
