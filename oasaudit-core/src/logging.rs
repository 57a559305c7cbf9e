//! Tracing initialisation and console banners

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Crates whose events follow the configured level; everything else stays at `warn`
const WORKSPACE_TARGETS: [&str; 4] = [
    "oasaudit",
    "oasaudit_core",
    "oasaudit_api",
    "oasaudit_orchestrator",
];

#[derive(Debug, thiserror::Error)]
#[error("Failed to initialise tracing: {0}")]
pub struct LoggingInitError(String);

/// Map a configured level onto a tracing level name, defaulting to `info`
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "fail" | "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

fn filter_directive(level: &str) -> String {
    let level = normalize_level(level);
    let mut directive = String::from("warn");
    for target in WORKSPACE_TARGETS {
        directive.push_str(&format!(",{}={}", target, level));
    }
    directive
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    };

    result.map_err(|e| LoggingInitError(e.to_string()))
}

/// Banner used for fatal errors and gate failures
pub fn display_header(title: &str, text: &str) -> String {
    let rule = "!".repeat(80);
    format!("\n{rule}\n! {title}\n!\n! {text}\n{rule}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_maps_to_error() {
        assert_eq!(normalize_level("fail"), "error");
        assert_eq!(normalize_level("WARN"), "warn");
        assert_eq!(normalize_level("nonsense"), "info");
    }

    #[test]
    fn directive_scopes_workspace_crates() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("oasaudit_orchestrator=debug"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn header_layout() {
        let banner = display_header("Security issues found", "3 issues found");
        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(lines[1], "!".repeat(80));
        assert_eq!(lines[2], "! Security issues found");
        assert_eq!(lines[3], "!");
        assert_eq!(lines[4], "! 3 issues found");
        assert_eq!(lines[5], "!".repeat(80));
    }
}
