//! oasaudit core - shared building blocks
//!
//! This crate holds what every other oasaudit crate agrees on:
//! - Domain vocabulary for audit findings (`Severity`, `Finding`, `SeverityBreakdown`)
//! - Layered configuration (`Config`) with per-section validation
//! - Tracing initialisation and console banners

pub mod config;
pub mod domain;
pub mod logging;

pub use config::Config;
pub use domain::{Finding, FindingLocation, Severity, SeverityBreakdown, SeverityThresholds};
pub use logging::{display_header, init_tracing};
