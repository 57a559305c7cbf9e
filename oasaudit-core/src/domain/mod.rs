//! Domain types shared across the audit pipeline

pub mod entities;
pub mod value_objects;

pub use entities::{Finding, FindingLocation};
pub use value_objects::{Severity, SeverityBreakdown, SeverityThresholds};
