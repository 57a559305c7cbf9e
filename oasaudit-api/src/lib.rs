//! oasaudit API contracts - discovery, classification and enrichment
//!
//! This crate turns a repository checkout into the list of OpenAPI 2.0 / 3.0.x
//! contracts worth auditing, optionally enriched with data-dictionary constraints.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::use_cases::{
    DiscoverContractsUseCase, DiscoveryReport, EnrichContractsUseCase,
};
pub use domain::{
    ApiContract, CandidateFile, ClassificationOutcome, ConstraintKind, ContractFormat,
    EnrichmentResult, InjectedConstraint, SkipReason, SkippedContract, SpecVersion,
};
pub use infrastructure::classifier::ContractClassifier;
pub use infrastructure::discovery::{ContractDiscoverer, DiscoveryError, DiscoveryOptions};
pub use infrastructure::enricher::ContractEnricher;
pub use infrastructure::locator::resolve_pointer_line;
