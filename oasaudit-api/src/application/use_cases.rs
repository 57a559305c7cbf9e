//! Discovery and enrichment use cases

use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::{ApiContract, ClassificationOutcome, EnrichmentResult, SkippedContract};
use crate::infrastructure::classifier::ContractClassifier;
use crate::infrastructure::discovery::{ContractDiscoverer, DiscoveryError};
use crate::infrastructure::enricher::ContractEnricher;

/// Outcome of walking and classifying a repository
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Candidate files found by the walk
    pub discovered: usize,
    /// Contracts in lexicographic path order
    pub contracts: Vec<ApiContract>,
    /// Recognised contracts that will not be audited
    pub skipped: Vec<SkippedContract>,
    /// Candidates that are not OpenAPI documents
    pub ignored: usize,
}

/// Use case for finding auditable contracts under a root
pub struct DiscoverContractsUseCase {
    discoverer: ContractDiscoverer,
    classifier: ContractClassifier,
}

impl DiscoverContractsUseCase {
    pub fn new(discoverer: ContractDiscoverer, classifier: ContractClassifier) -> Self {
        Self {
            discoverer,
            classifier,
        }
    }

    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn execute(&self, root: &Path) -> Result<DiscoveryReport, DiscoveryError> {
        let candidates = self.discoverer.discover(root)?;
        let mut report = DiscoveryReport {
            discovered: candidates.len(),
            ..DiscoveryReport::default()
        };

        for candidate in candidates {
            match self.classifier.classify(Arc::new(candidate)) {
                ClassificationOutcome::Contract(contract) => report.contracts.push(contract),
                ClassificationOutcome::Skipped(skipped) => report.skipped.push(skipped),
                ClassificationOutcome::NotAContract => report.ignored += 1,
            }
        }

        info!(
            discovered = report.discovered,
            classified = report.contracts.len(),
            skipped = report.skipped.len(),
            ignored = report.ignored,
            "Contract discovery completed"
        );
        Ok(report)
    }
}

/// Use case for enriching a batch of contracts
pub struct EnrichContractsUseCase {
    enricher: Arc<ContractEnricher>,
}

impl EnrichContractsUseCase {
    pub fn new(enricher: ContractEnricher) -> Self {
        Self {
            enricher: Arc::new(enricher),
        }
    }

    /// Enrich in input order
    #[instrument(skip(self, contracts), fields(count = contracts.len(), enabled = self.enricher.is_enabled()))]
    pub fn execute(&self, contracts: Vec<ApiContract>) -> Vec<EnrichmentResult> {
        let results: Vec<EnrichmentResult> = contracts
            .into_iter()
            .map(|contract| self.enricher.enrich(contract))
            .collect();

        let injected: usize = results.iter().map(|r| r.injected.len()).sum();
        info!(
            contracts = results.len(),
            injected, "Contract enrichment completed"
        );
        results
    }
}
