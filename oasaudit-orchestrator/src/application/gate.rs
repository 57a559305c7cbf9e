//! Security Quality Gate evaluation

use serde::Serialize;
use std::collections::BTreeMap;

use oasaudit_core::Severity;
use oasaudit_core::config::GateConfig;

use crate::domain::AuditResult;

/// Thresholds a completed audit must stay within
#[derive(Debug, Clone, PartialEq)]
pub struct GateCriteria {
    /// Highest severity allowed to appear at all
    pub max_severity: Option<Severity>,
    pub max_counts: BTreeMap<Severity, usize>,
    pub max_total: Option<usize>,
    pub min_score: Option<f64>,
}

impl Default for GateCriteria {
    /// Fails on any critical or high finding
    fn default() -> Self {
        Self::from(&GateConfig::default())
    }
}

impl From<&GateConfig> for GateCriteria {
    fn from(config: &GateConfig) -> Self {
        let max_counts = Severity::DESCENDING
            .into_iter()
            .filter_map(|severity| config.max_counts.get(severity).map(|max| (severity, max)))
            .collect();

        Self {
            max_severity: config.max_severity,
            max_counts,
            max_total: config.max_total,
            min_score: config.min_score,
        }
    }
}

/// Which criterion a contract broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCriterion {
    MaxSeverity,
    MaxCount,
    MaxTotal,
    MinScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateViolation {
    pub criterion: GateCriterion,
    pub message: String,
}

/// Pass/fail decision for one completed audit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqgVerdict {
    pub passed: bool,
    pub violations: Vec<GateViolation>,
}

impl GateCriteria {
    pub fn evaluate(&self, result: &AuditResult) -> SqgVerdict {
        let breakdown = result.severity_breakdown();
        let mut violations = Vec::new();

        if let Some(max) = self.max_severity
            && let Some(highest) = breakdown.highest()
            && highest > max
        {
            violations.push(GateViolation {
                criterion: GateCriterion::MaxSeverity,
                message: format!("found {} findings, highest allowed is {}", highest, max),
            });
        }

        // most severe first so messages read in priority order
        for severity in Severity::DESCENDING {
            let Some(&max) = self.max_counts.get(&severity) else {
                continue;
            };
            let count = breakdown.get(severity);
            if count > max {
                violations.push(GateViolation {
                    criterion: GateCriterion::MaxCount,
                    message: format!("{} {} findings, at most {} allowed", count, severity, max),
                });
            }
        }

        if let Some(max) = self.max_total
            && breakdown.total() > max
        {
            violations.push(GateViolation {
                criterion: GateCriterion::MaxTotal,
                message: format!("{} findings in total, at most {} allowed", breakdown.total(), max),
            });
        }

        if let Some(min) = self.min_score {
            match result.score {
                Some(score) if score >= min => {}
                Some(score) => violations.push(GateViolation {
                    criterion: GateCriterion::MinScore,
                    message: format!("audit score {:.1} is below the required {:.1}", score, min),
                }),
                None => violations.push(GateViolation {
                    criterion: GateCriterion::MinScore,
                    message: format!("no audit score reported, {:.1} required", min),
                }),
            }
        }

        SqgVerdict {
            passed: violations.is_empty(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasaudit_core::{Finding, FindingLocation};

    fn finding(severity: Severity) -> Finding {
        Finding {
            rule_id: "rule".into(),
            severity,
            message: "m".into(),
            location: FindingLocation {
                contract_path: "api.yaml".into(),
                pointer: "/paths".into(),
            },
        }
    }

    fn result(severities: &[Severity], score: Option<f64>) -> AuditResult {
        AuditResult {
            findings: severities.iter().copied().map(finding).collect(),
            score,
        }
    }

    #[test]
    fn default_gate_fails_on_high() {
        let verdict = GateCriteria::default().evaluate(&result(&[Severity::High], None));
        assert!(!verdict.passed);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].criterion, GateCriterion::MaxCount);
        assert!(verdict.violations[0].message.contains("1 high"));
    }

    #[test]
    fn default_gate_tolerates_medium_and_below() {
        let verdict = GateCriteria::default().evaluate(&result(
            &[Severity::Medium, Severity::Low, Severity::Info],
            None,
        ));
        assert!(verdict.passed);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn empty_result_passes_default_gate() {
        assert!(GateCriteria::default().evaluate(&result(&[], None)).passed);
    }

    #[test]
    fn max_severity_and_total() {
        let criteria = GateCriteria {
            max_severity: Some(Severity::Low),
            max_counts: BTreeMap::new(),
            max_total: Some(1),
            min_score: None,
        };
        let verdict = criteria.evaluate(&result(&[Severity::Medium, Severity::Low], None));
        let criteria: Vec<_> = verdict.violations.iter().map(|v| v.criterion).collect();
        assert_eq!(criteria, vec![GateCriterion::MaxSeverity, GateCriterion::MaxTotal]);
    }

    #[test]
    fn min_score_requires_a_score() {
        let criteria = GateCriteria {
            max_severity: None,
            max_counts: BTreeMap::new(),
            max_total: None,
            min_score: Some(70.0),
        };
        assert!(criteria.evaluate(&result(&[], Some(85.0))).passed);
        assert!(!criteria.evaluate(&result(&[], Some(40.0))).passed);
        assert!(!criteria.evaluate(&result(&[], None)).passed);
    }

    #[test]
    fn criteria_from_config_keeps_only_set_counts() {
        let criteria = GateCriteria::from(&GateConfig::default());
        assert_eq!(criteria.max_counts.len(), 2);
        assert_eq!(criteria.max_counts.get(&Severity::Critical), Some(&0));
        assert_eq!(criteria.max_counts.get(&Severity::High), Some(&0));
    }
}
