//! oasaudit orchestrator - audit dispatch, quality gate and reports
//!
//! ```text
//! DiscoveryReport ──► enrich ──► AuditDispatcher ──► GateCriteria ──► ReportEmitter
//!                                   │    ▲
//!                                   ▼    │
//!                             AuditBackend + QuotaState
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

/// Tool name used in reports and code-scanning uploads
pub const TOOL_NAME: &str = "oasaudit";

pub use application::dispatcher::{AuditDispatcher, DispatchOutcome};
pub use application::gate::{GateCriteria, GateCriterion, GateViolation, SqgVerdict};
pub use application::pipeline::{
    AuditPipeline, PipelineError, RunOutcome, RunStatus, load_quota, preflight, resolve_target,
};
pub use application::reporting::{
    AuditRun, ContractOutcome, EmittedReports, ReportEmitter, ReportError, RunSummary,
};
pub use domain::{
    AuditErrorKind, AuditFailure, AuditJob, AuditResult, AuditStatus, RepoKey,
};
pub use infrastructure::backend::{
    AuditBackend, AuditRequest, AuditResponse, BackendError, HttpAuditBackend, QuotaSnapshot,
};
pub use infrastructure::code_scanning::{CodeScanningUploader, UploadError};
pub use infrastructure::quota::{
    Clock, FixedClock, QuotaDenial, QuotaLimits, QuotaReservation, QuotaState, QuotaStatus,
    SystemClock,
};
pub use infrastructure::resilience::{RetryDecision, RetryOutcome, RetryPolicy, retry_with_policy};
