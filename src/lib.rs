//! Quality-gate and adaptive-threshold evaluation engine
//!
//! Sits above a pluggable selector resolver and decides, per named gate
//! policy, whether a resolution result is acceptable. The engine:
//! - judges each resolution against a gate's thresholds (confidence,
//!   latency, validation score, strategy count)
//! - tracks rolling per-selector quality metrics with trend detection
//! - fans violation alerts out to pluggable handlers, best-effort
//! - evaluates batches with per-item failure isolation
//! - adapts thresholds from historical performance via an external
//!   threshold manager
//! - produces aggregate per-gate reports and periodic durable snapshots
//!
//! The host constructs the engine explicitly and passes it by reference;
//! there is no process-wide state.

pub mod adaptive;
pub mod alerts;
pub mod batch;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod metrics;
pub mod persistence;
pub mod ports;
pub mod report;
pub mod types;

pub use adaptive::{AdaptiveEvaluator, ADAPTIVE_GATE};
pub use alerts::AlertDispatcher;
pub use batch::BatchRunner;
pub use config::{GateRegistry, DEFAULT_GATE};
pub use errors::QualityError;
pub use evaluator::QualityGateEvaluator;
pub use metrics::{MetricsSnapshot, MetricsStore, RecordOutcome};
pub use persistence::MetricsSnapshotStore;
pub use ports::{
    AlertHandler, EventBus, InMemoryEventBus, QualityEvent, SelectorResolver, ThresholdManager,
};
pub use report::{QualityReport, QualityReporter, SelectorSummary};
pub use types::{
    AdaptiveQualityResult, DocumentContext, GatePolicy, PerformanceSample, PerformanceSummary,
    QualityAlert, QualityGateResult, QualityMetrics, ResolutionOutcome, Severity, TrendDirection,
    ValidationOutcome, Violation, ViolationKind,
};
