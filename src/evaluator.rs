//! Quality-gate evaluator
//!
//! Orchestrates one evaluation: resolve the selector through the external
//! resolver, judge the outcome against a gate policy, record metrics,
//! dispatch violation alerts, emit a domain event and return the result.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::alerts::AlertDispatcher;
use crate::config::GateRegistry;
use crate::errors::QualityError;
use crate::metrics::MetricsStore;
use crate::persistence::MetricsSnapshotStore;
use crate::ports::{EventBus, QualityEvent, SelectorResolver};
use crate::types::{
    DocumentContext, GatePolicy, QualityGateResult, ResolutionOutcome, Severity, Violation,
    ViolationKind,
};

/// Fraction of the confidence threshold below which a confidence violation
/// escalates from warning to error
const CONFIDENCE_ERROR_RATIO: f64 = 0.8;

/// Quality-gate evaluator
///
/// Constructed explicitly by the host and shared by reference; the engine
/// holds no process-wide state.
pub struct QualityGateEvaluator {
    registry: Arc<GateRegistry>,
    resolver: Arc<dyn SelectorResolver>,
    metrics: Arc<MetricsStore>,
    alerts: Arc<AlertDispatcher>,
    events: Arc<dyn EventBus>,
    snapshots: Option<Arc<MetricsSnapshotStore>>,
}

impl QualityGateEvaluator {
    /// Create a new evaluator
    pub fn new(
        registry: Arc<GateRegistry>,
        resolver: Arc<dyn SelectorResolver>,
        metrics: Arc<MetricsStore>,
        alerts: Arc<AlertDispatcher>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            registry,
            resolver,
            metrics,
            alerts,
            events,
            snapshots: None,
        }
    }

    /// Attach a snapshot store for periodic durable persistence
    pub fn with_snapshot_store(mut self, snapshots: Arc<MetricsSnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Gate policy registry
    pub fn registry(&self) -> &Arc<GateRegistry> {
        &self.registry
    }

    /// Metrics store
    pub fn metrics(&self) -> &Arc<MetricsStore> {
        &self.metrics
    }

    /// Alert dispatcher
    pub fn alerts(&self) -> &Arc<AlertDispatcher> {
        &self.alerts
    }

    /// Evaluate one selector against a named gate
    pub async fn evaluate(
        &self,
        selector: &str,
        context: &DocumentContext,
        gate_name: &str,
    ) -> Result<QualityGateResult, QualityError> {
        let policy = self.registry.policy(gate_name);
        debug!(selector, gate = gate_name, "starting quality evaluation");

        let outcome = self
            .resolver
            .resolve(selector, context)
            .await
            .map_err(|err| {
                QualityError::Evaluation(format!(
                    "selector resolution failed for '{selector}': {err}"
                ))
            })?;

        let validation_score = outcome.validation_score();
        let violations = compute_violations(&policy, &outcome, validation_score);
        let passed = violations.len() <= policy.max_violations
            && !violations.iter().any(|v| v.severity == Severity::Error);
        let recommendations = violations.iter().map(Violation::recommendation).collect();

        let result = QualityGateResult {
            selector_name: selector.to_string(),
            gate_name: gate_name.to_string(),
            passed,
            confidence_score: outcome.confidence_score,
            resolution_time_ms: outcome.resolution_time_ms,
            validation_score,
            strategies_used: outcome.strategies_used,
            violations,
            recommendations,
            evaluated_at: Utc::now(),
        };

        info!(
            selector,
            gate = gate_name,
            passed,
            confidence = result.confidence_score,
            violations = result.violations.len(),
            "quality evaluation complete"
        );

        // Metrics update happens under the store lock; alert dispatch and
        // event emission run after it so slow handlers never hold it.
        let record = self.metrics.record(&result);

        if !result.violations.is_empty() {
            self.alerts
                .dispatch(selector, &result.violations, gate_name)
                .await;
        }

        // The due signal is consumed by `record`, so the snapshot is written
        // before event emission can fail the evaluation.
        if record.snapshot_due {
            if let Some(snapshots) = &self.snapshots {
                snapshots.save(&self.metrics);
            }
        }

        self.events
            .publish(QualityEvent::new(
                "quality_evaluated",
                serde_json::json!({
                    "selector": selector,
                    "gate": gate_name,
                    "passed": passed,
                    "confidence": result.confidence_score,
                    "violations": result.violations.len(),
                }),
                "quality-gate-evaluator",
            ))
            .await?;

        Ok(result)
    }
}

/// Judge one resolution outcome against a gate policy
///
/// Every dimension is checked independently; a single evaluation can
/// accumulate up to four violations.
fn compute_violations(
    policy: &GatePolicy,
    outcome: &ResolutionOutcome,
    validation_score: f64,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if outcome.confidence_score < policy.min_confidence {
        let severity = if outcome.confidence_score < CONFIDENCE_ERROR_RATIO * policy.min_confidence
        {
            Severity::Error
        } else {
            Severity::Warning
        };
        violations.push(Violation::new(
            ViolationKind::LowConfidence,
            outcome.confidence_score,
            policy.min_confidence,
            severity,
        ));
    }

    if outcome.resolution_time_ms > policy.max_resolution_time_ms {
        violations.push(Violation::new(
            ViolationKind::SlowResolution,
            outcome.resolution_time_ms,
            policy.max_resolution_time_ms,
            Severity::Warning,
        ));
    }

    if validation_score < policy.min_validation_score {
        violations.push(Violation::new(
            ViolationKind::ValidationFailed,
            validation_score,
            policy.min_validation_score,
            Severity::Error,
        ));
    }

    if outcome.strategies_used < policy.required_strategies {
        violations.push(Violation::new(
            ViolationKind::InsufficientStrategies,
            outcome.strategies_used as f64,
            policy.required_strategies as f64,
            Severity::Warning,
        ));
    }

    violations
}
