//! End-to-end flow through the public API: evaluation, metrics, alerts,
//! reporting, batch isolation and periodic persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use selector_gate::{
    AdaptiveEvaluator, AlertDispatcher, AlertHandler, BatchRunner, DocumentContext, GateRegistry,
    InMemoryEventBus, MetricsSnapshotStore, MetricsStore, PerformanceSample, QualityAlert,
    QualityGateEvaluator, QualityReporter, ResolutionOutcome, SelectorResolver, Severity,
    ThresholdManager, TrendDirection, ValidationOutcome, ViolationKind,
};

/// Resolver scripted per selector; selectors containing "broken" fail.
struct ScriptedResolver {
    outcomes: Mutex<HashMap<String, ResolutionOutcome>>,
}

impl ScriptedResolver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(HashMap::new()),
        })
    }

    fn script(&self, selector: &str, confidence: f64, time_ms: f64) {
        self.outcomes.lock().insert(
            selector.to_string(),
            ResolutionOutcome {
                confidence_score: confidence,
                resolution_time_ms: time_ms,
                validation_results: vec![ValidationOutcome {
                    score: 0.95,
                    weight: 1.0,
                }],
                strategies_used: 2,
            },
        );
    }
}

#[async_trait]
impl SelectorResolver for ScriptedResolver {
    async fn resolve(
        &self,
        selector: &str,
        _context: &DocumentContext,
    ) -> anyhow::Result<ResolutionOutcome> {
        if selector.contains("broken") {
            anyhow::bail!("resolver crashed on {selector}");
        }
        self.outcomes
            .lock()
            .get(selector)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("element not found: {selector}"))
    }
}

struct RecordingHandler {
    alerts: Mutex<Vec<QualityAlert>>,
}

#[async_trait]
impl AlertHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording"
    }

    async fn handle(&self, alert: &QualityAlert) -> anyhow::Result<()> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}

struct FixedThresholds;

impl ThresholdManager for FixedThresholds {
    fn threshold(&self, _gate_name: &str) -> Result<f64, selector_gate::QualityError> {
        Ok(0.85)
    }

    fn adaptive_threshold(
        &self,
        _gate_name: &str,
        _history: &[PerformanceSample],
    ) -> Result<f64, selector_gate::QualityError> {
        Ok(0.65)
    }

    fn set_custom_threshold(
        &self,
        _gate_name: &str,
        _value: f64,
        _reason: &str,
    ) -> Result<(), selector_gate::QualityError> {
        Ok(())
    }
}

fn engine(resolver: Arc<ScriptedResolver>) -> Arc<QualityGateEvaluator> {
    Arc::new(QualityGateEvaluator::new(
        Arc::new(GateRegistry::new()),
        resolver,
        Arc::new(MetricsStore::new()),
        Arc::new(AlertDispatcher::new()),
        InMemoryEventBus::new(64),
    ))
}

#[tokio::test]
async fn evaluation_flows_into_metrics_alerts_and_report() {
    let resolver = ScriptedResolver::new();
    resolver.script("login-button", 0.9, 800.0);
    resolver.script("flaky-banner", 0.5, 800.0);

    let evaluator = engine(resolver);
    let handler = Arc::new(RecordingHandler {
        alerts: Mutex::new(Vec::new()),
    });
    evaluator.alerts().register_handler(handler.clone());

    let good = evaluator
        .evaluate("login-button", &DocumentContext::new(), "production")
        .await
        .unwrap();
    assert!(good.passed);
    assert!(good.violations.is_empty());

    let bad = evaluator
        .evaluate("flaky-banner", &DocumentContext::new(), "production")
        .await
        .unwrap();
    assert!(!bad.passed);
    assert_eq!(bad.violations[0].kind, ViolationKind::LowConfidence);
    assert_eq!(bad.violations[0].severity, Severity::Error);
    assert_eq!(bad.recommendations.len(), 1);

    // Handler observed exactly the one violation alert.
    let seen = handler.alerts.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].selector_name, "flaky-banner");

    // Metrics reflect both evaluations.
    assert_eq!(evaluator.metrics().get("login-button").total_evaluations, 1);
    assert_eq!(evaluator.metrics().get("flaky-banner").violation_count, 1);

    // Report covers both selectors under the gate.
    let report = QualityReporter::new(evaluator.metrics().clone()).generate_report("production");
    assert_eq!(report.selector_count, 2);
    assert_eq!(report.total_evaluations, 2);
    assert!((report.pass_rate - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn batch_isolates_failures() {
    let resolver = ScriptedResolver::new();
    resolver.script("header", 0.9, 400.0);
    resolver.script("footer", 0.9, 400.0);

    let evaluator = engine(resolver);
    let runner = BatchRunner::new(evaluator.clone());
    let selectors = vec![
        "header".to_string(),
        "broken-widget".to_string(),
        "footer".to_string(),
    ];
    let results = runner
        .evaluate_batch(&selectors, &DocumentContext::new(), "production")
        .await;
    assert_eq!(results.len(), 2);
    // The failed selector left no metrics behind.
    assert_eq!(evaluator.metrics().get("broken-widget").total_evaluations, 0);
}

#[tokio::test]
async fn trend_emerges_from_repeated_evaluations() {
    let resolver = ScriptedResolver::new();
    let evaluator = engine(resolver.clone());

    for confidence in [0.5, 0.5, 0.5, 0.9, 0.9, 0.9] {
        resolver.script("warming-up", confidence, 400.0);
        evaluator
            .evaluate("warming-up", &DocumentContext::new(), "testing")
            .await
            .unwrap();
    }
    let metrics = evaluator.metrics().get("warming-up");
    assert_eq!(metrics.trend_direction, TrendDirection::Improving);
    assert_eq!(metrics.total_evaluations, 6);
}

#[tokio::test]
async fn every_tenth_evaluation_persists_a_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("metrics.json");

    let resolver = ScriptedResolver::new();
    resolver.script("steady", 0.9, 400.0);

    let evaluator = Arc::new(
        QualityGateEvaluator::new(
            Arc::new(GateRegistry::new()),
            resolver,
            Arc::new(MetricsStore::new()),
            Arc::new(AlertDispatcher::new()),
            InMemoryEventBus::new(64),
        )
        .with_snapshot_store(Arc::new(MetricsSnapshotStore::new(&snapshot_path))),
    );

    for _ in 0..9 {
        evaluator
            .evaluate("steady", &DocumentContext::new(), "production")
            .await
            .unwrap();
    }
    assert!(!snapshot_path.exists(), "snapshot written before the 10th record");

    evaluator
        .evaluate("steady", &DocumentContext::new(), "production")
        .await
        .unwrap();
    assert!(snapshot_path.exists(), "10th record should trigger a snapshot");

    // A fresh store restores the persisted aggregates.
    let restored = MetricsStore::new();
    MetricsSnapshotStore::new(&snapshot_path).load(&restored);
    assert_eq!(restored.get("steady").total_evaluations, 10);
}

#[tokio::test]
async fn adaptive_evaluation_relaxes_the_gate() {
    let resolver = ScriptedResolver::new();
    // Fails production (0.85) but clears the adapted threshold (0.65).
    resolver.script("seasoned", 0.7, 400.0);

    let evaluator = engine(resolver);
    let adaptive = AdaptiveEvaluator::new(evaluator, Arc::new(FixedThresholds));
    let history: Vec<PerformanceSample> = (0..20)
        .map(|_| PerformanceSample {
            confidence: 0.92,
            resolution_time_ms: 300.0,
            success: true,
        })
        .collect();

    let result = adaptive
        .evaluate_adaptive("seasoned", &DocumentContext::new(), &history)
        .await
        .unwrap();
    assert!(result.passed);
    assert_eq!(
        result.adaptation_reason,
        "High performance - relaxing threshold"
    );
    assert!((result.adaptation_confidence - 0.4).abs() < 1e-9);
}
