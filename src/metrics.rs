//! Rolling quality metrics store
//!
//! Keeps one `QualityMetrics` aggregate plus a bounded history ring per
//! selector, updated on every recorded evaluation. All mutation (including
//! the global counter that paces persistence snapshots) is serialized under
//! a single lock; readers always observe a consistent snapshot.

use std::collections::{BTreeMap, HashMap, VecDeque};

use parking_lot::Mutex;

use crate::types::{QualityGateResult, QualityMetrics, TrendDirection};

/// Per-selector history ring capacity
const HISTORY_CAPACITY: usize = 100;

/// Evaluations required before trend detection starts
const TREND_MIN_EVALUATIONS: u64 = 5;

/// Trend window over the most recent history entries
const TREND_WINDOW: usize = 10;

/// Confidence movement required to leave the stable band
const TREND_BAND: f64 = 0.05;

/// Records between durable snapshots (global, across selectors)
const SNAPSHOT_EVERY: u64 = 10;

/// Durable snapshot form: every selector's metrics, keyed by name
pub type MetricsSnapshot = BTreeMap<String, QualityMetrics>;

#[derive(Debug)]
struct SelectorState {
    metrics: QualityMetrics,
    passed_count: u64,
    history: VecDeque<QualityGateResult>,
}

impl SelectorState {
    fn new(selector_name: &str) -> Self {
        Self {
            metrics: QualityMetrics::empty(selector_name),
            passed_count: 0,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    selectors: HashMap<String, SelectorState>,
    recorded_total: u64,
}

/// Outcome of recording one result
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// Updated metrics snapshot for the recorded selector
    pub metrics: QualityMetrics,

    /// Whether a durable snapshot is due (every 10th record overall)
    pub snapshot_due: bool,
}

/// Thread-safe store of per-selector quality metrics
#[derive(Debug, Default)]
pub struct MetricsStore {
    inner: Mutex<Inner>,
}

impl MetricsStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one evaluation result
    pub fn record(&self, result: &QualityGateResult) -> RecordOutcome {
        let mut inner = self.inner.lock();
        inner.recorded_total += 1;
        let snapshot_due = inner.recorded_total % SNAPSHOT_EVERY == 0;

        let state = inner
            .selectors
            .entry(result.selector_name.clone())
            .or_insert_with(|| SelectorState::new(&result.selector_name));

        let metrics = &mut state.metrics;
        metrics.total_evaluations += 1;
        let n = metrics.total_evaluations as f64;

        if metrics.total_evaluations == 1 {
            metrics.average_confidence = result.confidence_score;
            metrics.average_resolution_time_ms = result.resolution_time_ms;
            metrics.average_validation_score = result.validation_score;
        } else {
            metrics.average_confidence =
                (metrics.average_confidence * (n - 1.0) + result.confidence_score) / n;
            metrics.average_resolution_time_ms =
                (metrics.average_resolution_time_ms * (n - 1.0) + result.resolution_time_ms) / n;
            metrics.average_validation_score =
                (metrics.average_validation_score * (n - 1.0) + result.validation_score) / n;
        }

        if result.passed {
            state.passed_count += 1;
        } else {
            metrics.violation_count += 1;
            metrics.last_violation = Some(result.evaluated_at);
        }
        metrics.pass_rate = state.passed_count as f64 / n;
        metrics.last_evaluation = Some(result.evaluated_at);

        state.history.push_back(result.clone());
        if state.history.len() > HISTORY_CAPACITY {
            state.history.pop_front();
        }

        if state.metrics.total_evaluations >= TREND_MIN_EVALUATIONS {
            let (direction, confidence) = detect_trend(&state.history);
            state.metrics.trend_direction = direction;
            state.metrics.trend_confidence = confidence;
        }

        RecordOutcome {
            metrics: state.metrics.clone(),
            snapshot_due,
        }
    }

    /// Metrics snapshot for one selector
    ///
    /// Selectors that were never recorded yield a zero-valued snapshot; the
    /// read has no counter side effects.
    pub fn get(&self, selector_name: &str) -> QualityMetrics {
        self.inner
            .lock()
            .selectors
            .get(selector_name)
            .map(|state| state.metrics.clone())
            .unwrap_or_else(|| QualityMetrics::empty(selector_name))
    }

    /// Metrics snapshots for every recorded selector
    pub fn all(&self) -> Vec<QualityMetrics> {
        self.inner
            .lock()
            .selectors
            .values()
            .map(|state| state.metrics.clone())
            .collect()
    }

    /// Recent results recorded under a gate, across all selectors
    pub fn results_for_gate(&self, gate_name: &str) -> Vec<QualityGateResult> {
        self.inner
            .lock()
            .selectors
            .values()
            .flat_map(|state| state.history.iter())
            .filter(|result| result.gate_name == gate_name)
            .cloned()
            .collect()
    }

    /// Total results recorded across all selectors
    pub fn recorded_total(&self) -> u64 {
        self.inner.lock().recorded_total
    }

    /// Consistent snapshot of every selector's metrics for persistence
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .selectors
            .iter()
            .map(|(name, state)| (name.clone(), state.metrics.clone()))
            .collect()
    }

    /// Restore metrics from a durable snapshot
    ///
    /// History rings start empty after a restore; trend detection resumes
    /// once enough fresh evaluations accumulate.
    pub fn restore(&self, snapshot: MetricsSnapshot) {
        let mut inner = self.inner.lock();
        for (name, metrics) in snapshot {
            let passed_count =
                (metrics.pass_rate * metrics.total_evaluations as f64).round() as u64;
            let mut state = SelectorState::new(&name);
            state.metrics = metrics;
            state.passed_count = passed_count;
            inner.selectors.insert(name, state);
        }
    }
}

/// Compare the mean confidence of the most recent three entries against the
/// three immediately preceding them inside the trend window.
fn detect_trend(history: &VecDeque<QualityGateResult>) -> (TrendDirection, f64) {
    let window_len = history.len().min(TREND_WINDOW);
    if window_len < 3 {
        return (TrendDirection::Stable, 0.0);
    }
    let window: Vec<f64> = history
        .iter()
        .skip(history.len() - window_len)
        .map(|result| result.confidence_score)
        .collect();

    let recent = mean(&window[window_len - 3..]);
    let older = if window_len >= 6 {
        mean(&window[window_len - 6..window_len - 3])
    } else {
        // Not enough entries for a distinct comparison window: no signal.
        recent
    };

    let direction = if recent - older > TREND_BAND {
        TrendDirection::Improving
    } else if older - recent > TREND_BAND {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };
    let confidence = (window_len as f64 / TREND_WINDOW as f64).min(1.0);
    (direction, confidence)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(selector: &str, confidence: f64, passed: bool) -> QualityGateResult {
        QualityGateResult {
            selector_name: selector.to_string(),
            gate_name: "production".to_string(),
            passed,
            confidence_score: confidence,
            resolution_time_ms: 500.0,
            validation_score: 0.9,
            strategies_used: 2,
            violations: Vec::new(),
            recommendations: Vec::new(),
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_before_record_is_zero_valued() {
        let store = MetricsStore::new();
        let metrics = store.get("login-button");
        assert_eq!(metrics.total_evaluations, 0);
        assert_eq!(metrics.pass_rate, 0.0);
        assert_eq!(store.recorded_total(), 0);
        // Reading again still sees zero: get has no side effects.
        assert_eq!(store.get("login-button").total_evaluations, 0);
    }

    #[test]
    fn test_incremental_mean() {
        let store = MetricsStore::new();
        for confidence in [0.9, 0.7, 0.8] {
            store.record(&result("search-box", confidence, true));
        }
        let metrics = store.get("search-box");
        assert_eq!(metrics.total_evaluations, 3);
        assert!((metrics.average_confidence - 0.8).abs() < 1e-9);
        assert!((metrics.pass_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pass_rate_and_violation_bookkeeping() {
        let store = MetricsStore::new();
        store.record(&result("nav-link", 0.9, true));
        store.record(&result("nav-link", 0.4, false));
        let metrics = store.get("nav-link");
        assert!((metrics.pass_rate - 0.5).abs() < 1e-9);
        assert_eq!(metrics.violation_count, 1);
        assert!(metrics.last_violation.is_some());
    }

    #[test]
    fn test_trend_improving() {
        let store = MetricsStore::new();
        for confidence in [0.5, 0.5, 0.5, 0.9, 0.9, 0.9] {
            store.record(&result("cta", confidence, true));
        }
        let metrics = store.get("cta");
        assert_eq!(metrics.trend_direction, TrendDirection::Improving);
        assert!((metrics.trend_confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_trend_declining() {
        let store = MetricsStore::new();
        for confidence in [0.9, 0.9, 0.9, 0.5, 0.5, 0.5] {
            store.record(&result("cta", confidence, true));
        }
        assert_eq!(store.get("cta").trend_direction, TrendDirection::Declining);
    }

    #[test]
    fn test_trend_needs_five_evaluations() {
        let store = MetricsStore::new();
        for confidence in [0.2, 0.2, 0.9, 0.9] {
            store.record(&result("cta", confidence, true));
        }
        assert_eq!(store.get("cta").trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn test_snapshot_due_every_tenth_record() {
        let store = MetricsStore::new();
        let mut due_at = Vec::new();
        for i in 0..20 {
            let outcome = store.record(&result(&format!("s{}", i % 3), 0.9, true));
            if outcome.snapshot_due {
                due_at.push(i + 1);
            }
        }
        assert_eq!(due_at, vec![10, 20]);
    }

    #[test]
    fn test_history_ring_is_bounded() {
        let store = MetricsStore::new();
        for _ in 0..(HISTORY_CAPACITY + 20) {
            store.record(&result("hot-selector", 0.9, true));
        }
        let results = store.results_for_gate("production");
        assert_eq!(results.len(), HISTORY_CAPACITY);
        // The aggregate keeps counting past the ring.
        assert_eq!(
            store.get("hot-selector").total_evaluations,
            (HISTORY_CAPACITY + 20) as u64
        );
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let store = MetricsStore::new();
        store.record(&result("a", 0.9, true));
        store.record(&result("a", 0.5, false));
        let snapshot = store.snapshot();

        let restored = MetricsStore::new();
        restored.restore(snapshot);
        let metrics = restored.get("a");
        assert_eq!(metrics.total_evaluations, 2);
        assert!((metrics.pass_rate - 0.5).abs() < 1e-9);
        assert_eq!(metrics.violation_count, 1);
    }
}
