//! Core types for quality-gate evaluation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named gate policy - a fixed set of numeric thresholds
///
/// Immutable once registered under a name; re-registration replaces it
/// wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Minimum acceptable confidence score (0.0-1.0)
    pub min_confidence: f64,

    /// Maximum acceptable resolution latency in milliseconds
    pub max_resolution_time_ms: f64,

    /// Minimum acceptable weighted validation score (0.0-1.0)
    pub min_validation_score: f64,

    /// Minimum number of locator strategies that must have been used
    pub required_strategies: u32,

    /// Maximum number of violations a passing result may carry
    pub max_violations: usize,
}

impl GatePolicy {
    /// Replace the confidence threshold (used for adaptive gates)
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

/// Violation kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Confidence score below the gate threshold
    LowConfidence,

    /// Resolution latency above the gate threshold
    SlowResolution,

    /// Weighted validation score below the gate threshold
    ValidationFailed,

    /// Fewer locator strategies used than the gate requires
    InsufficientStrategies,
}

impl ViolationKind {
    /// Get violation kind name as string
    pub fn name(&self) -> &'static str {
        match self {
            ViolationKind::LowConfidence => "low_confidence",
            ViolationKind::SlowResolution => "slow_resolution",
            ViolationKind::ValidationFailed => "validation_failed",
            ViolationKind::InsufficientStrategies => "insufficient_strategies",
        }
    }
}

/// Violation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Tolerated up to the gate's violation budget
    Warning,

    /// Fails the evaluation outright
    Error,
}

impl Severity {
    /// Get severity name as string
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Single threshold breach detected during one evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Which threshold was breached
    pub kind: ViolationKind,

    /// Observed value
    pub actual: f64,

    /// Threshold the gate required
    pub required: f64,

    /// Severity of the breach
    pub severity: Severity,
}

impl Violation {
    /// Create a new violation
    pub fn new(kind: ViolationKind, actual: f64, required: f64, severity: Severity) -> Self {
        Self {
            kind,
            actual,
            required,
            severity,
        }
    }

    /// Human-readable recommendation for addressing this violation
    pub fn recommendation(&self) -> String {
        match self.kind {
            ViolationKind::LowConfidence => format!(
                "Improve selector confidence from {:.2} to at least {:.2}",
                self.actual, self.required
            ),
            ViolationKind::SlowResolution => format!(
                "Reduce resolution time from {:.0}ms to under {:.0}ms",
                self.actual, self.required
            ),
            ViolationKind::ValidationFailed => format!(
                "Strengthen content validation: score {:.2} is below required {:.2}",
                self.actual, self.required
            ),
            ViolationKind::InsufficientStrategies => format!(
                "Increase locator strategy coverage from {:.0} to {:.0}",
                self.actual, self.required
            ),
        }
    }
}

/// Weighted validation outcome reported by the resolver
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Rule score (0.0-1.0)
    pub score: f64,

    /// Rule weight
    pub weight: f64,
}

/// Resolution outcome returned by the external selector resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Resolver-reported confidence score (0.0-1.0)
    pub confidence_score: f64,

    /// Resolution latency in milliseconds
    pub resolution_time_ms: f64,

    /// Weighted validation outcomes for the resolved content
    pub validation_results: Vec<ValidationOutcome>,

    /// Number of locator strategies the resolver applied
    pub strategies_used: u32,
}

impl ResolutionOutcome {
    /// Weighted mean of the validation outcomes
    ///
    /// Returns 0.0 when no outcomes were reported or all weights are zero.
    pub fn validation_score(&self) -> f64 {
        let total_weight: f64 = self.validation_results.iter().map(|v| v.weight).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .validation_results
            .iter()
            .map(|v| v.score * v.weight)
            .sum();
        weighted / total_weight
    }
}

/// Document context handed through to the resolver
///
/// Opaque to the gate engine; carried so the resolver can scope its matching.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    /// Current document URL
    pub url: Option<String>,

    /// Current document title
    pub title: Option<String>,

    /// Custom signals (extensible)
    pub signals: HashMap<String, serde_json::Value>,
}

impl DocumentContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a custom signal
    pub fn add_signal(&mut self, key: String, value: serde_json::Value) {
        self.signals.insert(key, value);
    }
}

/// Outcome of a single quality-gate evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityGateResult {
    /// Selector that was evaluated
    pub selector_name: String,

    /// Gate the evaluation was judged against
    pub gate_name: String,

    /// Whether the result passed the gate
    pub passed: bool,

    /// Resolver-reported confidence score
    pub confidence_score: f64,

    /// Resolution latency in milliseconds
    pub resolution_time_ms: f64,

    /// Weighted validation score
    pub validation_score: f64,

    /// Number of locator strategies used
    pub strategies_used: u32,

    /// Threshold breaches detected in this evaluation
    pub violations: Vec<Violation>,

    /// One recommendation per violation
    pub recommendations: Vec<String>,

    /// Evaluation timestamp
    pub evaluated_at: DateTime<Utc>,
}

/// Trend direction over the recent evaluation window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    /// Recent confidence clearly above the preceding window
    Improving,

    /// Recent confidence clearly below the preceding window
    Declining,

    /// No clear movement either way
    #[default]
    Stable,
}

impl TrendDirection {
    /// Get trend direction name as string
    pub fn name(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        }
    }
}

/// Rolling quality metrics for one selector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Selector these metrics belong to
    pub selector_name: String,

    /// Total evaluations recorded
    pub total_evaluations: u64,

    /// Fraction of recorded evaluations that passed
    pub pass_rate: f64,

    /// Running mean confidence score
    pub average_confidence: f64,

    /// Running mean resolution latency in milliseconds
    pub average_resolution_time_ms: f64,

    /// Running mean validation score
    pub average_validation_score: f64,

    /// Timestamp of the most recent evaluation
    pub last_evaluation: Option<DateTime<Utc>>,

    /// Timestamp of the most recent failed evaluation
    pub last_violation: Option<DateTime<Utc>>,

    /// Number of failed evaluations recorded
    pub violation_count: u64,

    /// Detected confidence trend
    pub trend_direction: TrendDirection,

    /// Confidence in the detected trend (0.0-1.0)
    pub trend_confidence: f64,
}

impl QualityMetrics {
    /// Create zero-valued metrics for a selector
    pub fn empty(selector_name: impl Into<String>) -> Self {
        Self {
            selector_name: selector_name.into(),
            total_evaluations: 0,
            pass_rate: 0.0,
            average_confidence: 0.0,
            average_resolution_time_ms: 0.0,
            average_validation_score: 0.0,
            last_evaluation: None,
            last_violation: None,
            violation_count: 0,
            trend_direction: TrendDirection::Stable,
            trend_confidence: 0.0,
        }
    }
}

/// Alert record produced from one violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAlert {
    /// Selector the violation occurred on
    pub selector_name: String,

    /// Violation kind that triggered the alert
    pub issue_type: ViolationKind,

    /// Severity of the underlying violation
    pub severity: Severity,

    /// Formatted alert message
    pub message: String,

    /// Structured violation details
    pub details: serde_json::Value,

    /// Alert creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Gate the evaluation ran under
    pub gate_name: String,
}

/// One historical performance sample supplied to adaptive evaluation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Confidence score observed
    pub confidence: f64,

    /// Resolution latency observed in milliseconds
    pub resolution_time_ms: f64,

    /// Whether the evaluation passed
    pub success: bool,
}

/// Aggregate view over a performance history
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Mean confidence over the history
    pub average_confidence: f64,

    /// Mean resolution latency over the history
    pub average_resolution_time_ms: f64,

    /// Fraction of successful samples
    pub success_rate: f64,
}

impl PerformanceSummary {
    /// Summarize a non-empty history
    ///
    /// Returns `None` for an empty history so callers fail fast instead of
    /// producing NaN.
    pub fn from_history(history: &[PerformanceSample]) -> Option<Self> {
        if history.is_empty() {
            return None;
        }
        let n = history.len() as f64;
        Some(Self {
            average_confidence: history.iter().map(|s| s.confidence).sum::<f64>() / n,
            average_resolution_time_ms: history.iter().map(|s| s.resolution_time_ms).sum::<f64>()
                / n,
            success_rate: history.iter().filter(|s| s.success).count() as f64 / n,
        })
    }
}

/// Outcome of an adaptive-threshold evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveQualityResult {
    /// Selector that was evaluated
    pub selector_name: String,

    /// Threshold before adaptation
    pub original_threshold: f64,

    /// Threshold after adaptation
    pub adapted_threshold: f64,

    /// Human-readable reason for the adjustment
    pub adaptation_reason: String,

    /// Confidence in the adaptation (0.0-1.0, scales with history size)
    pub adaptation_confidence: f64,

    /// Aggregates over the supplied history
    pub performance: PerformanceSummary,

    /// Whether the underlying evaluation passed
    pub passed: bool,
}
