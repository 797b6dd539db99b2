//! Adaptive-threshold evaluation
//!
//! Wraps the evaluator with a confidence threshold supplied by the external
//! threshold manager, derived from a caller-supplied performance history.
//! The engine never computes the adapted threshold itself; it records the
//! adjustment (with a human-readable reason) back into the collaborator and
//! evaluates under the "adaptive" gate.

use std::sync::Arc;

use tracing::debug;

use crate::config::DEFAULT_GATE;
use crate::errors::QualityError;
use crate::evaluator::QualityGateEvaluator;
use crate::ports::ThresholdManager;
use crate::types::{
    AdaptiveQualityResult, DocumentContext, PerformanceSample, PerformanceSummary,
};

/// Gate name evaluated under the adapted threshold
pub const ADAPTIVE_GATE: &str = "adaptive";

/// History size above which adaptation is considered data-backed
const HISTORY_CONFIDENT_LEN: usize = 10;

/// History size at which adaptation confidence saturates
const HISTORY_SATURATION_LEN: usize = 50;

/// Adaptive evaluator over a shared quality-gate evaluator
pub struct AdaptiveEvaluator {
    evaluator: Arc<QualityGateEvaluator>,
    thresholds: Arc<dyn ThresholdManager>,
}

impl AdaptiveEvaluator {
    /// Create an adaptive evaluator
    pub fn new(evaluator: Arc<QualityGateEvaluator>, thresholds: Arc<dyn ThresholdManager>) -> Self {
        Self {
            evaluator,
            thresholds,
        }
    }

    /// Evaluate one selector under a history-adapted threshold
    ///
    /// Fails fast on an empty history rather than producing NaN aggregates.
    pub async fn evaluate_adaptive(
        &self,
        selector: &str,
        context: &DocumentContext,
        history: &[PerformanceSample],
    ) -> Result<AdaptiveQualityResult, QualityError> {
        let summary =
            PerformanceSummary::from_history(history).ok_or(QualityError::EmptyHistory)?;

        let original_threshold = self.thresholds.threshold(DEFAULT_GATE)?;
        let adapted_threshold = self
            .thresholds
            .adaptive_threshold(ADAPTIVE_GATE, history)?;

        let reason =
            adaptation_reason(original_threshold, adapted_threshold, history.len(), &summary);
        self.thresholds
            .set_custom_threshold(ADAPTIVE_GATE, adapted_threshold, &reason)?;

        // The evaluator judges against registry policies, so the adapted
        // threshold is installed as the "adaptive" gate before evaluating.
        let adaptive_policy = self
            .evaluator
            .registry()
            .policy(DEFAULT_GATE)
            .with_min_confidence(adapted_threshold.clamp(0.0, 1.0));
        self.evaluator
            .registry()
            .register(ADAPTIVE_GATE, adaptive_policy)?;

        debug!(
            selector,
            original = original_threshold,
            adapted = adapted_threshold,
            reason = %reason,
            "evaluating under adapted threshold"
        );

        let result = self
            .evaluator
            .evaluate(selector, context, ADAPTIVE_GATE)
            .await?;

        Ok(AdaptiveQualityResult {
            selector_name: selector.to_string(),
            original_threshold,
            adapted_threshold,
            adaptation_reason: reason,
            adaptation_confidence: (history.len() as f64 / HISTORY_SATURATION_LEN as f64).min(1.0),
            performance: summary,
            passed: result.passed,
        })
    }
}

fn adaptation_reason(
    original: f64,
    adapted: f64,
    history_len: usize,
    summary: &PerformanceSummary,
) -> String {
    if adapted < original {
        if history_len >= HISTORY_CONFIDENT_LEN {
            if summary.success_rate > 0.9 && summary.average_confidence > 0.85 {
                "High performance - relaxing threshold".to_string()
            } else if summary.average_confidence > 0.8 {
                "Good confidence - moderate relaxation".to_string()
            } else {
                "Performance-based adjustment".to_string()
            }
        } else {
            "Insufficient data - conservative adjustment".to_string()
        }
    } else {
        "Performance concerns - tightening threshold".to_string()
    }
}
