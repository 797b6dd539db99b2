//! Aggregate quality reports
//!
//! Rolls the stored evaluation history for one gate up into an overall
//! summary with a per-selector breakdown and generated recommendations.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsStore;
use crate::types::QualityGateResult;

/// Aggregate report for one gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Gate the report covers
    pub gate_name: String,

    /// Distinct selectors evaluated under the gate
    pub selector_count: usize,

    /// Total evaluations covered by the report
    pub total_evaluations: usize,

    /// Overall pass rate across the covered evaluations
    pub pass_rate: f64,

    /// Mean confidence across the covered evaluations
    pub average_confidence: f64,

    /// Mean resolution latency across the covered evaluations
    pub average_resolution_time_ms: f64,

    /// Per-selector breakdown
    pub selectors: BTreeMap<String, SelectorSummary>,

    /// Generated recommendations
    pub recommendations: Vec<String>,

    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
}

/// Per-selector slice of a gate report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSummary {
    /// Evaluations of this selector under the gate
    pub evaluations: usize,

    /// Pass rate for this selector
    pub pass_rate: f64,

    /// Mean confidence for this selector
    pub average_confidence: f64,

    /// Mean resolution latency for this selector
    pub average_resolution_time_ms: f64,

    /// Most recent evaluation of this selector
    pub last_evaluation: DateTime<Utc>,
}

/// Report generator over the metrics store
pub struct QualityReporter {
    metrics: Arc<MetricsStore>,
}

impl QualityReporter {
    /// Create a reporter
    pub fn new(metrics: Arc<MetricsStore>) -> Self {
        Self { metrics }
    }

    /// Generate the aggregate report for one gate
    pub fn generate_report(&self, gate_name: &str) -> QualityReport {
        let results = self.metrics.results_for_gate(gate_name);
        if results.is_empty() {
            return QualityReport {
                gate_name: gate_name.to_string(),
                selector_count: 0,
                total_evaluations: 0,
                pass_rate: 0.0,
                average_confidence: 0.0,
                average_resolution_time_ms: 0.0,
                selectors: BTreeMap::new(),
                recommendations: vec!["No evaluations available for this gate".to_string()],
                generated_at: Utc::now(),
            };
        }

        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let pass_rate = passed as f64 / total as f64;
        let average_confidence =
            results.iter().map(|r| r.confidence_score).sum::<f64>() / total as f64;
        let average_resolution_time_ms =
            results.iter().map(|r| r.resolution_time_ms).sum::<f64>() / total as f64;

        let mut grouped: BTreeMap<String, Vec<&QualityGateResult>> = BTreeMap::new();
        for result in &results {
            grouped
                .entry(result.selector_name.clone())
                .or_default()
                .push(result);
        }
        let selectors = grouped
            .into_iter()
            .map(|(name, group)| (name, summarize(&group)))
            .collect::<BTreeMap<_, _>>();

        let mut recommendations = Vec::new();
        if pass_rate < 0.8 {
            recommendations.push(format!(
                "Overall pass rate ({:.1}%) is below 80%",
                pass_rate * 100.0
            ));
        }
        if average_confidence < 0.7 {
            recommendations.push(format!(
                "Average confidence ({average_confidence:.2}) is below 0.7"
            ));
        }
        if average_resolution_time_ms > 1000.0 {
            recommendations.push(format!(
                "Average resolution time ({average_resolution_time_ms:.0}ms) is above 1000ms"
            ));
        }

        QualityReport {
            gate_name: gate_name.to_string(),
            selector_count: selectors.len(),
            total_evaluations: total,
            pass_rate,
            average_confidence,
            average_resolution_time_ms,
            selectors,
            recommendations,
            generated_at: Utc::now(),
        }
    }
}

fn summarize(group: &[&QualityGateResult]) -> SelectorSummary {
    let n = group.len();
    let passed = group.iter().filter(|r| r.passed).count();
    let last_evaluation = group
        .iter()
        .map(|r| r.evaluated_at)
        .max()
        .expect("summaries are built from non-empty groups");
    SelectorSummary {
        evaluations: n,
        pass_rate: passed as f64 / n as f64,
        average_confidence: group.iter().map(|r| r.confidence_score).sum::<f64>() / n as f64,
        average_resolution_time_ms: group.iter().map(|r| r.resolution_time_ms).sum::<f64>()
            / n as f64,
        last_evaluation,
    }
}
