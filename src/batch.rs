//! Concurrent batch evaluation
//!
//! Fans a list of selectors out through the evaluator, one task per
//! selector. Per-item failures are logged with the offending selector and
//! omitted from the returned list; one failing selector never aborts its
//! siblings.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::evaluator::QualityGateEvaluator;
use crate::types::{DocumentContext, QualityGateResult};

/// Batch runner over a shared evaluator
pub struct BatchRunner {
    evaluator: Arc<QualityGateEvaluator>,
}

impl BatchRunner {
    /// Create a batch runner
    pub fn new(evaluator: Arc<QualityGateEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Evaluate every selector concurrently under one gate
    ///
    /// The returned list may be shorter than the input when individual
    /// evaluations fail; callers compare lengths to detect drops.
    pub async fn evaluate_batch(
        &self,
        selectors: &[String],
        context: &DocumentContext,
        gate_name: &str,
    ) -> Vec<QualityGateResult> {
        let mut tasks = JoinSet::new();
        for selector in selectors {
            let evaluator = self.evaluator.clone();
            let selector = selector.clone();
            let context = context.clone();
            let gate_name = gate_name.to_string();
            tasks.spawn(async move {
                let outcome = evaluator.evaluate(&selector, &context, &gate_name).await;
                (selector, outcome)
            });
        }

        let mut results = Vec::with_capacity(selectors.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(result))) => results.push(result),
                Ok((selector, Err(err))) => {
                    warn!(selector = %selector, "batch evaluation item failed: {err}");
                }
                Err(err) => {
                    warn!("batch evaluation task aborted: {err}");
                }
            }
        }

        debug!(
            requested = selectors.len(),
            returned = results.len(),
            "batch evaluation complete"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertDispatcher;
    use crate::config::GateRegistry;
    use crate::metrics::MetricsStore;
    use crate::ports::{InMemoryEventBus, SelectorResolver};
    use crate::types::{ResolutionOutcome, ValidationOutcome};
    use async_trait::async_trait;

    /// Resolver that fails any selector containing "broken".
    struct PartialResolver;

    #[async_trait]
    impl SelectorResolver for PartialResolver {
        async fn resolve(
            &self,
            selector: &str,
            _context: &DocumentContext,
        ) -> anyhow::Result<ResolutionOutcome> {
            if selector.contains("broken") {
                anyhow::bail!("resolution blew up for {selector}");
            }
            Ok(ResolutionOutcome {
                confidence_score: 0.9,
                resolution_time_ms: 400.0,
                validation_results: vec![ValidationOutcome {
                    score: 0.95,
                    weight: 1.0,
                }],
                strategies_used: 2,
            })
        }
    }

    fn runner() -> BatchRunner {
        let evaluator = QualityGateEvaluator::new(
            Arc::new(GateRegistry::new()),
            Arc::new(PartialResolver),
            Arc::new(MetricsStore::new()),
            Arc::new(AlertDispatcher::new()),
            InMemoryEventBus::new(64),
        );
        BatchRunner::new(Arc::new(evaluator))
    }

    #[tokio::test]
    async fn test_failed_item_is_dropped_not_fatal() {
        let selectors = vec![
            "header".to_string(),
            "broken-widget".to_string(),
            "footer".to_string(),
        ];
        let results = runner()
            .evaluate_batch(&selectors, &DocumentContext::new(), "production")
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.selector_name.contains("broken")));
    }

    #[tokio::test]
    async fn test_empty_batch_returns_empty() {
        let results = runner()
            .evaluate_batch(&[], &DocumentContext::new(), "production")
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_all_items_succeed() {
        let selectors: Vec<String> = (0..8).map(|i| format!("selector-{i}")).collect();
        let results = runner()
            .evaluate_batch(&selectors, &DocumentContext::new(), "production")
            .await;
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.passed));
    }
}
