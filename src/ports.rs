//! Collaborator ports for the gate engine
//!
//! The engine orchestrates evaluation but delegates selector resolution,
//! threshold adaptation, event delivery and alert handling to pluggable
//! collaborators behind these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::QualityError;
use crate::types::{DocumentContext, PerformanceSample, QualityAlert, ResolutionOutcome};

/// External selector resolver
///
/// Turns a selector specification plus document context into a match with a
/// confidence score, latency and weighted validation outcomes. Errors are
/// implementation-defined; the evaluator wraps them preserving the message.
#[async_trait]
pub trait SelectorResolver: Send + Sync {
    /// Resolve a selector within a document context
    async fn resolve(
        &self,
        selector: &str,
        context: &DocumentContext,
    ) -> anyhow::Result<ResolutionOutcome>;
}

/// External threshold manager for adaptive evaluation
///
/// Owns the threshold values; the engine never computes an adaptive
/// threshold itself.
pub trait ThresholdManager: Send + Sync {
    /// Current threshold for a named gate
    fn threshold(&self, gate_name: &str) -> Result<f64, QualityError>;

    /// Threshold adapted from a performance history
    fn adaptive_threshold(
        &self,
        gate_name: &str,
        history: &[PerformanceSample],
    ) -> Result<f64, QualityError>;

    /// Record a custom threshold together with the reason it was chosen
    fn set_custom_threshold(
        &self,
        gate_name: &str,
        value: f64,
        reason: &str,
    ) -> Result<(), QualityError>;
}

/// Domain event published after each evaluation
#[derive(Debug, Clone)]
pub struct QualityEvent {
    /// Event name (e.g. "quality_evaluated")
    pub name: String,

    /// Structured event payload
    pub payload: serde_json::Value,

    /// Component that emitted the event
    pub source: String,

    /// Emission timestamp
    pub timestamp: DateTime<Utc>,
}

impl QualityEvent {
    /// Create a new event stamped with the current time
    pub fn new(name: impl Into<String>, payload: serde_json::Value, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload,
            source: source.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget event bus
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event
    async fn publish(&self, event: QualityEvent) -> Result<(), QualityError>;
}

/// Simple in-memory bus suitable for unit tests and early integration.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<QualityEvent>,
}

impl InMemoryEventBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QualityEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: QualityEvent) -> Result<(), QualityError> {
        // No subscribers is not a failure: delivery is best-effort.
        if self.sender.send(event).is_err() {
            debug!("event dropped (no subscribers)");
        }
        Ok(())
    }
}

/// Pluggable alert handler
///
/// One uniform interface regardless of whether the underlying handler is
/// blocking or non-blocking internally; failures are isolated per handler
/// by the dispatcher.
#[async_trait]
pub trait AlertHandler: Send + Sync {
    /// Handler name used in dispatch failure logs
    fn name(&self) -> &str {
        "alert-handler"
    }

    /// Handle one alert
    async fn handle(&self, alert: &QualityAlert) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryEventBus::new(8);
        let event = QualityEvent::new("quality_evaluated", serde_json::json!({}), "test");
        assert!(bus.publish(event).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InMemoryEventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(QualityEvent::new(
            "quality_evaluated",
            serde_json::json!({"selector": "login-button"}),
            "evaluator",
        ))
        .await
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "quality_evaluated");
        assert_eq!(event.payload["selector"], "login-button");
    }
}
