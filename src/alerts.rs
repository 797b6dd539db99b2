//! Alert dispatch for policy violations
//!
//! Converts violations into alert records and fans them out to the
//! registered handlers. Dispatch is best-effort: a failing handler is
//! logged and never interrupts the remaining handlers or violations, and
//! nothing propagates back to the evaluation.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::ports::AlertHandler;
use crate::types::{QualityAlert, Violation};

/// In-memory alert log capacity
const ALERT_LOG_CAPACITY: usize = 200;

/// Violation alert dispatcher
#[derive(Default)]
pub struct AlertDispatcher {
    handlers: RwLock<Vec<Arc<dyn AlertHandler>>>,
    log: Mutex<Vec<QualityAlert>>,
}

impl AlertDispatcher {
    /// Create a dispatcher with no handlers registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; handlers run in registration order
    pub fn register_handler(&self, handler: Arc<dyn AlertHandler>) {
        self.handlers.write().push(handler);
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Build and deliver one alert per violation
    pub async fn dispatch(&self, selector_name: &str, violations: &[Violation], gate_name: &str) {
        let handlers: Vec<Arc<dyn AlertHandler>> = self.handlers.read().clone();

        for violation in violations {
            let alert = build_alert(selector_name, violation, gate_name);
            self.append_to_log(alert.clone());

            for handler in &handlers {
                if let Err(err) = handler.handle(&alert).await {
                    warn!(
                        handler = handler.name(),
                        selector = selector_name,
                        kind = violation.kind.name(),
                        "alert handler failed: {err}"
                    );
                }
            }
        }

        debug!(
            selector = selector_name,
            gate = gate_name,
            count = violations.len(),
            "dispatched violation alerts"
        );
    }

    /// Most recent alerts, newest last
    pub fn recent_alerts(&self, limit: usize) -> Vec<QualityAlert> {
        let log = self.log.lock();
        let start = log.len().saturating_sub(limit);
        log[start..].to_vec()
    }

    fn append_to_log(&self, alert: QualityAlert) {
        let mut log = self.log.lock();
        log.push(alert);
        let len = log.len();
        if len > ALERT_LOG_CAPACITY {
            log.drain(0..len - ALERT_LOG_CAPACITY);
        }
    }
}

fn build_alert(selector_name: &str, violation: &Violation, gate_name: &str) -> QualityAlert {
    QualityAlert {
        selector_name: selector_name.to_string(),
        issue_type: violation.kind,
        severity: violation.severity,
        message: format!(
            "{} on '{}': actual {:.2}, required {:.2}",
            violation.kind.name(),
            selector_name,
            violation.actual,
            violation.required
        ),
        details: serde_json::json!({
            "kind": violation.kind.name(),
            "severity": violation.severity.name(),
            "actual": violation.actual,
            "required": violation.required,
        }),
        timestamp: Utc::now(),
        gate_name: gate_name.to_string(),
    }
}
