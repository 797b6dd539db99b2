//! Gate policy registry
//!
//! Holds the named gate policies evaluations are judged against. Policies
//! are immutable once registered; re-registering a name replaces the policy
//! wholesale. Lookups for unregistered names fall back to "production".

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::QualityError;
use crate::types::GatePolicy;

/// Gate name used as the lookup fallback
pub const DEFAULT_GATE: &str = "production";

const REQUIRED_KEYS: [&str; 5] = [
    "min_confidence",
    "max_resolution_time_ms",
    "min_validation_score",
    "required_strategies",
    "max_violations",
];

#[derive(Debug, Serialize, Deserialize)]
struct GateConfigFile {
    gates: HashMap<String, GatePolicy>,
}

/// Registry of named gate policies
#[derive(Debug)]
pub struct GateRegistry {
    gates: RwLock<HashMap<String, GatePolicy>>,
}

impl GateRegistry {
    /// Create a registry seeded with the built-in gate policies
    pub fn new() -> Self {
        Self {
            gates: RwLock::new(default_gates()),
        }
    }

    /// Create a registry from a YAML config file, merged over the defaults
    ///
    /// A missing file leaves the defaults untouched.
    pub fn load_from_path(path: &Path) -> Result<Self, QualityError> {
        let registry = Self::new();
        if !path.exists() {
            return Ok(registry);
        }
        let raw = fs::read_to_string(path)
            .map_err(|err| QualityError::Configuration(format!("failed to read {}: {err}", path.display())))?;
        let parsed: GateConfigFile = serde_yaml::from_str(&raw)
            .map_err(|err| QualityError::Configuration(format!("failed to parse {}: {err}", path.display())))?;
        for (name, policy) in parsed.gates {
            registry.register(&name, policy)?;
        }
        info!("loaded gate policies from {}", path.display());
        Ok(registry)
    }

    /// Register a gate policy, replacing any previous policy under the name
    pub fn register(&self, name: &str, policy: GatePolicy) -> Result<(), QualityError> {
        validate_policy(name, &policy)?;
        self.gates.write().insert(name.to_string(), policy);
        Ok(())
    }

    /// Register a loosely-typed gate policy (e.g. parsed from host config)
    ///
    /// Missing required keys are a caller error.
    pub fn register_value(&self, name: &str, value: serde_json::Value) -> Result<(), QualityError> {
        let map = value.as_object().ok_or_else(|| {
            QualityError::Configuration(format!("gate '{name}': policy must be a map"))
        })?;
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .filter(|key| !map.contains_key(**key))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(QualityError::Configuration(format!(
                "gate '{name}': missing required thresholds: {}",
                missing.join(", ")
            )));
        }
        let policy: GatePolicy = serde_json::from_value(value).map_err(|err| {
            QualityError::Configuration(format!("gate '{name}': {err}"))
        })?;
        self.register(name, policy)
    }

    /// Look up a gate policy, falling back to "production"
    pub fn policy(&self, name: &str) -> GatePolicy {
        let guard = self.gates.read();
        guard
            .get(name)
            .or_else(|| guard.get(DEFAULT_GATE))
            .cloned()
            .unwrap_or_else(|| default_gates().remove(DEFAULT_GATE).unwrap())
    }

    /// Check whether a gate name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.gates.read().contains_key(name)
    }

    /// Registered gate names
    pub fn names(&self) -> Vec<String> {
        self.gates.read().keys().cloned().collect()
    }
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_policy(name: &str, policy: &GatePolicy) -> Result<(), QualityError> {
    if !(0.0..=1.0).contains(&policy.min_confidence) {
        return Err(QualityError::Configuration(format!(
            "gate '{name}': min_confidence must be within [0, 1]"
        )));
    }
    if !(0.0..=1.0).contains(&policy.min_validation_score) {
        return Err(QualityError::Configuration(format!(
            "gate '{name}': min_validation_score must be within [0, 1]"
        )));
    }
    if policy.max_resolution_time_ms < 0.0 {
        return Err(QualityError::Configuration(format!(
            "gate '{name}': max_resolution_time_ms must be non-negative"
        )));
    }
    Ok(())
}

fn default_gates() -> HashMap<String, GatePolicy> {
    let mut gates = HashMap::new();
    gates.insert(
        "production".to_string(),
        GatePolicy {
            min_confidence: 0.85,
            max_resolution_time_ms: 1000.0,
            min_validation_score: 0.9,
            required_strategies: 2,
            max_violations: 0,
        },
    );
    gates.insert(
        "staging".to_string(),
        GatePolicy {
            min_confidence: 0.75,
            max_resolution_time_ms: 2000.0,
            min_validation_score: 0.8,
            required_strategies: 1,
            max_violations: 1,
        },
    );
    gates.insert(
        "development".to_string(),
        GatePolicy {
            min_confidence: 0.6,
            max_resolution_time_ms: 5000.0,
            min_validation_score: 0.6,
            required_strategies: 1,
            max_violations: 3,
        },
    );
    gates.insert(
        "testing".to_string(),
        GatePolicy {
            min_confidence: 0.5,
            max_resolution_time_ms: 10000.0,
            min_validation_score: 0.5,
            required_strategies: 0,
            max_violations: 5,
        },
    );
    gates
}
