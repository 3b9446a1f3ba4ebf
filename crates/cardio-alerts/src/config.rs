//! Alert manager configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decorators::RepeatPolicy;
use crate::error::{AlertError, Result};
use crate::evaluators::EvaluatorSet;

/// Configuration for the alert manager.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "priority": 2, "repeat": { "interval_ms": 30000, "max_repeats": 3 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertManagerConfig {
    /// Priority attached to every alert, if any.
    pub priority: Option<i32>,
    /// Repeat policy applied to every alert, if any.
    pub repeat: Option<RepeatPolicy>,
    /// Which evaluator families run.
    pub evaluators: EvaluatorSet,
}

impl AlertManagerConfig {
    /// Sets the priority attached to every alert.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the repeat policy applied to every alert.
    #[must_use]
    pub const fn with_repeat(mut self, policy: RepeatPolicy) -> Self {
        self.repeat = Some(policy);
        self
    }

    /// Sets which evaluator families run.
    #[must_use]
    pub const fn with_evaluators(mut self, evaluators: EvaluatorSet) -> Self {
        self.evaluators = evaluators;
        self
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SerializationError` for malformed JSON and
    /// `AlertError::InvalidConfig` if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Io` if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        info!(path = %path.display(), "loaded alert manager configuration");
        Ok(config)
    }

    /// Checks the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the repeat policy is invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(policy) = &self.repeat {
            policy.validate().map_err(|e| AlertError::InvalidConfig {
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
