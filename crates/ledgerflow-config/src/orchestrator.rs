use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default finality window assumed for the ledger, in milliseconds.
pub const DEFAULT_FINALITY_WINDOW_MS: u64 = 60_000;

/// What to do when a second run targets a key that already has a run in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
  /// Fail the second run immediately.
  #[default]
  Reject,
  /// Queue the second run until the first one finishes.
  Wait,
}

/// Orchestrator behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
  #[serde(default)]
  pub concurrency: ConcurrencyPolicy,

  /// The ledger's standard finality window.
  #[serde(default = "default_finality_window_ms")]
  pub finality_window_ms: u64,

  /// Optional client-side bound on the Confirm stage.
  /// Must not be shorter than `finality_window_ms`. When unset the
  /// orchestrator waits for the submitter's own finality signal.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub confirm_timeout_ms: Option<u64>,
}

fn default_finality_window_ms() -> u64 {
  DEFAULT_FINALITY_WINDOW_MS
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      concurrency: ConcurrencyPolicy::default(),
      finality_window_ms: DEFAULT_FINALITY_WINDOW_MS,
      confirm_timeout_ms: None,
    }
  }
}

impl OrchestratorConfig {
  /// Parse a config from JSON and validate it.
  pub fn from_json(input: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(input)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if let Some(timeout_ms) = self.confirm_timeout_ms
      && timeout_ms < self.finality_window_ms
    {
      return Err(ConfigError::TimeoutBelowFinality {
        timeout_ms,
        finality_window_ms: self.finality_window_ms,
      });
    }
    Ok(())
  }
}
