use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The kind of resource being created.
///
/// The kind decides which optional steps a creation run contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  /// A resource backed by a dependent sub-resource (e.g. a pool account)
  /// that must be created once the resource itself exists.
  Pooled,
  /// A resource with no dependent sub-resource.
  Standalone,
}

/// Caller-chosen options for one creation attempt.
///
/// Example (JSON):
///
/// ```json
/// {
///   "kind": "pooled",
///   "name": "genesis-drop",
///   "includes_funding": true,
///   "funding_amount": 2500000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationParams {
  pub kind: ResourceKind,
  /// Human-readable resource name, passed through to the transaction builder.
  pub name: String,
  #[serde(default)]
  pub includes_funding: bool,
  /// Amount to deposit in the funding step, in the ledger's base unit.
  #[serde(default)]
  pub funding_amount: u64,
}

impl CreationParams {
  /// Parse params from a JSON string and validate them.
  pub fn from_json(input: &str) -> Result<Self, ConfigError> {
    let params: Self = serde_json::from_str(input)?;
    params.validate()?;
    Ok(params)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.name.trim().is_empty() {
      return Err(ConfigError::EmptyName);
    }
    Ok(())
  }

  /// Whether this run needs a funding step.
  ///
  /// Funding is only planned when the caller asked for it and the amount
  /// is strictly positive.
  pub fn wants_funding(&self) -> bool {
    self.includes_funding && self.funding_amount > 0
  }
}
