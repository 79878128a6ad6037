//! Single-flight guards.
//!
//! Two runs for the same key must never interleave, or both could see the
//! same pending step and broadcast it twice. Each key maps to an async mutex
//! held for the whole run.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use ledgerflow_config::ConcurrencyPolicy;
use ledgerflow_plan::ResourceId;
use tokio::sync::OwnedMutexGuard;

use crate::error::OrchestratorError;

/// What a run is serialized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightKey {
  /// Fresh runs on one orchestrator share a single key.
  Fresh,
  /// Runs touching an existing resource.
  Resource(ResourceId),
}

impl fmt::Display for FlightKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FlightKey::Fresh => f.write_str("fresh creation"),
      FlightKey::Resource(id) => write!(f, "resource {}", id),
    }
  }
}

/// Held for as long as a run owns its key.
#[derive(Debug)]
pub struct FlightGuard {
  key: FlightKey,
  _guard: OwnedMutexGuard<()>,
}

impl FlightGuard {
  pub fn key(&self) -> FlightKey {
    self.key
  }
}

/// Registry of per-key locks.
#[derive(Debug, Default)]
pub struct SingleFlight {
  // TODO: entries are never evicted; prune slots with no outstanding guard
  // once long-lived orchestrators see many distinct resources.
  slots: Mutex<HashMap<FlightKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl SingleFlight {
  pub fn new() -> Self {
    Self::default()
  }

  fn slot(&self, key: FlightKey) -> Arc<tokio::sync::Mutex<()>> {
    let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
    slots.entry(key).or_default().clone()
  }

  /// Claim `key` according to `policy`.
  pub async fn acquire(
    &self,
    key: FlightKey,
    policy: ConcurrencyPolicy,
  ) -> Result<FlightGuard, OrchestratorError> {
    match policy {
      ConcurrencyPolicy::Reject => self.try_acquire(key),
      ConcurrencyPolicy::Wait => {
        let guard = self.slot(key).lock_owned().await;
        Ok(FlightGuard { key, _guard: guard })
      }
    }
  }

  /// Claim `key` without waiting.
  pub fn try_acquire(&self, key: FlightKey) -> Result<FlightGuard, OrchestratorError> {
    let guard = self
      .slot(key)
      .try_lock_owned()
      .map_err(|_| OrchestratorError::Busy {
        key: key.to_string(),
      })?;
    Ok(FlightGuard { key, _guard: guard })
  }
}
