//! Resume support: probe a resource and evaluate the plan against it.

use std::sync::Arc;

use ledgerflow_ledger::StateProber;
use ledgerflow_plan::{PlanError, ResourceSnapshot, RunContext, WorkflowPlan};
use tracing::{debug, instrument};

use crate::error::OrchestratorError;
use crate::request::ResumeToken;

/// What the ledger says about a resource being resumed.
#[derive(Debug, Clone)]
pub struct ProbedState {
  pub snapshot: ResourceSnapshot,
  /// Per plan step, whether it is already satisfied on-ledger.
  pub completed: Vec<bool>,
  pub context: RunContext,
}

/// Wraps a [`StateProber`] with plan evaluation.
#[derive(Clone)]
pub struct StateProbeAdapter {
  prober: Arc<dyn StateProber>,
}

impl StateProbeAdapter {
  pub fn new(prober: Arc<dyn StateProber>) -> Self {
    Self { prober }
  }

  /// Probe the token's resource and mark which plan steps are complete.
  ///
  /// A missing resource is fatal: falling back to a fresh creation could
  /// produce a second resource for one logical attempt.
  #[instrument(name = "probe_resource", skip(self, token, plan), fields(resource_id = %token.resource_id))]
  pub async fn probe(
    &self,
    token: &ResumeToken,
    plan: &WorkflowPlan,
  ) -> Result<ProbedState, OrchestratorError> {
    let snapshot =
      self
        .prober
        .probe(token.resource_id)
        .await
        .map_err(|source| OrchestratorError::Probe {
          resource_id: token.resource_id,
          source,
        })?;

    if !token.resource_address.is_default() && token.resource_address != snapshot.address {
      return Err(
        PlanError::SnapshotMismatch(format!(
          "resource {} lives at {}, token says {}",
          token.resource_id, snapshot.address, token.resource_address
        ))
        .into(),
      );
    }

    let completed = plan.completion(&snapshot)?;
    debug!(completed = ?completed, "probed resource");

    Ok(ProbedState {
      context: RunContext::from_snapshot(&snapshot),
      snapshot,
      completed,
    })
  }
}
