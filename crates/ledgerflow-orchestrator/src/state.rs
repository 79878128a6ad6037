//! Per-run mutable state.

use ledgerflow_plan::{Produced, RunContext, Signature, StepStatus, WorkflowPlan};
use tracing::warn;

use crate::events::{ProgressReport, RunPhase};
use crate::request::ResumeToken;

/// State owned by a single `run` call.
#[derive(Debug, Clone)]
pub struct RunState {
  pub plan: WorkflowPlan,
  pub statuses: Vec<StepStatus>,
  pub context: RunContext,
  pub phase: RunPhase,
  pub current_index: Option<usize>,
  pub first_signature: Option<Signature>,
}

impl RunState {
  /// State for a fresh run: every step pending.
  pub fn fresh(plan: WorkflowPlan) -> Self {
    let statuses = vec![StepStatus::Pending; plan.len()];
    Self::with_statuses(plan, statuses, RunContext::default())
  }

  /// State for a resumed run, from probed completion flags.
  pub fn resumed(plan: WorkflowPlan, completed: &[bool], context: RunContext) -> Self {
    let statuses = completed
      .iter()
      .map(|done| {
        if *done {
          StepStatus::Confirmed
        } else {
          StepStatus::Pending
        }
      })
      .collect();
    Self::with_statuses(plan, statuses, context)
  }

  fn with_statuses(plan: WorkflowPlan, statuses: Vec<StepStatus>, context: RunContext) -> Self {
    Self {
      plan,
      statuses,
      context,
      phase: RunPhase::Planning,
      current_index: None,
      first_signature: None,
    }
  }

  /// Move step `index` to `next`. Backward or skipping transitions are
  /// refused and leave the status unchanged.
  pub fn advance(&mut self, index: usize, next: StepStatus) -> bool {
    let Some(current) = self.statuses.get(index).copied() else {
      warn!(index, "status update for unknown step");
      return false;
    };
    if !current.can_advance_to(next) {
      warn!(index, from = %current, to = %next, "refusing status transition");
      return false;
    }
    self.statuses[index] = next;
    true
  }

  pub fn record_signature(&mut self, signature: &Signature) {
    if self.first_signature.is_none() {
      self.first_signature = Some(signature.clone());
    }
  }

  pub fn all_confirmed(&self) -> bool {
    self.statuses.iter().all(|s| *s == StepStatus::Confirmed)
  }

  pub fn resume_token(&self) -> Option<ResumeToken> {
    let resource_id = self.context.resource_id?;
    let address = self.context.resource_address.clone()?;
    Some(ResumeToken::new(resource_id, address).pinned(self.plan.shape()))
  }

  /// Like [`resume_token`](Self::resume_token), falling back to the
  /// identifiers of a broadcast but unconfirmed operation. The context is
  /// left untouched; resuming re-probes whether the resource exists.
  pub fn resume_token_after(&self, pending: Option<&Produced>) -> Option<ResumeToken> {
    self.resume_token().or_else(|| {
      let pending = pending?;
      let resource_id = pending.resource_id?;
      let address = pending.resource_address.clone()?;
      Some(ResumeToken::new(resource_id, address).pinned(self.plan.shape()))
    })
  }

  pub fn report(&self) -> ProgressReport {
    ProgressReport {
      phase: self.phase,
      plan_length: self.plan.len(),
      current_index: self.current_index,
      steps: self.plan.shape(),
      statuses: self.statuses.clone(),
      resource_id: self.context.resource_id,
      resource_address: self.context.resource_address.clone(),
      first_signature: self.first_signature.clone(),
    }
  }
}
