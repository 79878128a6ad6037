//! Run requests and results.

use ledgerflow_config::CreationParams;
use ledgerflow_plan::{Address, ResourceId, RunContext, Signature, StepKind, StepStatus};
use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::flight::FlightKey;

/// Caller-held state sufficient to re-enter a halted run.
///
/// `steps` pins the plan shape of the run that produced the token. A token
/// built by hand may leave it empty, in which case only the on-ledger state
/// is checked against the rebuilt plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeToken {
  pub resource_id: ResourceId,
  pub resource_address: Address,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub steps: Vec<StepKind>,
}

impl ResumeToken {
  pub fn new(resource_id: ResourceId, resource_address: Address) -> Self {
    Self {
      resource_id,
      resource_address,
      steps: Vec::new(),
    }
  }

  /// Pin the plan shape the resumed run must match.
  pub fn pinned(mut self, steps: Vec<StepKind>) -> Self {
    self.steps = steps;
    self
  }
}

/// What a call to `run` should do.
#[derive(Debug, Clone)]
pub enum RunRequest {
  /// Create a new resource from scratch.
  Fresh(CreationParams),
  /// Continue a previous attempt for an existing resource.
  Resume(CreationParams, ResumeToken),
}

impl RunRequest {
  pub fn params(&self) -> &CreationParams {
    match self {
      RunRequest::Fresh(params) | RunRequest::Resume(params, _) => params,
    }
  }

  pub fn mode(&self) -> &'static str {
    match self {
      RunRequest::Fresh(_) => "fresh",
      RunRequest::Resume(..) => "resume",
    }
  }

  pub(crate) fn flight_key(&self) -> FlightKey {
    match self {
      RunRequest::Fresh(_) => FlightKey::Fresh,
      RunRequest::Resume(_, token) => FlightKey::Resource(token.resource_id),
    }
  }
}

/// A run that confirmed every step of its plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
  pub resource_id: ResourceId,
  pub resource_address: Address,
  pub statuses: Vec<StepStatus>,
  /// Signatures of steps executed by this run, by plan index.
  pub signatures: Vec<(usize, Signature)>,
}

impl RunSummary {
  /// Number of steps this run actually executed.
  pub fn steps_executed(&self) -> usize {
    self.signatures.len()
  }
}

/// A run that stopped at its first failing step.
#[derive(Debug, Clone)]
pub struct HaltedRun {
  pub failed_index: usize,
  pub failed_step: StepKind,
  pub error: StepError,
  pub statuses: Vec<StepStatus>,
  pub context: RunContext,
  /// Present once the resource exists, or once its creating operation was
  /// broadcast. Pass it back to resume; a `NotFound` probe then means the
  /// operation never landed and a fresh run is safe.
  pub resume_token: Option<ResumeToken>,
}

/// Terminal result of a run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
  Completed(RunSummary),
  Halted(HaltedRun),
}

impl RunOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, RunOutcome::Completed(_))
  }

  pub fn statuses(&self) -> &[StepStatus] {
    match self {
      RunOutcome::Completed(summary) => &summary.statuses,
      RunOutcome::Halted(halted) => &halted.statuses,
    }
  }

  pub fn resume_token(&self) -> Option<ResumeToken> {
    match self {
      RunOutcome::Completed(summary) => Some(ResumeToken::new(
        summary.resource_id,
        summary.resource_address.clone(),
      )),
      RunOutcome::Halted(halted) => halted.resume_token.clone(),
    }
  }
}
