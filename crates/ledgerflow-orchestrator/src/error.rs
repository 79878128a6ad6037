//! Error types for creation runs.

use ledgerflow_config::ConfigError;
use ledgerflow_ledger::LedgerError;
use ledgerflow_plan::{PlanError, Produced, ResourceId, Signature, StepKind};
use thiserror::Error;

use crate::request::ResumeToken;

/// Why a single step failed.
///
/// The variant tells the caller whether anything reached the ledger:
/// `Build` and `Submit` failures broadcast nothing and the step can be run
/// again, while a `Confirm` failure happened after a signature was obtained
/// and the operation may still land. Recover from it by resuming, which
/// re-probes state, never by resubmitting.
#[derive(Debug, Clone, Error)]
pub enum StepError {
  /// The transaction builder rejected the step.
  #[error("failed to build operation: {0}")]
  Build(#[source] LedgerError),

  /// Signing or broadcast failed.
  #[error("failed to submit operation: {0}")]
  Submit(#[source] LedgerError),

  /// The operation was broadcast but finality was not observed.
  #[error("operation {signature} not confirmed: {source}")]
  Confirm {
    signature: Signature,
    #[source]
    source: LedgerError,
    /// Identifiers the operation creates if it lands.
    produced: Produced,
  },
}

impl StepError {
  /// Signature of the broadcast operation, if one was obtained.
  pub fn signature(&self) -> Option<&Signature> {
    match self {
      StepError::Confirm { signature, .. } => Some(signature),
      _ => None,
    }
  }

  /// Identifiers a broadcast operation creates if it lands. Unconfirmed.
  pub fn produced(&self) -> Option<&Produced> {
    match self {
      StepError::Confirm { produced, .. } => Some(produced),
      _ => None,
    }
  }

  /// Whether the operation may have reached the ledger.
  pub fn was_broadcast(&self) -> bool {
    matches!(self, StepError::Confirm { .. })
  }

  /// Whether re-running the step from scratch cannot duplicate work.
  pub fn is_retryable(&self) -> bool {
    !self.was_broadcast()
  }

  pub fn is_user_rejection(&self) -> bool {
    matches!(self, StepError::Submit(LedgerError::UserRejected))
  }

  pub fn is_finality_timeout(&self) -> bool {
    matches!(
      self,
      StepError::Confirm {
        source: LedgerError::FinalityTimeout { .. },
        ..
      }
    )
  }
}

/// Fatal errors that end a run without a `Halted` result.
#[derive(Debug, Error)]
pub enum OrchestratorError {
  /// Orchestrator configuration is invalid.
  #[error("invalid orchestrator config: {0}")]
  Config(#[from] ConfigError),

  /// The plan could not be built or does not match on-ledger state.
  #[error("planning failed: {0}")]
  Plan(#[from] PlanError),

  /// The resource to resume could not be probed.
  #[error("failed to probe resource {resource_id}: {source}")]
  Probe {
    resource_id: ResourceId,
    #[source]
    source: LedgerError,
  },

  /// Another run holds the same key.
  #[error("a run for {key} is already in flight")]
  Busy { key: String },

  /// A step needed, or should have produced, an identifier that is absent.
  #[error("step '{step}' is missing required context '{field}'")]
  MissingContext { step: StepKind, field: &'static str },

  /// The caller cancelled the run. Nothing was rolled back. The token is
  /// present when the resource exists or its creation was broadcast.
  #[error("run cancelled")]
  Cancelled { resume_token: Option<ResumeToken> },
}

impl OrchestratorError {
  /// Whether this is the "resume requested but nothing exists" error.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      OrchestratorError::Probe {
        source: LedgerError::NotFound(_),
        ..
      }
    )
  }
}
