//! Step executor implementation.

use std::sync::Arc;
use std::time::Duration;

use ledgerflow_config::CreationParams;
use ledgerflow_ledger::{LedgerError, SignerSubmitter, TransactionBuilder};
use ledgerflow_plan::{Produced, RunContext, Signature, StepDescriptor, StepStatus};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::StepError;

/// Result of a confirmed step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
  pub signature: Signature,
  /// Identifiers that now exist on-ledger.
  pub produced: Produced,
}

/// Why `execute` returned without a confirmed step.
#[derive(Debug)]
pub enum ExecuteError {
  Step(StepError),
  /// The caller cancelled while the step was in progress. `produced` is
  /// empty unless the operation was already broadcast.
  Cancelled {
    signature: Option<Signature>,
    produced: Produced,
  },
}

/// Callback invoked on each status transition inside a step.
///
/// Receives the new status and, from `Confirming` on, the signature.
pub type StageCallback<'a> = dyn FnMut(StepStatus, Option<&Signature>) + Send + 'a;

/// Runs a single step: build, sign+submit, confirm.
#[derive(Clone)]
pub struct StepExecutor {
  builder: Arc<dyn TransactionBuilder>,
  submitter: Arc<dyn SignerSubmitter>,
  confirm_timeout: Option<Duration>,
}

impl StepExecutor {
  pub fn new(
    builder: Arc<dyn TransactionBuilder>,
    submitter: Arc<dyn SignerSubmitter>,
    confirm_timeout: Option<Duration>,
  ) -> Self {
    Self {
      builder,
      submitter,
      confirm_timeout,
    }
  }

  /// Execute `step` once.
  ///
  /// Broadcasts at most one operation. The context is only read here; the
  /// caller merges `StepOutcome::produced` after confirmation.
  #[instrument(
    name = "step_execute",
    skip(self, params, context, on_stage, cancel),
    fields(index = step.index, step = %step.kind)
  )]
  pub async fn execute(
    &self,
    step: &StepDescriptor,
    params: &CreationParams,
    context: &RunContext,
    on_stage: &mut StageCallback<'_>,
    cancel: &CancellationToken,
  ) -> Result<StepOutcome, ExecuteError> {
    if cancel.is_cancelled() {
      return Err(ExecuteError::Cancelled {
        signature: None,
        produced: Produced::default(),
      });
    }

    // Build
    on_stage(StepStatus::Signing, None);
    let operation = self
      .builder
      .build(step.kind, params, context)
      .await
      .map_err(|e| {
        error!(error = %e, "build failed");
        ExecuteError::Step(StepError::Build(e))
      })?;
    let produced = operation.produces.clone();

    // Sign + submit
    let signature = self.submitter.submit(operation).await.map_err(|e| {
      error!(error = %e, "submit failed");
      ExecuteError::Step(StepError::Submit(e))
    })?;
    info!(signature = %signature, "operation submitted");

    // Confirm
    on_stage(StepStatus::Confirming, Some(&signature));
    let confirmed = tokio::select! {
      result = self.await_finality(&signature) => result,
      _ = cancel.cancelled() => {
        warn!(signature = %signature, "cancelled while awaiting finality");
        return Err(ExecuteError::Cancelled {
          signature: Some(signature),
          produced,
        });
      }
    };

    match confirmed {
      Ok(()) => {
        info!(signature = %signature, "operation final");
        Ok(StepOutcome {
          signature,
          produced,
        })
      }
      Err(source) => {
        error!(signature = %signature, error = %source, "finality not observed");
        Err(ExecuteError::Step(StepError::Confirm {
          signature,
          source,
          produced,
        }))
      }
    }
  }

  /// Await finality, bounded by the configured timeout if any.
  async fn await_finality(&self, signature: &Signature) -> Result<(), LedgerError> {
    match self.confirm_timeout {
      Some(limit) => tokio::time::timeout(limit, self.submitter.await_finality(signature))
        .await
        .map_err(|_| LedgerError::FinalityTimeout {
          signature: signature.clone(),
        })?,
      None => self.submitter.await_finality(signature).await,
    }
  }
}
