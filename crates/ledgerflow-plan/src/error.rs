use thiserror::Error;

use crate::step::StepKind;

#[derive(Debug, Error)]
pub enum PlanError {
  #[error("invalid creation params: {0}")]
  InvalidParams(String),

  #[error("resume params do not match the original run: expected steps {expected:?}, got {actual:?}")]
  ParamsMismatch {
    expected: Vec<StepKind>,
    actual: Vec<StepKind>,
  },

  #[error("on-ledger state disagrees with the plan: {0}")]
  SnapshotMismatch(String),
}
