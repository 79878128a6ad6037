use ledgerflow_plan::{ResourceId, Signature};

/// Errors reported by ledger collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
  /// No resource exists for the identifier.
  #[error("resource {0} not found")]
  NotFound(ResourceId),

  /// The operation could not be built from the given params and context.
  #[error("invalid params: {0}")]
  InvalidParams(String),

  /// The signer declined to sign.
  #[error("user rejected the signature request")]
  UserRejected,

  /// The operation was not accepted for broadcast.
  #[error("broadcast failed: {0}")]
  BroadcastFailed(String),

  /// Finality was not observed in time. The broadcast may still land.
  #[error("finality not observed for {signature}")]
  FinalityTimeout { signature: Signature },

  /// The ledger endpoint could not be reached.
  #[error("ledger unavailable: {0}")]
  Unavailable(String),
}
