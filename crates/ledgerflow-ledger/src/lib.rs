//! Ledgerflow Ledger
//!
//! This crate defines the three capabilities the orchestrator consumes from
//! the outside world, and an in-memory implementation of all of them.
//!
//! - [`TransactionBuilder`] turns a step kind, params and run context into an
//!   [`UnsignedOperation`].
//! - [`SignerSubmitter`] signs and broadcasts an operation, then awaits its
//!   finality.
//! - [`StateProber`] reads the authoritative on-ledger state of a resource.
//!
//! [`MemoryLedger`] implements all three against a simulated ledger with
//! fault injection, and is used by the CLI and the test suites.

mod error;
mod memory;
mod operation;

pub use error::LedgerError;
pub use memory::{Fault, LedgerState, MemoryLedger};
pub use operation::{Instruction, UnsignedOperation};

use async_trait::async_trait;
use ledgerflow_config::CreationParams;
use ledgerflow_plan::{ResourceId, ResourceSnapshot, RunContext, Signature, StepKind};

/// Builds unsigned operations for workflow steps.
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
  /// Build the operation for `kind`.
  ///
  /// Fails with [`LedgerError::InvalidParams`] when the context lacks an
  /// identifier a prior step should have produced.
  async fn build(
    &self,
    kind: StepKind,
    params: &CreationParams,
    context: &RunContext,
  ) -> Result<UnsignedOperation, LedgerError>;
}

/// Signs, broadcasts and tracks operations until finality.
#[async_trait]
pub trait SignerSubmitter: Send + Sync {
  /// Sign and broadcast an operation.
  ///
  /// Fails with [`LedgerError::UserRejected`] or
  /// [`LedgerError::BroadcastFailed`]; in both cases nothing was broadcast.
  async fn submit(&self, operation: UnsignedOperation) -> Result<Signature, LedgerError>;

  /// Wait until the operation behind `signature` is final.
  ///
  /// Fails with [`LedgerError::FinalityTimeout`] when the network gave up
  /// waiting; the operation may still land.
  async fn await_finality(&self, signature: &Signature) -> Result<(), LedgerError>;
}

/// Reads the current on-ledger state of a resource.
#[async_trait]
pub trait StateProber: Send + Sync {
  /// Fails with [`LedgerError::NotFound`] if no resource exists for the id.
  async fn probe(&self, resource_id: ResourceId) -> Result<ResourceSnapshot, LedgerError>;
}
