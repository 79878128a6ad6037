use ledgerflow_config::ResourceKind;
use ledgerflow_plan::{Address, Produced, ResourceId, StepKind};
use serde::{Deserialize, Serialize};

/// The state change an operation asks the ledger to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
  CreateResource {
    resource_id: ResourceId,
    address: Address,
    kind: ResourceKind,
    name: String,
  },
  CreateSubResource {
    resource_id: ResourceId,
    sub_resource: Address,
  },
  Fund {
    address: Address,
    amount: u64,
  },
}

/// An operation ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedOperation {
  pub step: StepKind,
  pub instruction: Instruction,
  /// Identifiers that exist once this operation is final.
  #[serde(default)]
  pub produces: Produced,
}
