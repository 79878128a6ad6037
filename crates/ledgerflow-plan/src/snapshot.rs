use ledgerflow_config::ResourceKind;
use serde::{Deserialize, Serialize};

use crate::ids::{Address, ResourceId};

/// Point-in-time read of a resource's on-ledger fields.
///
/// A resource that is mid-creation has its optional fields at their
/// default values (empty sub-resource, zero balance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
  pub resource_id: ResourceId,
  pub address: Address,
  pub kind: ResourceKind,
  #[serde(default)]
  pub sub_resource: Address,
  #[serde(default)]
  pub funding_balance: u64,
}

impl ResourceSnapshot {
  /// A freshly created resource with no sub-resource and no funding.
  pub fn created(resource_id: ResourceId, address: Address, kind: ResourceKind) -> Self {
    Self {
      resource_id,
      address,
      kind,
      sub_resource: Address::default(),
      funding_balance: 0,
    }
  }

  pub fn has_sub_resource(&self) -> bool {
    !self.sub_resource.is_default()
  }

  pub fn is_funded(&self) -> bool {
    self.funding_balance > 0
  }
}
