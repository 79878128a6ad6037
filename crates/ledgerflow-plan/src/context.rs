use serde::{Deserialize, Serialize};

use crate::ids::{Address, ResourceId};
use crate::snapshot::ResourceSnapshot;
use crate::step::StepKind;

/// Identifiers an operation creates once it is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Produced {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resource_id: Option<ResourceId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resource_address: Option<Address>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sub_resource: Option<Address>,
}

/// Identifiers accumulated over a run, read by each step's Build stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
  pub resource_id: Option<ResourceId>,
  pub resource_address: Option<Address>,
  pub sub_resource: Option<Address>,
}

impl RunContext {
  /// Context recovered from the on-ledger state of a resource.
  pub fn from_snapshot(snapshot: &ResourceSnapshot) -> Self {
    Self {
      resource_id: Some(snapshot.resource_id),
      resource_address: Some(snapshot.address.clone()),
      sub_resource: snapshot
        .has_sub_resource()
        .then(|| snapshot.sub_resource.clone()),
    }
  }

  /// Merge identifiers produced by a confirmed step. Existing values win.
  pub fn merge(&mut self, produced: Produced) {
    if self.resource_id.is_none() {
      self.resource_id = produced.resource_id;
    }
    if self.resource_address.is_none() {
      self.resource_address = produced.resource_address;
    }
    if self.sub_resource.is_none() {
      self.sub_resource = produced.sub_resource;
    }
  }

  /// Name of the first field `kind` needs that this context lacks.
  pub fn missing_for(&self, kind: StepKind) -> Option<&'static str> {
    match kind {
      StepKind::CreateResource => None,
      StepKind::CreateSubResource => {
        if self.resource_id.is_none() {
          Some("resource_id")
        } else if self.resource_address.is_none() {
          Some("resource_address")
        } else {
          None
        }
      }
      StepKind::Fund => self.resource_address.is_none().then_some("resource_address"),
    }
  }

  /// Name of the first field `kind` should have produced but did not.
  pub fn missing_after(&self, kind: StepKind) -> Option<&'static str> {
    match kind {
      StepKind::CreateResource => {
        if self.resource_id.is_none() {
          Some("resource_id")
        } else if self.resource_address.is_none() {
          Some("resource_address")
        } else {
          None
        }
      }
      StepKind::CreateSubResource => self.sub_resource.is_none().then_some("sub_resource"),
      StepKind::Fund => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ledgerflow_config::ResourceKind;

  #[test]
  fn test_merge_keeps_existing_values() {
    let mut ctx = RunContext {
      resource_id: Some(ResourceId(1)),
      ..Default::default()
    };
    ctx.merge(Produced {
      resource_id: Some(ResourceId(2)),
      resource_address: Some(Address::new("res-2")),
      sub_resource: None,
    });
    assert_eq!(ctx.resource_id, Some(ResourceId(1)));
    assert_eq!(ctx.resource_address, Some(Address::new("res-2")));
  }

  #[test]
  fn test_missing_for_sub_resource_step() {
    let ctx = RunContext::default();
    assert_eq!(ctx.missing_for(StepKind::CreateResource), None);
    assert_eq!(ctx.missing_for(StepKind::CreateSubResource), Some("resource_id"));
    assert_eq!(ctx.missing_for(StepKind::Fund), Some("resource_address"));
  }

  #[test]
  fn test_from_partial_snapshot() {
    let snapshot =
      ResourceSnapshot::created(ResourceId(4), Address::new("res-4"), ResourceKind::Pooled);
    let ctx = RunContext::from_snapshot(&snapshot);
    assert_eq!(ctx.resource_id, Some(ResourceId(4)));
    assert_eq!(ctx.sub_resource, None);
    assert_eq!(ctx.missing_for(StepKind::CreateSubResource), None);
  }
}
