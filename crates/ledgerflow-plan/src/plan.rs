use ledgerflow_config::{CreationParams, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::snapshot::ResourceSnapshot;
use crate::step::{StepDescriptor, StepKind};

/// Ordered steps for one creation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPlan {
  pub kind: ResourceKind,
  pub steps: Vec<StepDescriptor>,
}

impl WorkflowPlan {
  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Step kinds in plan order.
  pub fn shape(&self) -> Vec<StepKind> {
    self.steps.iter().map(|s| s.kind).collect()
  }

  pub fn contains(&self, kind: StepKind) -> bool {
    self.steps.iter().any(|s| s.kind == kind)
  }

  /// Reject a plan whose shape differs from the one pinned by a prior run.
  ///
  /// An empty `expected` shape means nothing was pinned.
  pub fn verify_shape(&self, expected: &[StepKind]) -> Result<(), PlanError> {
    let actual = self.shape();
    if !expected.is_empty() && expected != actual.as_slice() {
      return Err(PlanError::ParamsMismatch {
        expected: expected.to_vec(),
        actual,
      });
    }
    Ok(())
  }

  /// Evaluate every step's completion predicate against a snapshot.
  ///
  /// Fails when the snapshot shows work the plan cannot account for, or when
  /// completed steps do not form a prefix of the plan.
  pub fn completion(&self, snapshot: &ResourceSnapshot) -> Result<Vec<bool>, PlanError> {
    if snapshot.kind != self.kind {
      return Err(PlanError::SnapshotMismatch(format!(
        "resource {} is {:?} but params request {:?}",
        snapshot.resource_id, snapshot.kind, self.kind
      )));
    }
    if snapshot.has_sub_resource() && !self.contains(StepKind::CreateSubResource) {
      return Err(PlanError::SnapshotMismatch(format!(
        "resource {} has a sub-resource but the plan has no sub-resource step",
        snapshot.resource_id
      )));
    }
    if snapshot.is_funded() && !self.contains(StepKind::Fund) {
      return Err(PlanError::SnapshotMismatch(format!(
        "resource {} is funded but the plan has no funding step",
        snapshot.resource_id
      )));
    }

    let done: Vec<bool> = self.steps.iter().map(|s| s.is_complete(snapshot)).collect();

    if let Some(first_pending) = done.iter().position(|d| !d)
      && let Some(offset) = done[first_pending..].iter().position(|d| *d)
    {
      let later = &self.steps[first_pending + offset];
      return Err(PlanError::SnapshotMismatch(format!(
        "step '{}' is complete while earlier step '{}' is not",
        later.kind, self.steps[first_pending].kind
      )));
    }

    Ok(done)
  }
}

/// Builds the ordered plan for a set of creation params.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanBuilder;

impl PlanBuilder {
  pub fn new() -> Self {
    Self
  }

  /// Build the plan. Order is fixed: create-resource, create-sub-resource
  /// (pooled only), funding (only when a positive amount is requested).
  pub fn build(&self, params: &CreationParams) -> Result<WorkflowPlan, PlanError> {
    params
      .validate()
      .map_err(|e| PlanError::InvalidParams(e.to_string()))?;

    let mut kinds = vec![StepKind::CreateResource];
    if params.kind == ResourceKind::Pooled {
      kinds.push(StepKind::CreateSubResource);
    }
    if params.wants_funding() {
      kinds.push(StepKind::Fund);
    }

    let steps = kinds
      .into_iter()
      .enumerate()
      .map(|(index, kind)| StepDescriptor::new(index, kind))
      .collect();

    Ok(WorkflowPlan {
      kind: params.kind,
      steps,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ids::{Address, ResourceId};

  fn params(kind: ResourceKind, includes_funding: bool, funding_amount: u64) -> CreationParams {
    CreationParams {
      kind,
      name: "test".to_string(),
      includes_funding,
      funding_amount,
    }
  }

  fn snapshot(kind: ResourceKind) -> ResourceSnapshot {
    ResourceSnapshot::created(ResourceId(1), Address::new("res-1"), kind)
  }

  #[test]
  fn test_pooled_with_funding_has_three_steps() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Pooled, true, 100))
      .unwrap();
    assert_eq!(
      plan.shape(),
      vec![
        StepKind::CreateResource,
        StepKind::CreateSubResource,
        StepKind::Fund
      ]
    );
    let indices: Vec<usize> = plan.steps.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
  }

  #[test]
  fn test_standalone_without_funding_has_one_step() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Standalone, false, 0))
      .unwrap();
    assert_eq!(plan.shape(), vec![StepKind::CreateResource]);
  }

  #[test]
  fn test_funding_skipped_for_zero_amount() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Standalone, true, 0))
      .unwrap();
    assert!(!plan.contains(StepKind::Fund));
  }

  #[test]
  fn test_build_is_deterministic() {
    let builder = PlanBuilder::new();
    for kind in [ResourceKind::Pooled, ResourceKind::Standalone] {
      for funding in [false, true] {
        let p = params(kind, funding, 5);
        assert_eq!(builder.build(&p).unwrap(), builder.build(&p).unwrap());
      }
    }
  }

  #[test]
  fn test_invalid_params_rejected() {
    let mut p = params(ResourceKind::Pooled, false, 0);
    p.name = String::new();
    let err = PlanBuilder::new().build(&p).unwrap_err();
    assert!(matches!(err, PlanError::InvalidParams(_)));
  }

  #[test]
  fn test_completion_marks_created_resource() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Pooled, true, 10))
      .unwrap();
    let done = plan.completion(&snapshot(ResourceKind::Pooled)).unwrap();
    assert_eq!(done, vec![true, false, false]);
  }

  #[test]
  fn test_completion_rejects_unplanned_funding() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Standalone, false, 0))
      .unwrap();
    let mut snap = snapshot(ResourceKind::Standalone);
    snap.funding_balance = 50;
    let err = plan.completion(&snap).unwrap_err();
    assert!(matches!(err, PlanError::SnapshotMismatch(_)));
  }

  #[test]
  fn test_completion_rejects_kind_change() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Standalone, false, 0))
      .unwrap();
    let err = plan.completion(&snapshot(ResourceKind::Pooled)).unwrap_err();
    assert!(matches!(err, PlanError::SnapshotMismatch(_)));
  }

  #[test]
  fn test_completion_rejects_gap() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Pooled, true, 10))
      .unwrap();
    let mut snap = snapshot(ResourceKind::Pooled);
    snap.funding_balance = 10;
    let err = plan.completion(&snap).unwrap_err();
    assert!(matches!(err, PlanError::SnapshotMismatch(_)));
  }

  #[test]
  fn test_verify_shape() {
    let plan = PlanBuilder::new()
      .build(&params(ResourceKind::Pooled, false, 0))
      .unwrap();
    assert!(plan.verify_shape(&[]).is_ok());
    assert!(plan.verify_shape(&plan.shape()).is_ok());

    let err = plan
      .verify_shape(&[
        StepKind::CreateResource,
        StepKind::CreateSubResource,
        StepKind::Fund,
      ])
      .unwrap_err();
    assert!(matches!(err, PlanError::ParamsMismatch { .. }));
  }
}
