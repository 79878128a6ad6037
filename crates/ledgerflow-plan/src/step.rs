use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::ResourceSnapshot;

/// The operation a step submits to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  CreateResource,
  CreateSubResource,
  Fund,
}

impl StepKind {
  pub fn label(self) -> &'static str {
    match self {
      StepKind::CreateResource => "Create resource",
      StepKind::CreateSubResource => "Create sub-resource",
      StepKind::Fund => "Fund resource",
    }
  }

  /// Completion predicate for this kind of step.
  ///
  /// Receiving a snapshot at all means the resource exists, so
  /// `CreateResource` is always complete against one.
  pub fn is_complete(self, snapshot: &ResourceSnapshot) -> bool {
    match self {
      StepKind::CreateResource => true,
      StepKind::CreateSubResource => snapshot.has_sub_resource(),
      StepKind::Fund => snapshot.is_funded(),
    }
  }
}

impl fmt::Display for StepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      StepKind::CreateResource => "create_resource",
      StepKind::CreateSubResource => "create_sub_resource",
      StepKind::Fund => "fund",
    };
    f.write_str(name)
  }
}

/// One step of a workflow plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
  pub index: usize,
  pub kind: StepKind,
}

impl StepDescriptor {
  pub fn new(index: usize, kind: StepKind) -> Self {
    Self { index, kind }
  }

  pub fn label(&self) -> &'static str {
    self.kind.label()
  }

  /// Whether the observed resource state shows this step as done.
  pub fn is_complete(&self, snapshot: &ResourceSnapshot) -> bool {
    self.kind.is_complete(snapshot)
  }
}

/// Status of a step within one orchestrator run.
///
/// Statuses only move forward:
/// `Pending -> Signing -> Confirming -> Confirmed`, and
/// `Signing | Confirming -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Pending,
  Signing,
  Confirming,
  Confirmed,
  Failed,
}

impl StepStatus {
  /// Whether moving from `self` to `next` is a legal forward transition.
  pub fn can_advance_to(self, next: StepStatus) -> bool {
    use StepStatus::*;
    matches!(
      (self, next),
      (Pending, Signing)
        | (Signing, Confirming)
        | (Confirming, Confirmed)
        | (Signing, Failed)
        | (Confirming, Failed)
    )
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, StepStatus::Confirmed | StepStatus::Failed)
  }
}

impl fmt::Display for StepStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      StepStatus::Pending => "pending",
      StepStatus::Signing => "signing",
      StepStatus::Confirming => "confirming",
      StepStatus::Confirmed => "confirmed",
      StepStatus::Failed => "failed",
    };
    f.write_str(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ids::{Address, ResourceId};
  use ledgerflow_config::ResourceKind;

  fn partial_snapshot() -> ResourceSnapshot {
    ResourceSnapshot::created(ResourceId(7), Address::new("res-7"), ResourceKind::Pooled)
  }

  #[test]
  fn test_create_resource_complete_for_any_snapshot() {
    assert!(StepKind::CreateResource.is_complete(&partial_snapshot()));
  }

  #[test]
  fn test_sub_resource_requires_non_default_field() {
    let mut snapshot = partial_snapshot();
    assert!(!StepKind::CreateSubResource.is_complete(&snapshot));

    snapshot.sub_resource = Address::new("sub-7");
    assert!(StepKind::CreateSubResource.is_complete(&snapshot));
  }

  #[test]
  fn test_fund_requires_positive_balance() {
    let mut snapshot = partial_snapshot();
    assert!(!StepKind::Fund.is_complete(&snapshot));

    snapshot.funding_balance = 1;
    assert!(StepKind::Fund.is_complete(&snapshot));
  }

  #[test]
  fn test_predicates_are_repeatable() {
    let snapshot = partial_snapshot();
    let step = StepDescriptor::new(1, StepKind::CreateSubResource);
    assert_eq!(step.is_complete(&snapshot), step.is_complete(&snapshot));
  }

  #[test]
  fn test_status_transitions_only_move_forward() {
    use StepStatus::*;
    assert!(Pending.can_advance_to(Signing));
    assert!(Signing.can_advance_to(Confirming));
    assert!(Confirming.can_advance_to(Confirmed));
    assert!(Signing.can_advance_to(Failed));
    assert!(Confirming.can_advance_to(Failed));

    assert!(!Confirmed.can_advance_to(Pending));
    assert!(!Confirmed.can_advance_to(Failed));
    assert!(!Failed.can_advance_to(Signing));
    assert!(!Pending.can_advance_to(Confirmed));
    assert!(!Pending.can_advance_to(Failed));
  }
}
