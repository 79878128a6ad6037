//! In-memory simulated ledger.
//!
//! Operations move through the same stages a real ledger exposes: `build`
//! reserves identifiers, `submit` runs a preflight check and hands back a
//! signature, and `await_finality` applies the state change. Faults can be
//! injected per step kind to exercise every failure path of the orchestrator.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use ledgerflow_config::CreationParams;
use ledgerflow_plan::{
  Address, Produced, ResourceId, ResourceSnapshot, RunContext, Signature, StepKind,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;
use crate::operation::{Instruction, UnsignedOperation};
use crate::{SignerSubmitter, StateProber, TransactionBuilder};

/// A one-shot failure injected into the next operation of a step kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
  /// The signer declines; nothing is broadcast.
  UserRejected,
  /// The broadcast is refused; nothing lands.
  BroadcastFailed,
  /// Finality times out but the operation lands anyway.
  FinalityTimeout,
  /// Finality times out and the operation is dropped by the network.
  DroppedTimeout,
}

/// Durable part of the simulated ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
  next_id: u64,
  resources: BTreeMap<ResourceId, ResourceSnapshot>,
}

#[derive(Debug)]
struct Pending {
  operation: UnsignedOperation,
  fault: Option<Fault>,
}

#[derive(Debug, Default)]
struct Inner {
  state: LedgerState,
  pending: HashMap<Signature, Pending>,
  faults: HashMap<StepKind, Fault>,
  broadcasts: HashMap<StepKind, usize>,
}

/// Simulated ledger implementing every collaborator trait.
#[derive(Debug, Default)]
pub struct MemoryLedger {
  inner: Mutex<Inner>,
  finality_delay: Option<Duration>,
}

impl MemoryLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Restore a ledger from previously saved state.
  pub fn from_state(state: LedgerState) -> Self {
    Self {
      inner: Mutex::new(Inner {
        state,
        ..Default::default()
      }),
      finality_delay: None,
    }
  }

  /// Delay every finality wait by `delay`.
  pub fn with_finality_delay(mut self, delay: Duration) -> Self {
    self.finality_delay = Some(delay);
    self
  }

  /// Fail the next operation of `kind` with `fault`.
  pub fn inject(&self, kind: StepKind, fault: Fault) {
    self.lock().faults.insert(kind, fault);
  }

  /// Number of operations of `kind` that were broadcast.
  pub fn broadcasts(&self, kind: StepKind) -> usize {
    self.lock().broadcasts.get(&kind).copied().unwrap_or(0)
  }

  pub fn total_broadcasts(&self) -> usize {
    self.lock().broadcasts.values().sum()
  }

  pub fn resource_count(&self) -> usize {
    self.lock().state.resources.len()
  }

  /// Copy of the durable state, for saving.
  pub fn state(&self) -> LedgerState {
    self.lock().state.clone()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Inner {
  fn find_by_address(&mut self, address: &Address) -> Option<&mut ResourceSnapshot> {
    self
      .state
      .resources
      .values_mut()
      .find(|r| &r.address == address)
  }

  /// Preflight check run at broadcast time.
  fn check(&mut self, instruction: &Instruction) -> Result<(), LedgerError> {
    match instruction {
      Instruction::CreateResource { resource_id, .. } => {
        if self.state.resources.contains_key(resource_id) {
          return Err(LedgerError::BroadcastFailed(format!(
            "resource {} already exists",
            resource_id
          )));
        }
      }
      Instruction::CreateSubResource { resource_id, .. } => {
        let resource = self
          .state
          .resources
          .get(resource_id)
          .ok_or_else(|| LedgerError::BroadcastFailed(format!("resource {} missing", resource_id)))?;
        if resource.has_sub_resource() {
          return Err(LedgerError::BroadcastFailed(format!(
            "resource {} already has a sub-resource",
            resource_id
          )));
        }
      }
      Instruction::Fund { address, amount } => {
        let resource = self.find_by_address(address).ok_or_else(|| {
          LedgerError::BroadcastFailed(format!("no resource at address {}", address))
        })?;
        if resource.funding_balance.checked_add(*amount).is_none() {
          return Err(LedgerError::BroadcastFailed(format!(
            "funding {} would overflow the balance of {}",
            amount, address
          )));
        }
      }
    }
    Ok(())
  }

  fn apply(&mut self, instruction: Instruction) {
    match instruction {
      Instruction::CreateResource {
        resource_id,
        address,
        kind,
        ..
      } => {
        self
          .state
          .resources
          .entry(resource_id)
          .or_insert_with(|| ResourceSnapshot::created(resource_id, address, kind));
      }
      Instruction::CreateSubResource {
        resource_id,
        sub_resource,
      } => {
        if let Some(resource) = self.state.resources.get_mut(&resource_id) {
          resource.sub_resource = sub_resource;
        }
      }
      Instruction::Fund { address, amount } => {
        if let Some(resource) = self.find_by_address(&address) {
          resource.funding_balance = resource.funding_balance.saturating_add(amount);
        }
      }
    }
  }
}

#[async_trait]
impl TransactionBuilder for MemoryLedger {
  async fn build(
    &self,
    kind: StepKind,
    params: &CreationParams,
    context: &RunContext,
  ) -> Result<UnsignedOperation, LedgerError> {
    let (instruction, produces) = match kind {
      StepKind::CreateResource => {
        let mut inner = self.lock();
        inner.state.next_id += 1;
        let resource_id = ResourceId(inner.state.next_id);
        let address = Address::new(format!("res-{}", resource_id));
        let produces = Produced {
          resource_id: Some(resource_id),
          resource_address: Some(address.clone()),
          sub_resource: None,
        };
        let instruction = Instruction::CreateResource {
          resource_id,
          address,
          kind: params.kind,
          name: params.name.clone(),
        };
        (instruction, produces)
      }
      StepKind::CreateSubResource => {
        let resource_id = context
          .resource_id
          .ok_or_else(|| LedgerError::InvalidParams("sub-resource needs a resource id".into()))?;
        let sub_resource = Address::new(format!("sub-{}", resource_id));
        let produces = Produced {
          sub_resource: Some(sub_resource.clone()),
          ..Default::default()
        };
        let instruction = Instruction::CreateSubResource {
          resource_id,
          sub_resource,
        };
        (instruction, produces)
      }
      StepKind::Fund => {
        let address = context
          .resource_address
          .clone()
          .ok_or_else(|| LedgerError::InvalidParams("funding needs a resource address".into()))?;
        if params.funding_amount == 0 {
          return Err(LedgerError::InvalidParams(
            "funding amount must be positive".into(),
          ));
        }
        let instruction = Instruction::Fund {
          address,
          amount: params.funding_amount,
        };
        (instruction, Produced::default())
      }
    };

    Ok(UnsignedOperation {
      step: kind,
      instruction,
      produces,
    })
  }
}

#[async_trait]
impl SignerSubmitter for MemoryLedger {
  async fn submit(&self, operation: UnsignedOperation) -> Result<Signature, LedgerError> {
    let mut inner = self.lock();
    let fault = inner.faults.remove(&operation.step);
    match fault {
      Some(Fault::UserRejected) => return Err(LedgerError::UserRejected),
      Some(Fault::BroadcastFailed) => {
        return Err(LedgerError::BroadcastFailed("node refused the operation".into()));
      }
      _ => {}
    }
    inner.check(&operation.instruction)?;

    let signature = Signature(uuid::Uuid::new_v4().simple().to_string());
    *inner.broadcasts.entry(operation.step).or_default() += 1;
    debug!(step = %operation.step, signature = %signature, "operation broadcast");
    inner
      .pending
      .insert(signature.clone(), Pending { operation, fault });
    Ok(signature)
  }

  async fn await_finality(&self, signature: &Signature) -> Result<(), LedgerError> {
    if let Some(delay) = self.finality_delay {
      tokio::time::sleep(delay).await;
    }

    let mut inner = self.lock();
    let pending = inner
      .pending
      .remove(signature)
      .ok_or_else(|| LedgerError::FinalityTimeout {
        signature: signature.clone(),
      })?;

    match pending.fault {
      Some(Fault::DroppedTimeout) => Err(LedgerError::FinalityTimeout {
        signature: signature.clone(),
      }),
      Some(Fault::FinalityTimeout) => {
        inner.apply(pending.operation.instruction);
        Err(LedgerError::FinalityTimeout {
          signature: signature.clone(),
        })
      }
      _ => {
        inner.apply(pending.operation.instruction);
        Ok(())
      }
    }
  }
}

#[async_trait]
impl StateProber for MemoryLedger {
  async fn probe(&self, resource_id: ResourceId) -> Result<ResourceSnapshot, LedgerError> {
    self
      .lock()
      .state
      .resources
      .get(&resource_id)
      .cloned()
      .ok_or(LedgerError::NotFound(resource_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ledgerflow_config::ResourceKind;

  fn params() -> CreationParams {
    CreationParams {
      kind: ResourceKind::Pooled,
      name: "pool".to_string(),
      includes_funding: true,
      funding_amount: 250,
    }
  }

  async fn create(ledger: &MemoryLedger) -> RunContext {
    let op = ledger
      .build(StepKind::CreateResource, &params(), &RunContext::default())
      .await
      .unwrap();
    let mut ctx = RunContext::default();
    ctx.merge(op.produces.clone());
    let sig = ledger.submit(op).await.unwrap();
    ledger.await_finality(&sig).await.unwrap();
    ctx
  }

  #[tokio::test]
  async fn test_resource_visible_only_after_finality() {
    let ledger = MemoryLedger::new();
    let op = ledger
      .build(StepKind::CreateResource, &params(), &RunContext::default())
      .await
      .unwrap();
    let id = op.produces.resource_id.unwrap();
    let sig = ledger.submit(op).await.unwrap();

    assert_eq!(ledger.probe(id).await, Err(LedgerError::NotFound(id)));

    ledger.await_finality(&sig).await.unwrap();
    let snapshot = ledger.probe(id).await.unwrap();
    assert_eq!(snapshot.address, Address::new("res-1"));
    assert!(!snapshot.has_sub_resource());
  }

  #[tokio::test]
  async fn test_sub_resource_build_needs_context() {
    let ledger = MemoryLedger::new();
    let err = ledger
      .build(StepKind::CreateSubResource, &params(), &RunContext::default())
      .await
      .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParams(_)));
  }

  #[tokio::test]
  async fn test_funding_updates_balance() {
    let ledger = MemoryLedger::new();
    let ctx = create(&ledger).await;
    let op = ledger.build(StepKind::Fund, &params(), &ctx).await.unwrap();
    let sig = ledger.submit(op).await.unwrap();
    ledger.await_finality(&sig).await.unwrap();

    let snapshot = ledger.probe(ctx.resource_id.unwrap()).await.unwrap();
    assert_eq!(snapshot.funding_balance, 250);
  }

  #[tokio::test]
  async fn test_funding_past_max_balance_refused() {
    let ledger = MemoryLedger::new();
    let ctx = create(&ledger).await;
    let id = ctx.resource_id.unwrap();
    if let Some(resource) = ledger.lock().state.resources.get_mut(&id) {
      resource.funding_balance = u64::MAX - 1;
    }

    let op = ledger.build(StepKind::Fund, &params(), &ctx).await.unwrap();
    let err = ledger.submit(op).await.unwrap_err();
    assert!(matches!(err, LedgerError::BroadcastFailed(_)));
    assert_eq!(ledger.broadcasts(StepKind::Fund), 0);
    assert_eq!(ledger.probe(id).await.unwrap().funding_balance, u64::MAX - 1);
  }

  #[tokio::test]
  async fn test_rejected_submit_is_not_broadcast() {
    let ledger = MemoryLedger::new();
    ledger.inject(StepKind::CreateResource, Fault::UserRejected);
    let op = ledger
      .build(StepKind::CreateResource, &params(), &RunContext::default())
      .await
      .unwrap();
    assert_eq!(ledger.submit(op).await, Err(LedgerError::UserRejected));
    assert_eq!(ledger.total_broadcasts(), 0);
  }

  #[tokio::test]
  async fn test_timeout_that_lands_still_applies() {
    let ledger = MemoryLedger::new();
    let ctx = create(&ledger).await;
    ledger.inject(StepKind::CreateSubResource, Fault::FinalityTimeout);

    let op = ledger
      .build(StepKind::CreateSubResource, &params(), &ctx)
      .await
      .unwrap();
    let sig = ledger.submit(op).await.unwrap();
    let err = ledger.await_finality(&sig).await.unwrap_err();
    assert!(matches!(err, LedgerError::FinalityTimeout { .. }));

    let snapshot = ledger.probe(ctx.resource_id.unwrap()).await.unwrap();
    assert!(snapshot.has_sub_resource());
  }

  #[tokio::test]
  async fn test_dropped_timeout_leaves_no_trace() {
    let ledger = MemoryLedger::new();
    let ctx = create(&ledger).await;
    ledger.inject(StepKind::Fund, Fault::DroppedTimeout);

    let op = ledger.build(StepKind::Fund, &params(), &ctx).await.unwrap();
    let sig = ledger.submit(op).await.unwrap();
    assert!(ledger.await_finality(&sig).await.is_err());

    let snapshot = ledger.probe(ctx.resource_id.unwrap()).await.unwrap();
    assert!(!snapshot.is_funded());
  }

  #[tokio::test]
  async fn test_duplicate_sub_resource_refused() {
    let ledger = MemoryLedger::new();
    let ctx = create(&ledger).await;
    for _ in 0..2 {
      let op = ledger
        .build(StepKind::CreateSubResource, &params(), &ctx)
        .await
        .unwrap();
      if let Ok(sig) = ledger.submit(op).await {
        ledger.await_finality(&sig).await.unwrap();
      }
    }
    assert_eq!(ledger.broadcasts(StepKind::CreateSubResource), 1);
  }

  #[tokio::test]
  async fn test_state_round_trips_through_json() {
    let ledger = MemoryLedger::new();
    let ctx = create(&ledger).await;
    let json = serde_json::to_string(&ledger.state()).unwrap();

    let restored = MemoryLedger::from_state(serde_json::from_str(&json).unwrap());
    let snapshot = restored.probe(ctx.resource_id.unwrap()).await.unwrap();
    assert_eq!(snapshot.resource_id, ctx.resource_id.unwrap());

    let op = restored
      .build(StepKind::CreateResource, &params(), &RunContext::default())
      .await
      .unwrap();
    assert_eq!(op.produces.resource_id, Some(ResourceId(2)));
  }
}
